//! End-to-end: service events → file-backed store → remote, across two
//! "devices" sharing one remote.

use chrono::{DateTime, TimeZone, Utc};

use moodcolor_core::config::MoodConfig;
use moodcolor_core::{EmotionHistoryRecord, EmotionService, EmotionType, UserId};
use moodcolor_sync::{DatabaseService, InMemoryRemoteStore, SqliteDatabaseService, SyncCoordinator};

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, hour, 0, 0)
        .single()
        .expect("valid date")
}

#[tokio::test]
async fn history_reaches_second_device() {
    let config = MoodConfig::default();
    let user = UserId::new("user-7");
    let dir = tempfile::tempdir().expect("tempdir");

    // Device A logs and syncs.
    let mut service = EmotionService::from_config(&config);
    service.update_emotion_value_at(EmotionType::Joy, 0.7, at(8));
    service.update_emotion_value_at(EmotionType::Surprise, 0.4, at(9));
    assert!(service.try_mix_emotions_at(EmotionType::Joy, EmotionType::Surprise, at(10)));

    let device_a = SqliteDatabaseService::open(dir.path().join("a.db"), &config.persistence)
        .expect("open a");
    let records: Vec<EmotionHistoryRecord> = service
        .history()
        .iter()
        .map(EmotionHistoryRecord::from_entry)
        .collect();
    device_a
        .add_emotion_history_batch(&user, records)
        .await
        .expect("store");
    device_a
        .save_user_emotions(&user, service.emotions().into_values().collect())
        .await
        .expect("table");

    let sync_a = SyncCoordinator::new(device_a, InMemoryRemoteStore::new(), &config.sync);
    let report = sync_a.push_unsynced(&user).await.expect("push");
    assert_eq!(report.pushed, 3);
    assert_eq!(sync_a.remote().len_for(&user), 3);

    // Device B pulls into an empty store and rebuilds analytics.
    let device_b = SqliteDatabaseService::open(dir.path().join("b.db"), &config.persistence)
        .expect("open b");
    let remote_b = InMemoryRemoteStore::new();
    for record in sync_a
        .db()
        .get_emotion_records(&user, None, None)
        .await
        .expect("records")
    {
        remote_b.insert(&user, record);
    }
    let sync_b = SyncCoordinator::new(device_b, remote_b, &config.sync);
    assert_eq!(sync_b.pull_remote(&user).await.expect("pull"), 3);

    let pulled = sync_b
        .db()
        .get_emotion_records(&user, None, None)
        .await
        .expect("records");
    let mut rebuilt = EmotionService::from_config(&config);
    rebuilt.restore(Vec::new(), pulled.iter().filter_map(EmotionHistoryRecord::to_entry));
    assert_eq!(
        rebuilt.get_popular_emotion_combinations(),
        service.get_popular_emotion_combinations()
    );

    let stats = sync_b
        .db()
        .get_emotion_statistics(&user, at(0), at(23))
        .await
        .expect("stats");
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.unsynced_entries, 0);
}
