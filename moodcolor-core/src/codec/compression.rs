//! Payload compression.
//!
//! A value is serialised to JSON. If the JSON is at least `threshold` bytes
//! long it is GZip-compressed, Base64-encoded and prefixed with `COMP:`;
//! otherwise the raw JSON text is stored with no prefix. Decoding looks for
//! the prefix to decide whether to inflate.

use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{MoodError, Result};

/// Literal prefix marking a compressed payload.
pub const COMPRESSED_PREFIX: &str = "COMP:";

/// Default size (in bytes of JSON) at which payloads get compressed.
pub const DEFAULT_THRESHOLD: usize = 1024;

/// Encoder/decoder for the compression wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadCodec {
    threshold: usize,
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl PayloadCodec {
    /// Codec compressing payloads of at least `threshold` bytes.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// The configured threshold.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Encode text: compressed when at or above the threshold, raw otherwise.
    ///
    /// # Errors
    /// Returns [`MoodError::Compression`] if the GZip stream cannot be written.
    pub fn compress_text(&self, text: &str) -> Result<String> {
        if text.len() < self.threshold {
            return Ok(text.to_string());
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(text.as_bytes())
            .map_err(|e| MoodError::Compression(e.to_string()))?;
        let gz = encoder
            .finish()
            .map_err(|e| MoodError::Compression(e.to_string()))?;
        Ok(format!("{COMPRESSED_PREFIX}{}", STANDARD.encode(gz)))
    }

    /// Decode text produced by [`compress_text`](Self::compress_text).
    ///
    /// # Errors
    /// Returns [`MoodError::Compression`] for bad Base64, a corrupt GZip
    /// stream or non-UTF-8 content.
    pub fn decompress_text(&self, payload: &str) -> Result<String> {
        let Some(encoded) = payload.strip_prefix(COMPRESSED_PREFIX) else {
            return Ok(payload.to_string());
        };
        let gz = STANDARD
            .decode(encoded)
            .map_err(|e| MoodError::Compression(format!("invalid base64: {e}")))?;
        let mut text = String::new();
        GzDecoder::new(gz.as_slice())
            .read_to_string(&mut text)
            .map_err(|e| MoodError::Compression(format!("invalid gzip stream: {e}")))?;
        Ok(text)
    }

    /// Serialise a value to JSON and encode it.
    ///
    /// # Errors
    /// Returns [`MoodError::Serialization`] or [`MoodError::Compression`].
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = serde_json::to_string(value)?;
        self.compress_text(&json)
    }

    /// Decode and deserialise a value.
    ///
    /// # Errors
    /// Returns [`MoodError::Compression`] or [`MoodError::Serialization`].
    pub fn decode<T: DeserializeOwned>(&self, payload: &str) -> Result<T> {
        let json = self.decompress_text(payload)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Lenient [`decode`](Self::decode): failures are logged and yield `None`.
    #[must_use]
    pub fn decode_or_none<T: DeserializeOwned>(&self, payload: &str) -> Option<T> {
        match self.decode(payload) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, bytes = payload.len(), "Failed to decode payload");
                None
            }
        }
    }

    /// Encode a batch of values as one JSON array payload.
    ///
    /// # Errors
    /// Same as [`encode`](Self::encode).
    pub fn encode_batch<T: Serialize>(&self, values: &[T]) -> Result<String> {
        self.encode(&values)
    }

    /// Lenient batch decode: failures are logged and yield an empty vector.
    #[must_use]
    pub fn decode_batch_or_empty<T: DeserializeOwned>(&self, payload: &str) -> Vec<T> {
        self.decode_or_none(payload).unwrap_or_default()
    }
}

/// Whether a payload carries the compression prefix.
#[must_use]
pub fn is_compressed(payload: &str) -> bool {
    payload.starts_with(COMPRESSED_PREFIX)
}
