//! Payload encryption at rest.
//!
//! AES-256-CBC with PKCS7 padding. A fresh 16-byte IV is generated per
//! message and the output is `Base64(IV || ciphertext)`. Keys come from
//! PBKDF2-HMAC-SHA256 (10 000 iterations, 16-byte salt) over a password, or
//! are generated randomly.

use aes::Aes256;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::Sha256;
use tracing::warn;

use crate::error::{MoodError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 10_000;
/// Salt length in bytes.
pub const SALT_LEN: usize = 16;
/// AES block / IV length in bytes.
pub const IV_LEN: usize = 16;
/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Symmetric encryption of text payloads.
#[derive(Clone)]
pub struct DataEncryptionService {
    key: [u8; KEY_LEN],
    salt: Option<[u8; SALT_LEN]>,
}

impl std::fmt::Debug for DataEncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataEncryptionService")
            .field("password_derived", &self.salt.is_some())
            .finish_non_exhaustive()
    }
}

impl DataEncryptionService {
    /// Use a freshly generated random key.
    #[must_use]
    pub fn with_random_key() -> Self {
        Self {
            key: rand::random(),
            salt: None,
        }
    }

    /// Use an existing raw key.
    #[must_use]
    pub fn with_key(key: [u8; KEY_LEN]) -> Self {
        Self { key, salt: None }
    }

    /// Derive a key from a password with a freshly generated salt.
    /// Persist [`salt`](Self::salt) to derive the same key later.
    #[must_use]
    pub fn from_password(password: &str) -> Self {
        Self::from_password_and_salt(password, rand::random())
    }

    /// Derive a key from a password and a known salt.
    #[must_use]
    pub fn from_password_and_salt(password: &str, salt: [u8; SALT_LEN]) -> Self {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key);
        Self {
            key,
            salt: Some(salt),
        }
    }

    /// Restore from a Base64-encoded raw key.
    ///
    /// # Errors
    /// Returns [`MoodError::Encryption`] if the key is not valid Base64 or
    /// not exactly 32 bytes.
    pub fn from_key_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| MoodError::Encryption(format!("invalid key encoding: {e}")))?;
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| MoodError::Encryption(format!("key must be 32 bytes, got {}", b.len())))?;
        Ok(Self::with_key(key))
    }

    /// The raw key, Base64-encoded.
    #[must_use]
    pub fn key_base64(&self) -> String {
        STANDARD.encode(self.key)
    }

    /// The PBKDF2 salt, when the key was password-derived.
    #[must_use]
    pub fn salt(&self) -> Option<[u8; SALT_LEN]> {
        self.salt
    }

    /// Encrypt text into `Base64(IV || ciphertext)`.
    ///
    /// # Errors
    /// Returns [`MoodError::Encryption`] if the cipher cannot be initialised.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let iv: [u8; IV_LEN] = rand::random();
        let cipher = Aes256CbcEnc::new_from_slices(&self.key, &iv)
            .map_err(|e| MoodError::Encryption(e.to_string()))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    /// Decrypt output of [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    /// Returns [`MoodError::Encryption`] for bad Base64, a payload shorter
    /// than one IV, a wrong key / corrupt data (padding failure) or
    /// non-UTF-8 plaintext.
    pub fn decrypt(&self, payload: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| MoodError::Encryption(format!("invalid base64: {e}")))?;
        if bytes.len() < IV_LEN {
            return Err(MoodError::Encryption(format!(
                "payload too short: {} bytes",
                bytes.len()
            )));
        }
        let (iv, ciphertext) = bytes.split_at(IV_LEN);
        let cipher = Aes256CbcDec::new_from_slices(&self.key, iv)
            .map_err(|e| MoodError::Encryption(e.to_string()))?;
        let plaintext = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|e| MoodError::Encryption(format!("decryption failed: {e}")))?;
        String::from_utf8(plaintext)
            .map_err(|e| MoodError::Encryption(format!("plaintext is not UTF-8: {e}")))
    }

    /// Lenient [`decrypt`](Self::decrypt): failures are logged and yield `None`.
    #[must_use]
    pub fn decrypt_or_none(&self, payload: &str) -> Option<String> {
        match self.decrypt(payload) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "Failed to decrypt payload");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_random_key() {
        let svc = DataEncryptionService::with_random_key();
        let text = "felt calm after the walk";
        let enc = svc.encrypt(text).expect("encrypt");
        assert_ne!(enc, text);
        assert_eq!(svc.decrypt(&enc).expect("decrypt"), text);
    }

    #[test]
    fn fresh_iv_per_message() {
        let svc = DataEncryptionService::with_random_key();
        let a = svc.encrypt("same").expect("encrypt");
        let b = svc.encrypt("same").expect("encrypt");
        assert_ne!(a, b);
    }

    #[test]
    fn password_and_salt_reproduce_key() {
        let first = DataEncryptionService::from_password("hunter2");
        let salt = first.salt().expect("salt");
        let again = DataEncryptionService::from_password_and_salt("hunter2", salt);
        assert_eq!(first.key_base64(), again.key_base64());

        let enc = first.encrypt("{\"type\":\"Joy\"}").expect("encrypt");
        assert_eq!(again.decrypt(&enc).expect("decrypt"), "{\"type\":\"Joy\"}");
    }

    #[test]
    fn wrong_key_fails_softly() {
        let a = DataEncryptionService::with_random_key();
        let b = DataEncryptionService::with_random_key();
        let enc = a.encrypt("secret mood").expect("encrypt");
        // A wrong key almost always breaks the padding; if it happens to
        // unpad cleanly the plaintext still differs.
        assert_ne!(b.decrypt_or_none(&enc).as_deref(), Some("secret mood"));
        assert!(a.decrypt_or_none("short").is_none());
    }

    #[test]
    fn key_export_round_trips() {
        let a = DataEncryptionService::with_random_key();
        let b = DataEncryptionService::from_key_base64(&a.key_base64()).expect("import");
        let enc = a.encrypt("x").expect("encrypt");
        assert_eq!(b.decrypt(&enc).expect("decrypt"), "x");
        assert!(DataEncryptionService::from_key_base64("AAAA").is_err());
    }
}
