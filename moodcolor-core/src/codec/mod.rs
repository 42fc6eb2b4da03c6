//! Wire formats for persisted record payloads.
//!
//! - [`compression`]: JSON, GZip+Base64 with a `COMP:` prefix above a size threshold.
//! - [`encryption`]: AES-256-CBC with the IV prepended, Base64 encoded.

pub mod compression;
pub mod encryption;

pub use compression::PayloadCodec;
pub use encryption::DataEncryptionService;
