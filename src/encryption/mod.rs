//! State Encryption Module
//!
//! Client-side sealing of serialized state with PBKDF2-HMAC-SHA256 key
//! stretching and AES-256-GCM authenticated encryption.
//!
//! # Features
//! - **AES-256-GCM. Not configurable.** Authenticated encryption via ring
//! - PBKDF2-HMAC-SHA256, fixed iteration count, fresh 16-byte salt per seal
//! - Fresh 12-byte random nonce per seal
//! - Deterministic storage-key derivation from a record's key names

pub mod core;
pub mod envelope;
pub mod key_derivation;

// Re-exports for convenience
pub use core::{EncryptionError, StateCipher};
pub use envelope::SealedEnvelope;
pub use key_derivation::{derive_cipher_key, generate_state_key};

/// Fallback secret used when the caller does not supply one.
///
/// This value is public: it keeps casual readers of the store out and nothing
/// more. Anyone who can read this source can decrypt envelopes sealed with it.
pub const DEFAULT_ENCRYPTION_SECRET: &str = "statekit-encryption-default-key-please-change";
