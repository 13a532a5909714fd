//! Sealed state envelope
//!
//! Wire format (before base64, standard alphabet with padding):
//!
//! ```text
//! [salt(16)][nonce(12)][ciphertext(n)][auth_tag(16)]
//! ```
//!
//! Only salt and nonce travel with the ciphertext. KDF parameters are fixed
//! constants, see [`crate::encryption::key_derivation`].

use super::core::EncryptionError;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

/// PBKDF2 salt length
pub const SALT_LEN: usize = 16;

/// AES-GCM nonce length
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Smallest decodable envelope: salt + nonce + tag over an empty plaintext
pub const MIN_ENVELOPE_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// Decoded envelope parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEnvelope {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the authentication tag appended
    pub ciphertext: Vec<u8>,
}

impl SealedEnvelope {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SALT_LEN + NONCE_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Split raw envelope bytes into salt, nonce and ciphertext
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncryptionError> {
        if bytes.len() < MIN_ENVELOPE_LEN {
            return Err(EncryptionError::InvalidEnvelope(format!(
                "envelope too short: {} bytes, need at least {}",
                bytes.len(),
                MIN_ENVELOPE_LEN
            )));
        }

        let (salt, rest) = bytes.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let salt: [u8; SALT_LEN] = salt
            .try_into()
            .map_err(|_| EncryptionError::InvalidEnvelope("bad salt slice".into()))?;
        let nonce: [u8; NONCE_LEN] = nonce
            .try_into()
            .map_err(|_| EncryptionError::InvalidEnvelope("bad nonce slice".into()))?;

        Ok(SealedEnvelope {
            salt,
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Encode to the string form written to the durable store
    pub fn encode(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    /// Decode the string form read from the durable store
    pub fn decode(encoded: &str) -> Result<Self, EncryptionError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| EncryptionError::InvalidEnvelope(format!("base64: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}


#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Property: envelope splitting never reads out of bounds
    #[kani::proof]
    #[kani::unwind(3)]
    fn verify_split_bounds() {
        let len: usize = kani::any();
        kani::assume(len >= MIN_ENVELOPE_LEN && len < 256);

        let nonce_end = SALT_LEN + NONCE_LEN;
        assert!(nonce_end <= len);
        assert!(len - nonce_end >= TAG_LEN);
    }

    /// Property: anything shorter than salt + nonce + tag is rejected
    #[kani::proof]
    #[kani::unwind(3)]
    fn verify_minimum_length() {
        let len: usize = kani::any();
        kani::assume(len < 256);

        let rejected = len < MIN_ENVELOPE_LEN;
        let cannot_hold_tag = len < SALT_LEN + NONCE_LEN || len - SALT_LEN - NONCE_LEN < TAG_LEN;
        assert_eq!(rejected, cannot_hold_tag);
    }
}
