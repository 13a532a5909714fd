//! Core encryption functionality using PBKDF2 + AES-256-GCM
//!
//! Every seal draws a fresh 16-byte salt and a fresh 12-byte nonce from the
//! system RNG, then stretches the secret into a one-off AES-256 key with PBKDF2.
//! Because the key changes with every salt, a (key, nonce) pair is never reused
//! even if two processes seal under the same secret concurrently.
//!
//! Envelope format: see [`crate::encryption::envelope`].

use super::envelope::{NONCE_LEN, SALT_LEN, SealedEnvelope};
use super::key_derivation::derive_cipher_key;
use crate::metrics::OperationMetrics;
use ring::{
    aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey},
    rand::{SecureRandom, SystemRandom},
};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use zeroize::Zeroizing;

// CPU feature detection
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
use std::arch::is_x86_feature_detected;

/// Errors that can occur during encryption operations
#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Random number generation failed")]
    RngFailure,

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Authentication verification failed")]
    AuthenticationFailed,

    #[error("Decrypted payload is not valid UTF-8")]
    InvalidPlaintext,
}

/// Seals and opens state envelopes under one secret
pub struct StateCipher {
    /// Secret bytes fed to PBKDF2 (wiped on drop)
    secret: Zeroizing<Vec<u8>>,
    rng: SystemRandom,
    hardware_acceleration_detected: bool,
    /// Last operation metrics (interior mutability for observability)
    last_metrics: Arc<Mutex<OperationMetrics>>,
}

impl StateCipher {
    /// Create a cipher bound to `secret`
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        StateCipher {
            secret: Zeroizing::new(secret.as_ref().to_vec()),
            rng: SystemRandom::new(),
            hardware_acceleration_detected: Self::detect_hardware_acceleration(),
            last_metrics: Arc::new(Mutex::new(OperationMetrics::new())),
        }
    }

    /// Detect AES hardware support
    ///
    /// Informational only: ring picks the fastest implementation on its own.
    fn detect_hardware_acceleration() -> bool {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            is_x86_feature_detected!("aes")
        }

        #[cfg(target_arch = "aarch64")]
        {
            cfg!(target_feature = "aes") || cfg!(target_feature = "neon")
        }

        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
        {
            false
        }
    }

    /// Get hardware acceleration status
    pub fn hardware_acceleration_enabled(&self) -> bool {
        self.hardware_acceleration_detected
    }

    fn random_bytes<const N: usize>(&self) -> Result<[u8; N], EncryptionError> {
        let mut bytes = [0u8; N];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| EncryptionError::RngFailure)?;
        Ok(bytes)
    }

    fn aead_key(&self, salt: &[u8]) -> Result<(LessSafeKey, u64), EncryptionError> {
        let kdf_start = Instant::now();
        let key_bytes = derive_cipher_key(&self.secret, salt);
        let kdf_micros = kdf_start.elapsed().as_micros() as u64;

        let unbound_key = UnboundKey::new(&AES_256_GCM, &key_bytes[..])
            .map_err(|_| EncryptionError::EncryptionFailed("Invalid key".into()))?;

        Ok((LessSafeKey::new(unbound_key), kdf_micros))
    }

    /// Seal `plaintext` into a fresh envelope
    ///
    /// Non-deterministic: two seals of the same plaintext never match.
    pub fn seal(&self, plaintext: &[u8]) -> Result<SealedEnvelope, EncryptionError> {
        let salt: [u8; SALT_LEN] = self.random_bytes()?;
        let nonce_bytes: [u8; NONCE_LEN] = self.random_bytes()?;

        let (aead_key, kdf_micros) = self.aead_key(&salt)?;

        let encryption_start = Instant::now();
        let mut ciphertext = Vec::from(plaintext);
        aead_key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut ciphertext,
            )
            .map_err(|e| {
                EncryptionError::EncryptionFailed(format!("AES-GCM encryption failed: {:?}", e))
            })?;
        let encryption_micros = encryption_start.elapsed().as_micros() as u64;

        let envelope = SealedEnvelope {
            salt,
            nonce: nonce_bytes,
            ciphertext,
        };

        if let Ok(mut metrics) = self.last_metrics.lock() {
            *metrics = OperationMetrics::new()
                .with_key_derivation(kdf_micros)
                .with_encryption(
                    encryption_micros,
                    envelope.to_bytes().len(),
                    self.hardware_acceleration_detected,
                );
        }

        Ok(envelope)
    }

    /// Open an envelope, verifying its authentication tag
    pub fn open(&self, envelope: &SealedEnvelope) -> Result<Vec<u8>, EncryptionError> {
        let (aead_key, kdf_micros) = self
            .aead_key(&envelope.salt)
            .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;

        let decryption_start = Instant::now();
        let mut plaintext = envelope.ciphertext.clone();
        let decrypted_len = aead_key
            .open_in_place(
                Nonce::assume_unique_for_key(envelope.nonce),
                Aad::empty(),
                &mut plaintext,
            )
            .map_err(|_| EncryptionError::AuthenticationFailed)?
            .len();

        // Drop the tag bytes left behind by open_in_place
        plaintext.truncate(decrypted_len);
        let decryption_micros = decryption_start.elapsed().as_micros() as u64;

        if let Ok(mut metrics) = self.last_metrics.lock() {
            *metrics = OperationMetrics::new()
                .with_key_derivation(kdf_micros)
                .with_decryption(
                    decryption_micros,
                    SALT_LEN + NONCE_LEN + envelope.ciphertext.len(),
                    self.hardware_acceleration_detected,
                );
        }

        Ok(plaintext)
    }

    /// Encrypt a string into the base64 envelope stored by the persistence layer
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        Ok(self.seal(plaintext.as_bytes())?.encode())
    }

    /// Decrypt a base64 envelope back into the original string
    ///
    /// Fails on bad base64, truncated envelopes, wrong secret, tampering and
    /// non-UTF-8 payloads alike.
    pub fn decrypt(&self, encoded: &str) -> Result<String, EncryptionError> {
        let envelope = SealedEnvelope::decode(encoded)?;
        let plaintext = self.open(&envelope)?;
        String::from_utf8(plaintext).map_err(|_| EncryptionError::InvalidPlaintext)
    }

    /// Get metrics from last operation
    ///
    /// Returns a snapshot of metrics from the most recent seal() or open() call
    pub fn get_last_metrics(&self) -> OperationMetrics {
        self.last_metrics
            .lock()
            .map(|metrics| metrics.clone())
            .unwrap_or_else(|_| OperationMetrics::new())
    }
}

impl std::fmt::Debug for StateCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCipher")
            .field("secret", &"<redacted>")
            .field(
                "hardware_acceleration_detected",
                &self.hardware_acceleration_detected,
            )
            .finish()
    }
}
