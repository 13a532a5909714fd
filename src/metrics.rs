//! Observability metrics for sealing and opening state envelopes
//!
//! Tracks where time goes in a persistence round trip: PBKDF2 key derivation
//! dominates, AES-GCM itself is cheap.

use serde::{Deserialize, Serialize};

/// Metrics for the most recent seal or open operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMetrics {
    /// PBKDF2 key derivation time in microseconds
    pub key_derivation_time_micros: u64,

    /// AES-GCM seal time in microseconds (None if the last operation was an open)
    pub encryption_time_micros: Option<u64>,

    /// AES-GCM open time in microseconds (None if the last operation was a seal)
    pub decryption_time_micros: Option<u64>,

    /// Raw envelope size in bytes (salt, nonce, ciphertext and tag), before base64
    pub envelope_size: usize,

    /// Whether AES hardware acceleration was detected
    pub hardware_accelerated: bool,
}

impl OperationMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        OperationMetrics {
            key_derivation_time_micros: 0,
            encryption_time_micros: None,
            decryption_time_micros: None,
            envelope_size: 0,
            hardware_accelerated: false,
        }
    }

    /// Set key derivation metrics
    pub fn with_key_derivation(mut self, time_micros: u64) -> Self {
        self.key_derivation_time_micros = time_micros;
        self
    }

    /// Set seal metrics
    pub fn with_encryption(mut self, time_micros: u64, envelope_size: usize, hw_accel: bool) -> Self {
        self.encryption_time_micros = Some(time_micros);
        self.envelope_size = envelope_size;
        self.hardware_accelerated = hw_accel;
        self
    }

    /// Set open metrics
    pub fn with_decryption(mut self, time_micros: u64, envelope_size: usize, hw_accel: bool) -> Self {
        self.decryption_time_micros = Some(time_micros);
        self.envelope_size = envelope_size;
        self.hardware_accelerated = hw_accel;
        self
    }

    /// Total operation time in microseconds
    pub fn total_time_micros(&self) -> u64 {
        self.key_derivation_time_micros
            + self.encryption_time_micros.unwrap_or(0)
            + self.decryption_time_micros.unwrap_or(0)
    }
}

impl Default for OperationMetrics {
    fn default() -> Self {
        Self::new()
    }
}
