//! Save/load orchestration: serialize -> encrypt -> store, and back.
//!
//! Load is fail-open: anything wrong with the stored bytes themselves (bad
//! base64, truncation, wrong secret, tampering, non-JSON plaintext) reads as
//! "nothing stored". Store errors are not about the bytes and propagate.

use crate::encryption::{EncryptionError, StateCipher};
use crate::metrics::OperationMetrics;
use crate::store::{DurableStore, StoreError};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Error types for a failed save
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("encryption failed: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("store write failed: {0}")]
    Store(#[from] StoreError),
}

/// One storage slot plus the cipher that seals it
pub struct Persistence {
    storage_key: String,
    cipher: StateCipher,
    store: Arc<dyn DurableStore>,
}

impl Persistence {
    pub fn new(storage_key: String, cipher: StateCipher, store: Arc<dyn DurableStore>) -> Self {
        Persistence {
            storage_key,
            cipher,
            store,
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Encrypt an already-serialized record and write it to the slot
    pub fn save(&self, serialized: &str) -> Result<(), PersistError> {
        let envelope = self.cipher.encrypt(serialized)?;
        self.store.set(&self.storage_key, &envelope)?;
        Ok(())
    }

    /// Read the slot back
    ///
    /// `Ok(None)` when nothing is stored or the stored envelope cannot be turned
    /// back into a JSON object.
    pub fn load(&self) -> Result<Option<Map<String, Value>>, StoreError> {
        let Some(envelope) = self.store.get(&self.storage_key)? else {
            return Ok(None);
        };

        let plaintext = match self.cipher.decrypt(&envelope) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::debug!(
                    storage_key = %self.storage_key,
                    error = %e,
                    "stored state unreadable, falling back to initial value"
                );
                return Ok(None);
            }
        };

        match serde_json::from_str::<Value>(&plaintext) {
            Ok(Value::Object(fields)) => Ok(Some(fields)),
            Ok(_) => {
                tracing::debug!(
                    storage_key = %self.storage_key,
                    "stored state is not an object, falling back to initial value"
                );
                Ok(None)
            }
            Err(e) => {
                tracing::debug!(
                    storage_key = %self.storage_key,
                    error = %e,
                    "stored state is not valid JSON, falling back to initial value"
                );
                Ok(None)
            }
        }
    }

    /// Metrics from the last seal or open on this slot
    pub fn last_metrics(&self) -> OperationMetrics {
        self.cipher.get_last_metrics()
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("storage_key", &self.storage_key)
            .field("cipher", &self.cipher)
            .finish_non_exhaustive()
    }
}
