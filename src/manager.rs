//! Public state API: options, the manager, and `create_state`.

use crate::accessor::{Accessor, RecordError, StateRecord};
use crate::encryption::{DEFAULT_ENCRYPTION_SECRET, StateCipher, generate_state_key};
use crate::metrics::OperationMetrics;
use crate::persistence::{PersistError, Persistence};
use crate::store::{DurableStore, StoreError};
use crate::writer::{FlushError, WriteQueue};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

/// Error types for state manager operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("unknown state key: {0}")]
    UnknownKey(String),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("value for {key} could not be converted: {source}")]
    Value {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("durable store read failed: {0}")]
    Store(#[from] StoreError),

    #[error("persisting state failed: {0}")]
    Persist(#[from] PersistError),

    #[error("could not start state writer: {0}")]
    WriterSpawn(std::io::Error),

    #[error("state writer stopped")]
    WriterStopped,
}

/// Construction options for a [`StateManager`]
#[derive(Clone, Default)]
pub struct StateOptions {
    store: Option<Arc<dyn DurableStore>>,
    key: Option<String>,
    encryption_secret: Option<Zeroizing<String>>,
}

impl StateOptions {
    /// In-memory only, derived key, default secret
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror every write into `store`, and rehydrate from it on construction
    pub fn persist(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a fixed storage key instead of deriving one from the record shape
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Secret the envelope cipher key is derived from
    ///
    /// An empty secret is treated as unset. Without one the public
    /// [`DEFAULT_ENCRYPTION_SECRET`] is used, which only obscures stored state.
    pub fn encryption_secret(mut self, secret: impl Into<String>) -> Self {
        self.encryption_secret = Some(Zeroizing::new(secret.into()));
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    fn resolved_secret(&self) -> &str {
        match &self.encryption_secret {
            Some(secret) if !secret.is_empty() => secret.as_str(),
            _ => DEFAULT_ENCRYPTION_SECRET,
        }
    }
}

impl std::fmt::Debug for StateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateOptions")
            .field("persist", &self.is_persistent())
            .field("key", &self.key)
            .field(
                "encryption_secret",
                &self.encryption_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

struct Mirror {
    persistence: Arc<Persistence>,
    queue: WriteQueue,
}

/// Runtime state, optionally mirrored to an encrypted durable store
///
/// Writes are visible to reads immediately; the durable copy catches up in the
/// background, in write order. Dropping the manager waits for queued writes.
pub struct StateManager {
    record: StateRecord,
    storage_key: String,
    mirror: Option<Mirror>,
}

impl StateManager {
    pub fn new<T: Serialize + ?Sized>(
        initial: &T,
        options: StateOptions,
    ) -> Result<Self, StateError> {
        let mut record = StateRecord::from_serializable(initial)?;

        let storage_key = match &options.key {
            Some(key) => key.clone(),
            None => generate_state_key(record.keys()),
        };

        let Some(store) = options.store.clone() else {
            return Ok(StateManager {
                record,
                storage_key,
                mirror: None,
            });
        };

        let persistence = Arc::new(Persistence::new(
            storage_key.clone(),
            StateCipher::new(options.resolved_secret()),
            store,
        ));

        if let Some(saved) = persistence.load()? {
            let merged = record.merge(saved);
            tracing::debug!(storage_key = %storage_key, merged, "rehydrated state");
        }

        let queue = WriteQueue::spawn(Arc::clone(&persistence)).map_err(StateError::WriterSpawn)?;
        let manager = StateManager {
            record,
            storage_key,
            mirror: Some(Mirror { persistence, queue }),
        };

        // Make the store reflect the merged record right away
        manager.enqueue_save()?;
        Ok(manager)
    }

    fn enqueue_save(&self) -> Result<(), StateError> {
        let Some(mirror) = &self.mirror else {
            return Ok(());
        };
        let serialized = self.record.to_json()?;
        if mirror.queue.submit(serialized) {
            Ok(())
        } else {
            Err(StateError::WriterStopped)
        }
    }

    /// Current value of `key`, converted to `V`
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Result<V, StateError> {
        let value = self
            .record
            .get(key)
            .ok_or_else(|| StateError::UnknownKey(key.to_owned()))?;

        serde_json::from_value(value.clone()).map_err(|source| StateError::Value {
            key: key.to_owned(),
            source,
        })
    }

    /// Current raw value of `key`
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.record.get(key)
    }

    /// Set `key` to `value`, then queue a save when persistence is enabled
    ///
    /// The new value is readable as soon as this returns.
    pub fn set<V: Serialize>(&mut self, key: &str, value: V) -> Result<(), StateError> {
        let value = serde_json::to_value(value).map_err(|source| StateError::Value {
            key: key.to_owned(),
            source,
        })?;

        if !self.record.set(key, value) {
            return Err(StateError::UnknownKey(key.to_owned()));
        }

        self.enqueue_save()
    }

    pub fn has(&self, key: &str) -> bool {
        self.record.has(key)
    }

    /// The live record
    pub fn all(&self) -> &StateRecord {
        &self.record
    }

    /// Typed copy of the whole record
    pub fn snapshot<T: DeserializeOwned>(&self) -> Result<T, StateError> {
        Ok(self.record.deserialize()?)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.record.keys().collect()
    }

    pub fn values(&self) -> Vec<&Value> {
        self.record.values().collect()
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn is_persistent(&self) -> bool {
        self.mirror.is_some()
    }

    /// Wait for every queued save to reach the store
    ///
    /// Returns the first save failure since the previous flush. A no-op for
    /// in-memory managers.
    pub fn flush(&self) -> Result<(), StateError> {
        let Some(mirror) = &self.mirror else {
            return Ok(());
        };
        mirror.queue.flush().map_err(|e| match e {
            FlushError::Failed { first, count } => {
                tracing::debug!(storage_key = %self.storage_key, count, "saves failed since last flush");
                StateError::Persist(first)
            }
            FlushError::Stopped => StateError::WriterStopped,
        })
    }

    /// Metrics from the last seal or open, if persistence is enabled
    pub fn last_metrics(&self) -> Option<OperationMetrics> {
        self.mirror.as_ref().map(|m| m.persistence.last_metrics())
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("storage_key", &self.storage_key)
            .field("persist", &self.is_persistent())
            .field("record", &self.record)
            .finish()
    }
}

/// Create a new state manager.
///
/// Only one live manager should exist per storage key; two managers on the same
/// key overwrite each other's durable copy.
pub fn create_state<T: Serialize + ?Sized>(
    initial: &T,
    options: StateOptions,
) -> Result<StateManager, StateError> {
    StateManager::new(initial, options)
}
