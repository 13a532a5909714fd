//! # statekit-core
//!
//! Fixed-shape key-value state, mirrored to an encrypted durable store.
//!
//! Reads and writes go through one accessor. With persistence on, every write is
//! serialized to JSON, sealed with AES-256-GCM under a PBKDF2-derived key, and
//! written to a caller-provided store; construction rehydrates from that store
//! first. Anything unreadable in the store falls back to the initial value.
//!
//! ## Features
//!
//! | Feature | Description | Default |
//! |:--------|:------------|:-------:|
//! | `file-store` | JSON-file `DurableStore` with atomic rewrites | Yes |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use statekit_core::{MemoryStore, StateOptions, create_state};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let options = StateOptions::new()
//!     .persist(store)
//!     .key("k1")
//!     .encryption_secret("per-user secret");
//!
//! let mut state = create_state(&serde_json::json!({ "count": 0 }), options).unwrap();
//! state.set("count", 7).unwrap();
//! assert_eq!(state.get::<u32>("count").unwrap(), 7);
//!
//! // Wait for the encrypted copy to land
//! state.flush().unwrap();
//! ```
//!
//! ## Envelope
//!
//! `base64([salt(16)][nonce(12)][ciphertext+tag])`. Salt and nonce are fresh
//! per save; PBKDF2 (HMAC-SHA256, 100 000 iterations) and AES-256-GCM are fixed.
//!
//! ## Security Properties
//!
//! - **AES-256-GCM**: Authenticated encryption via `ring`; tampering is detected
//! - **PBKDF2-HMAC-SHA256**: Per-save salt, so every envelope uses its own key
//! - **Default secret is public**: supply your own via
//!   [`StateOptions::encryption_secret`] for real confidentiality
//! - **Memory hygiene**: `zeroize` for secrets, derived keys and queued plaintext

// Metrics and observability
pub mod metrics;
pub use metrics::OperationMetrics;

// Accessor layer
pub mod accessor;
pub use accessor::{Accessor, RecordError, StateRecord};

// Persistence layer
pub mod encryption;
pub use encryption::{
    DEFAULT_ENCRYPTION_SECRET, EncryptionError, SealedEnvelope, StateCipher, derive_cipher_key,
    generate_state_key,
};

pub mod persistence;
pub use persistence::{PersistError, Persistence};

pub mod store;
#[cfg(feature = "file-store")]
pub use store::FileStore;
pub use store::{DurableStore, MemoryStore, StoreError};

mod writer;

// Public API
pub mod manager;
pub use manager::{StateError, StateManager, StateOptions, create_state};
