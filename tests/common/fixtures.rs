//! Test fixtures and store doubles for statekit-core tests.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use statekit_core::{DurableStore, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Common Test Data
// ============================================================================

/// Secret used by most persistence tests
pub const TEST_SECRET: &str = "test-secret-for-statekit";

/// A different secret for wrong-key tests
pub const OTHER_SECRET: &str = "a-completely-different-secret";

/// Unicode payload - validates UTF-8 survives sealing
pub const UNICODE_LABEL: &str = "Hello 世界 🚀 Rust";

/// Typical application state shape
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TableState {
    pub page: u32,
    pub per_page: u32,
    pub ordering: Vec<String>,
    pub filter: Option<String>,
}

impl Default for TableState {
    fn default() -> Self {
        TableState {
            page: 1,
            per_page: 50,
            ordering: vec!["name".into()],
            filter: None,
        }
    }
}

// ============================================================================
// Store Doubles
// ============================================================================

/// In-memory store that counts writes and can be told to fail
#[derive(Default)]
pub struct InstrumentedStore {
    entries: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
    fail_reads: bool,
    fail_writes: bool,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads() -> Self {
        InstrumentedStore {
            fail_reads: true,
            ..Self::default()
        }
    }

    pub fn failing_writes() -> Self {
        InstrumentedStore {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
    }
}

impl DurableStore for InstrumentedStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Io(std::io::Error::other("store offline")));
        }
        Ok(self.entries.lock().map_err(|_| StoreError::Poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Io(std::io::Error::other("store read-only")));
        }
        self.entries
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(key.to_owned(), value.to_owned());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Flip a single bit of a base64 envelope at `bit` (counted over decoded bytes)
pub fn flip_bit(envelope: &str, bit: usize) -> String {
    use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

    let mut bytes = BASE64.decode(envelope).expect("fixture envelope is base64");
    let index = (bit / 8) % bytes.len();
    bytes[index] ^= 1 << (bit % 8);
    BASE64.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_constants() {
        assert_ne!(TEST_SECRET, OTHER_SECRET);
        assert!(UNICODE_LABEL.len() > UNICODE_LABEL.chars().count());
    }

    #[test]
    fn test_instrumented_store_counts_writes() {
        let store = InstrumentedStore::new();
        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();

        assert_eq!(store.writes(), 2);
        assert_eq!(store.raw("a").as_deref(), Some("2"));
    }

    #[test]
    fn test_flip_bit_changes_exactly_one_bit() {
        use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

        let original = BASE64.encode([0u8; 8]);
        let flipped = BASE64.decode(flip_bit(&original, 13)).unwrap();

        let ones: u32 = flipped.iter().map(|b| b.count_ones()).sum();
        assert_eq!(ones, 1);
        assert_eq!(flipped[1], 0b0010_0000);
    }
}
