//! Durable state store boundary
//!
//! The pipeline persists two blobs: the serialized event queue and the user
//! state. This module defines the [`StateStore`] trait both go through, plus
//! an in-memory implementation for tests. The file-backed implementation
//! lives in `tracekit-runtime`.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::StorageError;

/// Storage key for the persisted event queue blob.
pub const QUEUE_KEY: &str = "tracekit.event_queue";

/// Storage key for the persisted user state blob.
pub const USER_STATE_KEY: &str = "tracekit.user_state";

// ----------------------------------------------------------------------------
// State Store Trait
// ----------------------------------------------------------------------------

/// Durable key-value storage for SDK state.
///
/// Single-writer by contract: only the tracker task mutates these keys, so
/// implementations need to serialize concurrent access but not coordinate
/// across processes. `put` must be an atomic overwrite: a reader (or a
/// restart) sees either the previous value or the new one, never a torn
/// write.
pub trait StateStore: Send + Sync {
    /// Read the value for a key, `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Atomically overwrite the value for a key.
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Absent keys are not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ----------------------------------------------------------------------------
// In-Memory Store
// ----------------------------------------------------------------------------

/// Volatile [`StateStore`] for tests and no-persistence setups.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().expect("state store lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("state store lock poisoned");
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("state store lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
