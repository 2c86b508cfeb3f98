//! # Shared store capability.
//!
//! [`SharedStore`] is the narrow view of a distributed key-value store that
//! the cluster state needs: boolean flags propagated across nodes and an
//! atomic set-if-absent used as a lock.
//!
//! [`MemoryStore`] implements it in process. Several [`ClusterAppState`](crate::ClusterAppState)s
//! sharing one `MemoryStore` behave like nodes of one cluster.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::StoreError;

/// Distributed key-value store with lock primitives.
#[async_trait]
pub trait SharedStore: Send + Sync + 'static {
    /// Sets the flag `key`.
    async fn set_flag(&self, key: &str) -> Result<(), StoreError>;

    /// Removes the flag `key` (no-op when absent).
    async fn remove_flag(&self, key: &str) -> Result<(), StoreError>;

    /// Returns every set flag starting with `prefix`, sorted.
    async fn scan_flags(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Stores `value` under `key` unless the key exists.
    ///
    /// Returns `None` when the value was stored, or the current value otherwise.
    async fn put_if_absent(&self, key: &str, value: &str) -> Result<Option<String>, StoreError>;

    /// Removes `key` only if it currently holds `value`; returns whether it did.
    async fn remove_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError>;
}

/// In-process [`SharedStore`].
///
/// `set_available(false)` simulates an outage: every call fails with
/// [`StoreError::Unavailable`] until it is made available again.
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryStore {
    /// Creates an empty, available store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the store reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StoreError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "memory store switched off".to_string(),
            });
        }
        // A poisoned map is still consistent: every mutation is a single call.
        Ok(self.entries.lock().unwrap_or_else(|p| p.into_inner()))
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn set_flag(&self, key: &str) -> Result<(), StoreError> {
        self.entries()?.insert(key.to_string(), String::new());
        Ok(())
    }

    async fn remove_flag(&self, key: &str) -> Result<(), StoreError> {
        self.entries()?.remove(key);
        Ok(())
    }

    async fn scan_flags(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries()?
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn put_if_absent(&self, key: &str, value: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries()?;
        if let Some(current) = entries.get(key) {
            return Ok(Some(current.clone()));
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(None)
    }

    async fn remove_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries()?;
        if entries.get(key).is_some_and(|v| v == value) {
            entries.remove(key);
            return Ok(true);
        }
        Ok(false)
    }
}
