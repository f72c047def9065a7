use super::{KeyValueStore, StoreError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A single call made against a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Get(String),
    Set(String),
    Remove(String),
}

impl StoreOp {
    pub fn key(&self) -> &str {
        match self {
            StoreOp::Get(key) | StoreOp::Set(key) | StoreOp::Remove(key) => key,
        }
    }
}

/// In-memory store for tests and embedding.
///
/// Can be switched into a disabled state or given a byte quota to reproduce
/// the failure modes of a browser-style origin store. Every call is appended
/// to a journal, including calls that fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    journal: Mutex<Vec<StoreOp>>,
    disabled: AtomicBool,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes once keys plus values exceed `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Toggle the disabled state; every operation fails while disabled
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    /// Snapshot of all calls made so far
    pub fn journal(&self) -> Vec<StoreOp> {
        self.lock_journal().clone()
    }

    pub fn clear_journal(&self) {
        self.lock_journal().clear();
    }

    fn record(&self, op: StoreOp) {
        self.lock_journal().push(op);
    }

    fn lock_journal(&self) -> std::sync::MutexGuard<'_, Vec<StoreOp>> {
        self.journal.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_enabled(&self) -> Result<(), StoreError> {
        if self.disabled.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store disabled".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.record(StoreOp::Get(key.to_string()));
        self.check_enabled()?;
        Ok(self.lock_entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.record(StoreOp::Set(key.to_string()));
        self.check_enabled()?;

        let mut entries = self.lock_entries();
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.record(StoreOp::Remove(key.to_string()));
        self.check_enabled()?;
        self.lock_entries().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.check_enabled()?;
        Ok(self.lock_entries().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set("lib", "value").unwrap();
        assert_eq!(store.get("lib").unwrap(), Some("value".to_string()));

        store.remove("lib").unwrap();
        assert_eq!(store.get("lib").unwrap(), None);

        // Removing an absent key is fine
        store.remove("lib").unwrap();
    }

    #[test]
    fn test_disabled_store_fails_every_operation() {
        let store = MemoryStore::new();
        store.set_disabled(true);

        assert!(matches!(store.get("a"), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.set("a", "b"), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.remove("a"), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_quota_counts_replaced_value_once() {
        let store = MemoryStore::with_quota(10);
        store.set("k", "12345").unwrap();
        // Replacing the same key does not double count the old value
        store.set("k", "123456789").unwrap();

        let err = store.set("k2", "x").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { ref key } if key == "k2"));
    }

    #[test]
    fn test_journal_records_failed_calls() {
        let store = MemoryStore::new();
        store.set_disabled(true);
        let _ = store.get("lib");

        assert_eq!(store.journal(), vec![StoreOp::Get("lib".to_string())]);
        store.clear_journal();
        assert!(store.journal().is_empty());
    }
}
