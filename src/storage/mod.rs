pub mod cache_dir;
pub mod filesystem;
pub mod memory;

pub use cache_dir::default_store_dir;
pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;

use thiserror::Error;
use tracing::debug;

/// Key written and removed by [`probe`] to test whether a store is usable.
pub const PROBE_SENTINEL: &str = "__scriptcache_probe__";

/// Failures a persistent store can signal
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage is disabled or absent from the host environment
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Write rejected because the origin's quota is exhausted
    #[error("store quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Origin-scoped, synchronous key-value store holding string values.
///
/// Keys are used verbatim; two callers using the same key share one slot.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` on a miss
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// List stored keys in sorted order
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Check whether `store` accepts a write followed by a remove.
///
/// The sentinel key never survives the probe, even when the write fails.
pub fn probe(store: &dyn KeyValueStore) -> bool {
    let written = store.set(PROBE_SENTINEL, PROBE_SENTINEL);
    let removed = store.remove(PROBE_SENTINEL);

    match (written, removed) {
        (Ok(()), Ok(())) => true,
        (Err(e), _) | (_, Err(e)) => {
            debug!(operation = "probe", status = "error", error = %e, "store unusable");
            false
        }
    }
}
