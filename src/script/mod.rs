// Versioned script loading backed by a persistent store
//
// - `entry`: persisted {content, version} format
// - `cache`: resolver, fetch-and-store, injection and direct-load fallback

pub mod cache;
pub mod entry;

pub use cache::{LoadError, LoadOutcome, LoadRequest, ProbeMode, ScriptCache};
pub use entry::{CacheEntry, EntryState};
