// Library interface for scriptcache
// This allows integration tests and embedding hosts to use the loader directly

pub mod cli_utils;
pub mod config;
pub mod document;
pub mod logging;
pub mod script;
pub mod storage;
pub mod transport;

// Re-export commonly used types
pub use document::{Document, HtmlDocument};
pub use script::{CacheEntry, LoadError, LoadOutcome, LoadRequest, ScriptCache};
pub use storage::{FilesystemStore, KeyValueStore, MemoryStore};
pub use transport::{HttpTransport, Transport};
