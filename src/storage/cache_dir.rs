use std::path::PathBuf;

/// Get default store directory following XDG conventions
///
/// - Linux/Unix: $XDG_CACHE_HOME/scriptcache or ~/.cache/scriptcache
/// - macOS: ~/Library/Caches/scriptcache
/// - Windows: %LOCALAPPDATA%/scriptcache
pub fn default_store_dir() -> PathBuf {
    if let Some(cache_dir) = dirs::cache_dir() {
        cache_dir.join("scriptcache")
    } else {
        // Fallback to current directory if we can't determine cache dir
        PathBuf::from(".scriptcache")
    }
}
