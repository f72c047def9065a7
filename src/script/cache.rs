/// Versioned script resolution
///
/// Decides, per (name, version), whether a script comes from the store, from
/// the network, or from the host's own loader when the store is unusable, and
/// then places it in the document.
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::entry::{CacheEntry, EntryState};
use crate::document::signal::{select_load_signal, SignalPreference, DEFAULT_POLL_INTERVAL};
use crate::document::{Document, DocumentError, LoadSignal};
use crate::logging::{operations, services, status};
use crate::storage::{probe, KeyValueStore, StoreError, PROBE_SENTINEL};
use crate::transport::{FetchError, Transport};

/// One call to load a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Store key; callers must keep names unique across unrelated scripts
    pub name: String,
    /// Opaque version tag, compared by exact equality
    pub version: String,
    pub url: String,
}

impl LoadRequest {
    pub fn new(name: impl Into<String>, version: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            url: url.into(),
        }
    }

    fn validate(&self) -> Result<(), LoadError> {
        if self.name.is_empty() {
            return Err(LoadError::InvalidRequest("script name is empty".to_string()));
        }
        if self.name == PROBE_SENTINEL {
            return Err(LoadError::InvalidRequest(format!(
                "script name '{}' is reserved",
                PROBE_SENTINEL
            )));
        }
        Ok(())
    }
}

/// How a script reached the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Served from a version-matching store entry
    CacheHit,
    /// Fetched over the network; `replaced` holds the stale version it superseded
    Fetched { replaced: Option<String> },
    /// Store unusable, loaded through the host's own script loader
    Fallback,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid load request: {0}")]
    InvalidRequest(String),

    #[error("error loading {url}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// When to run the store availability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeMode {
    /// Probe before every top-level request
    #[default]
    EveryRequest,
    /// Probe once and reuse the answer until a store call fails
    Memoized,
}

/// Script loader with a persistent versioned cache
pub struct ScriptCache {
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    document: Arc<dyn Document>,
    load_signal: Arc<dyn LoadSignal>,
    probe_mode: ProbeMode,
    probe_memo: Mutex<Option<bool>>,
}

impl ScriptCache {
    /// Create a loader; the load signal is chosen from the document's capabilities
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
        document: Arc<dyn Document>,
    ) -> Self {
        let load_signal = select_load_signal(
            document.capabilities(),
            SignalPreference::Auto,
            DEFAULT_POLL_INTERVAL,
        );

        Self {
            store,
            transport,
            document,
            load_signal,
            probe_mode: ProbeMode::default(),
            probe_memo: Mutex::new(None),
        }
    }

    pub fn with_probe_mode(mut self, probe_mode: ProbeMode) -> Self {
        self.probe_mode = probe_mode;
        self
    }

    pub fn with_load_signal(mut self, load_signal: Arc<dyn LoadSignal>) -> Self {
        self.load_signal = load_signal;
        self
    }

    /// Whether the store can be used for this request
    pub fn store_available(&self) -> bool {
        match self.probe_mode {
            ProbeMode::EveryRequest => probe(self.store.as_ref()),
            ProbeMode::Memoized => {
                let mut memo = self.probe_memo.lock().unwrap_or_else(|e| e.into_inner());
                *memo.get_or_insert_with(|| probe(self.store.as_ref()))
            }
        }
    }

    fn forget_probe(&self) {
        *self.probe_memo.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Make sure the store holds `request.version` of the script and return it.
    ///
    /// Stale and malformed entries are removed before the network fetch, so a
    /// concurrent reader may briefly observe a miss.
    pub async fn ensure_cached(
        &self,
        request: &LoadRequest,
    ) -> Result<(CacheEntry, LoadOutcome), LoadError> {
        request.validate()?;
        let key = request.name.as_str();

        let raw = self.store.get(key)?;
        let replaced = match EntryState::classify(raw.as_deref(), &request.version) {
            EntryState::Fresh(entry) => {
                info!(
                    service = services::SCRIPT_CACHE,
                    operation = operations::RESOLVE,
                    status = status::HIT,
                    key = key,
                    version = %request.version,
                    "cache hit"
                );
                return Ok((entry, LoadOutcome::CacheHit));
            }
            EntryState::Missing => {
                info!(
                    service = services::SCRIPT_CACHE,
                    operation = operations::RESOLVE,
                    status = status::MISS,
                    key = key,
                    version = %request.version,
                    "cache miss"
                );
                None
            }
            EntryState::Stale { cached_version } => {
                info!(
                    service = services::SCRIPT_CACHE,
                    operation = operations::RESOLVE,
                    status = status::STALE,
                    key = key,
                    cached_version = %cached_version,
                    version = %request.version,
                    "cached version differs, refetching"
                );
                self.store.remove(key)?;
                Some(cached_version)
            }
            EntryState::Malformed => {
                warn!(
                    service = services::SCRIPT_CACHE,
                    operation = operations::RESOLVE,
                    status = status::MALFORMED,
                    key = key,
                    "stored value is not a cache entry, treating as miss"
                );
                self.store.remove(key)?;
                None
            }
        };

        let entry = self.fetch(request).await?;
        self.write(key, &entry);

        Ok((entry, LoadOutcome::Fetched { replaced }))
    }

    async fn fetch(&self, request: &LoadRequest) -> Result<CacheEntry, LoadError> {
        debug!(
            service = services::SCRIPT_CACHE,
            operation = operations::FETCH,
            url = %request.url,
            "fetching script"
        );

        let content = self
            .transport
            .get_text(&request.url)
            .await
            .map_err(|source| LoadError::Fetch {
                url: request.url.clone(),
                source,
            })?;

        info!(
            service = services::SCRIPT_CACHE,
            operation = operations::FETCH,
            status = status::SUCCESS,
            url = %request.url,
            size_bytes = content.len(),
            "fetched script"
        );

        Ok(CacheEntry::new(content, request.version.clone()))
    }

    /// Persist a fetched entry. A failed write only costs the next request a refetch.
    fn write(&self, key: &str, entry: &CacheEntry) {
        let result = entry
            .to_json()
            .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
            .and_then(|raw| self.store.set(key, &raw));

        if let Err(e) = result {
            if matches!(e, StoreError::Unavailable(_)) {
                self.forget_probe();
            }
            warn!(
                service = services::SCRIPT_CACHE,
                operation = operations::PUT,
                status = status::ERROR,
                key = key,
                error = %e,
                "failed to store fetched script"
            );
        }
    }

    /// Append script source to the document head as an inline element
    pub fn inject(&self, content: &str) -> Result<(), DocumentError> {
        self.document.append_inline(content)?;
        debug!(
            service = services::SCRIPT_CACHE,
            operation = operations::INJECT,
            size_bytes = content.len(),
            "injected script"
        );
        Ok(())
    }

    /// Load through the host's script loader, bypassing the store entirely
    pub async fn load_direct(&self, request: &LoadRequest) -> Result<LoadOutcome, LoadError> {
        info!(
            service = services::SCRIPT_CACHE,
            operation = operations::FALLBACK,
            url = %request.url,
            signal = self.load_signal.name(),
            "store unavailable, loading script directly"
        );

        let handle = self.document.append_external(&request.url)?;
        self.load_signal.wait(handle).await?;
        Ok(LoadOutcome::Fallback)
    }

    /// Resolve one request and place the script in the document exactly once
    pub async fn require(&self, request: &LoadRequest) -> Result<LoadOutcome, LoadError> {
        request.validate()?;

        if !self.store_available() {
            return self.load_direct(request).await;
        }

        let (entry, outcome) = match self.ensure_cached(request).await {
            Ok(resolved) => resolved,
            Err(LoadError::Store(e @ StoreError::Unavailable(_))) => {
                // Store went away after the probe
                warn!(
                    service = services::SCRIPT_CACHE,
                    operation = operations::RESOLVE,
                    status = status::ERROR,
                    key = %request.name,
                    error = %e,
                    "store failed mid-request, loading script directly"
                );
                self.forget_probe();
                return self.load_direct(request).await;
            }
            Err(e) => return Err(e),
        };

        self.inject(&entry.content)?;
        Ok(outcome)
    }

    /// Callback surface: run `callback` once the script is in the document.
    ///
    /// On failure the callback is dropped uncalled and a warning naming the
    /// URL is logged; nothing is returned to the caller.
    pub async fn require_script<F>(&self, name: &str, version: &str, url: &str, callback: Option<F>)
    where
        F: FnOnce() + Send,
    {
        let request = LoadRequest::new(name, version, url);
        match self.require(&request).await {
            Ok(_) => {
                if let Some(callback) = callback {
                    callback();
                }
            }
            Err(e) => {
                warn!(
                    service = services::SCRIPT_CACHE,
                    url = %request.url,
                    error = %e,
                    "error loading {}",
                    request.url
                );
            }
        }
    }

    /// Like [`ScriptCache::require_script`] but returns as soon as loading has started
    pub fn spawn_require_script<F>(
        self: &Arc<Self>,
        name: &str,
        version: &str,
        url: &str,
        callback: Option<F>,
    ) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let cache = Arc::clone(self);
        let (name, version, url) = (name.to_string(), version.to_string(), url.to_string());
        tokio::spawn(async move {
            cache.require_script(&name, &version, &url, callback).await;
        })
    }
}
