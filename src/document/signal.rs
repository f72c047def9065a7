/// Load-completion signals for external scripts
///
/// Modern hosts fire a load event; legacy hosts only expose a ready state that
/// has to be polled. Both are hidden behind [`LoadSignal`] and the adapter is
/// chosen once from the host's capabilities.
use super::{DocumentError, HostCapabilities, ReadyState, ScriptHandle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Waits until an external script has finished loading
#[async_trait]
pub trait LoadSignal: Send + Sync {
    fn name(&self) -> &'static str;

    /// Resolve once the host reports the script loaded, or fail on an error state
    async fn wait(&self, handle: ScriptHandle) -> Result<(), DocumentError>;
}

/// Which adapter to use for external script completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalPreference {
    /// Pick from host capabilities
    #[default]
    Auto,
    LoadEvent,
    ReadyState,
}

/// Event-driven adapter: sleeps until the host pushes a state change
#[derive(Debug, Default)]
pub struct LoadEventSignal;

#[async_trait]
impl LoadSignal for LoadEventSignal {
    fn name(&self) -> &'static str {
        "load-event"
    }

    async fn wait(&self, mut handle: ScriptHandle) -> Result<(), DocumentError> {
        let mut state = handle.ready_state();
        loop {
            if let Some(result) = settle(&handle, state) {
                return result;
            }

            state = match handle.next_state().await {
                Some(state) => state,
                None => {
                    // Host may have set a final state right before going away
                    let last = handle.ready_state();
                    return settle(&handle, last).unwrap_or_else(|| {
                        Err(DocumentError::Abandoned {
                            url: handle.url().to_string(),
                        })
                    });
                }
            };
        }
    }
}

/// Legacy adapter: samples the ready state on a fixed interval
#[derive(Debug)]
pub struct ReadyStatePolling {
    interval: Duration,
}

impl ReadyStatePolling {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for ReadyStatePolling {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

#[async_trait]
impl LoadSignal for ReadyStatePolling {
    fn name(&self) -> &'static str {
        "ready-state"
    }

    async fn wait(&self, handle: ScriptHandle) -> Result<(), DocumentError> {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;

            let state = handle.ready_state();
            if let Some(result) = settle(&handle, state) {
                return result;
            }
            if handle.host_gone() {
                return Err(DocumentError::Abandoned {
                    url: handle.url().to_string(),
                });
            }
        }
    }
}

fn settle(handle: &ScriptHandle, state: ReadyState) -> Option<Result<(), DocumentError>> {
    match state {
        state if state.is_done() => Some(Ok(())),
        ReadyState::Errored => Some(Err(DocumentError::LoadFailed {
            url: handle.url().to_string(),
        })),
        _ => None,
    }
}

/// Pick the completion adapter for a host
pub fn select_load_signal(
    capabilities: HostCapabilities,
    preference: SignalPreference,
    poll_interval: Duration,
) -> Arc<dyn LoadSignal> {
    let signal: Arc<dyn LoadSignal> = match preference {
        SignalPreference::LoadEvent => Arc::new(LoadEventSignal),
        SignalPreference::ReadyState => Arc::new(ReadyStatePolling::new(poll_interval)),
        SignalPreference::Auto if capabilities.load_event => Arc::new(LoadEventSignal),
        SignalPreference::Auto => Arc::new(ReadyStatePolling::new(poll_interval)),
    };

    debug!(signal = signal.name(), "selected load signal");
    signal
}
