//! Document capability: where loaded scripts end up.
//!
//! A [`Document`] accepts two kinds of script elements. Inline elements carry
//! their source text and are executed by the host as part of the append.
//! External elements reference a URL that the host fetches itself; progress
//! is reported through a [`ScriptHandle`] whose ready state the host advances.

pub mod html;
pub mod signal;

pub use html::{HostMode, HtmlDocument};
pub use signal::{
    select_load_signal, LoadEventSignal, LoadSignal, ReadyStatePolling, SignalPreference,
};

use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum DocumentError {
    /// Host reported an error event for an external script
    #[error("host failed to load script {url}")]
    LoadFailed { url: String },

    /// Host dropped the script before reporting a terminal state
    #[error("host abandoned script {url} before it finished loading")]
    Abandoned { url: String },
}

/// Ready state of an external script element, mirroring the legacy host values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Uninitialized,
    Loading,
    Loaded,
    Complete,
    Errored,
}

impl ReadyState {
    /// Script finished loading and executing
    pub fn is_done(self) -> bool {
        matches!(self, ReadyState::Loaded | ReadyState::Complete)
    }

    pub fn is_terminal(self) -> bool {
        self.is_done() || self == ReadyState::Errored
    }
}

/// What the host environment can report about external scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Host fires a load event; when false only ready-state polling works
    pub load_event: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self { load_event: true }
    }
}

/// A script element as appended to the document head
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptElement {
    Inline { source: String },
    External { url: String },
}

/// Caller side of an external script load
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    url: String,
    state: watch::Receiver<ReadyState>,
}

/// Host side of an external script load
#[derive(Debug)]
pub struct ScriptLoadControl {
    url: String,
    state: watch::Sender<ReadyState>,
}

/// Create a linked handle/control pair for an external script at `url`
pub fn script_channel(url: &str) -> (ScriptHandle, ScriptLoadControl) {
    let (tx, rx) = watch::channel(ReadyState::Uninitialized);
    (
        ScriptHandle {
            url: url.to_string(),
            state: rx,
        },
        ScriptLoadControl {
            url: url.to_string(),
            state: tx,
        },
    )
}

impl ScriptHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ready_state(&self) -> ReadyState {
        *self.state.borrow()
    }

    /// True once the host side has been dropped
    pub fn host_gone(&self) -> bool {
        self.state.has_changed().is_err()
    }

    /// Wait for the next state change; `None` if the host went away
    pub async fn next_state(&mut self) -> Option<ReadyState> {
        self.state.changed().await.ok()?;
        Some(*self.state.borrow_and_update())
    }
}

impl ScriptLoadControl {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_state(&self, state: ReadyState) {
        // send_replace never fails, even with no receivers left
        self.state.send_replace(state);
    }
}

/// Capability to mutate the live document
pub trait Document: Send + Sync {
    fn capabilities(&self) -> HostCapabilities;

    /// Append an inline script to the head; the host executes it during the append
    fn append_inline(&self, source: &str) -> Result<(), DocumentError>;

    /// Append a `src`-referencing script and return a handle to its load progress
    fn append_external(&self, url: &str) -> Result<ScriptHandle, DocumentError>;
}
