use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::document::SignalPreference;
use crate::script::ProbeMode;
use crate::storage::default_store_dir;
use crate::transport::http::USER_AGENT_VALUE;

/// Complete scriptcache configuration (loaded from TOML file)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScriptcacheConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub document: DocumentConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Persistent store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store root directory (empty = platform cache dir)
    #[serde(default)]
    pub dir: String,

    /// Origin scope; each origin gets its own sub-directory
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Probe store availability on every request or once per process
    #[serde(default)]
    pub probe: ProbeMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            origin: default_origin(),
            probe: ProbeMode::default(),
        }
    }
}

impl StoreConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        if self.dir.is_empty() {
            default_store_dir()
        } else {
            PathBuf::from(&self.dir)
        }
    }
}

/// Script fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Base for resolving relative script URLs
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            base_url: None,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Document / host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Completion signal for directly loaded scripts: auto, load-event, ready-state
    #[serde(default)]
    pub load_signal: SignalPreference,

    /// Ready-state polling interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Title of the rendered page
    #[serde(default)]
    pub title: Option<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            load_signal: SignalPreference::default(),
            poll_interval_ms: default_poll_interval_ms(),
            title: None,
        }
    }
}

impl DocumentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_origin() -> String {
    "default".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    USER_AGENT_VALUE.to_string()
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ScriptcacheConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: ScriptcacheConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load from `path` if given, defaults otherwise
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Generate example configuration as TOML string
    pub fn example() -> Result<String> {
        let config = ScriptcacheConfig {
            store: StoreConfig {
                dir: "/var/cache/scriptcache".to_string(),
                origin: "app.example.com".to_string(),
                probe: ProbeMode::Memoized,
            },
            http: HttpConfig {
                base_url: Some("https://app.example.com/".to_string()),
                ..Default::default()
            },
            document: DocumentConfig {
                title: Some("App".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        toml::to_string_pretty(&config).context("Failed to serialize example config")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.origin.is_empty() {
            anyhow::bail!("store.origin must be set");
        }

        if self.store.origin.contains(['/', '\\'])
            || matches!(self.store.origin.as_str(), "." | "..")
        {
            anyhow::bail!("store.origin must not contain path separators");
        }

        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be greater than 0");
        }

        if let Some(base) = &self.http.base_url {
            if !base.starts_with("http://") && !base.starts_with("https://") {
                anyhow::bail!("http.base_url must start with http:// or https://: {}", base);
            }
        }

        if self.document.poll_interval_ms == 0 {
            anyhow::bail!("document.poll_interval_ms must be greater than 0");
        }

        if !["trace", "debug", "info", "warn", "error"]
            .contains(&self.observability.log_level.as_str())
        {
            anyhow::bail!("observability.log_level must be one of: trace, debug, info, warn, error");
        }

        Ok(())
    }
}
