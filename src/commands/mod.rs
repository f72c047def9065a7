pub mod cache;
pub mod config;
pub mod require;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::CommonConfigArgs;
use scriptcache::config::ScriptcacheConfig;
use scriptcache::storage::FilesystemStore;

/// Config file merged with command-line / environment overrides
pub fn effective_config(common: &CommonConfigArgs) -> Result<ScriptcacheConfig> {
    let mut config = ScriptcacheConfig::load(common.config.as_deref())?;

    if let Some(dir) = &common.store_dir {
        config.store.dir = dir.clone();
    }
    if let Some(origin) = &common.origin {
        config.store.origin = origin.clone();
    }
    if let Some(level) = &common.log_level {
        config.observability.log_level = level.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Log level from the command line, then the config file, then "info"
pub fn log_level(common: &CommonConfigArgs) -> String {
    common.log_level.clone().unwrap_or_else(|| {
        ScriptcacheConfig::load(common.config.as_deref())
            .map(|config| config.observability.log_level)
            .unwrap_or_else(|_| "info".to_string())
    })
}

pub fn open_store(config: &ScriptcacheConfig) -> Result<FilesystemStore> {
    let dir = config.store.resolved_dir();
    info!(
        "Using store {} (origin: {})",
        dir.display(),
        config.store.origin
    );
    FilesystemStore::new(&dir, &config.store.origin)
        .with_context(|| format!("Failed to open store at {}", dir.display()))
}
