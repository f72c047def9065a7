use anyhow::Result;
use tracing::info;

use crate::cli::ConfigCommands;
use scriptcache::config::ScriptcacheConfig;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Validate { path } => validate(&path),
        ConfigCommands::Generate => generate(),
        ConfigCommands::Show { config } => show(config),
    }
}

fn validate(path: &str) -> Result<()> {
    info!("Validating config file: {}", path);

    let config = ScriptcacheConfig::from_file(path)?;
    config.validate()?;

    println!("✓ Configuration file is valid: {}", path);
    println!("\nSummary:");
    println!("  - Store directory: {}", config.store.resolved_dir().display());
    println!("  - Origin: {}", config.store.origin);
    println!("  - HTTP timeout: {}s", config.http.timeout_secs);
    if let Some(base) = &config.http.base_url {
        println!("  - Base URL: {}", base);
    }

    Ok(())
}

fn generate() -> Result<()> {
    info!("Generating example config");
    println!("{}", ScriptcacheConfig::example()?);
    Ok(())
}

fn show(config_path: Option<String>) -> Result<()> {
    info!("Showing effective configuration");

    let config = ScriptcacheConfig::load(config_path.as_deref())?;

    println!("Effective Configuration:\n");
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}
