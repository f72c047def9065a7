use clap::{Parser, Subcommand};

/// scriptcache - versioned script loader with a persistent local cache
///
/// Fetches a script at most once per version, keeps it in an origin-scoped
/// store and renders it inline into a page.
#[derive(Parser, Debug)]
#[command(name = "scriptcache")]
#[command(author = "Scriptcache Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Versioned script loader with a persistent local cache", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Common configuration arguments shared across commands
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonConfigArgs {
    /// Config file path
    #[arg(short = 'c', long, env = "SCRIPTCACHE_CONFIG")]
    pub config: Option<String>,

    /// Store root directory
    #[arg(long, env = "SCRIPTCACHE_STORE_DIR")]
    pub store_dir: Option<String>,

    /// Origin scope inside the store directory
    #[arg(long, env = "SCRIPTCACHE_ORIGIN")]
    pub origin: Option<String>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, env = "SCRIPTCACHE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a script (cached per version) and render it into a page
    Require(RequireArgs),

    /// Inspect and manage cached scripts
    Cache(CacheArgs),

    /// Configuration management utilities
    Config(ConfigArgs),
}

impl Commands {
    pub fn common(&self) -> Option<&CommonConfigArgs> {
        match self {
            Commands::Require(args) => Some(&args.common),
            Commands::Cache(args) => Some(&args.common),
            Commands::Config(_) => None,
        }
    }
}

#[derive(Parser, Debug)]
pub struct RequireArgs {
    /// Logical script name, used verbatim as the store key
    pub name: String,

    /// Version tag; any difference from the cached one triggers a refetch
    pub version: String,

    /// Script URL (relative URLs need http.base_url)
    pub url: String,

    /// Write the rendered page here instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Treat the store as unusable and load the script by reference
    #[arg(long)]
    pub no_store: bool,

    #[command(flatten)]
    pub common: CommonConfigArgs,
}

#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,

    #[command(flatten)]
    pub common: CommonConfigArgs,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// List cached scripts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one cached script
    Show {
        /// Script name
        name: String,

        /// Print the cached source after the summary
        #[arg(long)]
        content: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove one cached script
    Remove {
        /// Script name
        name: String,
    },

    /// Remove every cached script for the origin
    Clear,

    /// Check whether the store is usable
    Probe,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to config file
        path: String,
    },

    /// Print an example configuration
    Generate,

    /// Show effective configuration
    Show {
        /// Config file path
        #[arg(short, long, env = "SCRIPTCACHE_CONFIG")]
        config: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_require() {
        let cli = Cli::try_parse_from([
            "scriptcache",
            "require",
            "lib",
            "1.0.0",
            "https://cdn.example/lib.js",
            "--store-dir",
            "/tmp/store",
            "--no-store",
        ])
        .unwrap();

        match cli.command {
            Commands::Require(args) => {
                assert_eq!(args.name, "lib");
                assert_eq!(args.version, "1.0.0");
                assert!(args.no_store);
                assert_eq!(args.common.store_dir.as_deref(), Some("/tmp/store"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
