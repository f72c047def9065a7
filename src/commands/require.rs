/// `scriptcache require` command implementation
///
/// Runs one load request against the filesystem store and HTTP transport and
/// renders the resulting page.
use anyhow::{Context, Result};
use std::fs;
use std::sync::Arc;
use tracing::warn;

use super::{effective_config, open_store};
use crate::cli::RequireArgs;
use scriptcache::cli_utils::scriptcache_prefix;
use scriptcache::document::{select_load_signal, Document, HtmlDocument};
use scriptcache::storage::{KeyValueStore, MemoryStore};
use scriptcache::transport::HttpTransport;
use scriptcache::{LoadOutcome, LoadRequest, ScriptCache};

pub async fn run(args: &RequireArgs) -> Result<()> {
    let config = effective_config(&args.common)?;

    let store: Arc<dyn KeyValueStore> = if args.no_store {
        Arc::new(unusable_store())
    } else {
        match open_store(&config) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!("{:#}; loading without the store", e);
                Arc::new(unusable_store())
            }
        }
    };

    let transport = HttpTransport::new(
        config.http.timeout(),
        &config.http.user_agent,
        config.http.base_url.as_deref(),
    )
    .context("Failed to create HTTP transport")?;

    let mut document = HtmlDocument::new();
    if let Some(title) = &config.document.title {
        document = document.with_title(title.clone());
    }
    let document = Arc::new(document);

    let load_signal = select_load_signal(
        document.capabilities(),
        config.document.load_signal,
        config.document.poll_interval(),
    );
    let cache = ScriptCache::new(store, Arc::new(transport), document.clone())
        .with_probe_mode(config.store.probe)
        .with_load_signal(load_signal);

    let request = LoadRequest::new(&args.name, &args.version, &args.url);
    let outcome = cache
        .require(&request)
        .await
        .with_context(|| format!("Failed to load script '{}'", args.name))?;

    let summary = match outcome {
        LoadOutcome::CacheHit => "HIT".to_string(),
        LoadOutcome::Fetched { replaced: None } => "MISS (fetched)".to_string(),
        LoadOutcome::Fetched {
            replaced: Some(old),
        } => format!("STALE (replaced {})", old),
        LoadOutcome::Fallback => "DIRECT (store unavailable)".to_string(),
    };
    eprintln!(
        "{} {}@{}: {}",
        scriptcache_prefix(),
        args.name,
        args.version,
        summary
    );

    let html = document.render();
    match &args.output {
        Some(path) => {
            fs::write(path, html).with_context(|| format!("Failed to write {}", path))?;
            eprintln!("{} Wrote {}", scriptcache_prefix(), path);
        }
        None => print!("{}", html),
    }

    Ok(())
}

fn unusable_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.set_disabled(true);
    store
}
