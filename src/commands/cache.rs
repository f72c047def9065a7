/// `scriptcache cache` command implementation
///
/// Inspects and manages cached script entries (list, show, remove, clear, probe).
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{effective_config, open_store};
use crate::cli::{CacheArgs, CacheCommands};
use scriptcache::cli_utils::scriptcache_prefix;
use scriptcache::storage::{probe as probe_store, FilesystemStore, KeyValueStore};
use scriptcache::CacheEntry;

// JSON output structures
#[derive(Serialize, Deserialize)]
struct EntryOutput {
    name: String,
    version: Option<String>,
    size_bytes: usize,
    written_at: Option<String>,
    valid: bool,
}

#[derive(Serialize, Deserialize)]
struct ShowOutput {
    #[serde(flatten)]
    entry: EntryOutput,
    content: Option<String>,
}

pub async fn run(args: &CacheArgs) -> Result<()> {
    let config = effective_config(&args.common)?;
    let store = open_store(&config)?;

    match &args.command {
        CacheCommands::List { json } => list(&store, *json),
        CacheCommands::Show {
            name,
            content,
            json,
        } => show(&store, name, *content, *json),
        CacheCommands::Remove { name } => remove(&store, name),
        CacheCommands::Clear => clear(&store),
        CacheCommands::Probe => probe(&store),
    }
}

fn describe(
    store: &FilesystemStore,
    name: &str,
    raw: &str,
) -> Result<(EntryOutput, Option<CacheEntry>)> {
    let entry = CacheEntry::from_json(raw).ok();
    let written_at = store
        .written_at(name)?
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string());

    let output = EntryOutput {
        name: name.to_string(),
        version: entry.as_ref().map(|e| e.version.clone()),
        size_bytes: entry.as_ref().map(|e| e.content.len()).unwrap_or(raw.len()),
        written_at,
        valid: entry.is_some(),
    };
    Ok((output, entry))
}

/// List all cached scripts
fn list(store: &FilesystemStore, json: bool) -> Result<()> {
    let names = store.keys().context("Failed to list cached scripts")?;

    let mut entries = Vec::new();
    for name in names {
        if let Some(raw) = store.get(&name)? {
            entries.push(describe(store, &name, &raw)?.0);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No cached scripts.");
        return Ok(());
    }

    println!("Cached scripts ({} entries):", entries.len());
    println!();
    for entry in entries {
        match &entry.version {
            Some(version) => {
                println!("  {}@{} ({} bytes)", entry.name, version, entry.size_bytes)
            }
            None => println!("  {} (malformed, {} bytes)", entry.name, entry.size_bytes),
        }
        if let Some(written_at) = &entry.written_at {
            println!("    Written: {}", written_at);
        }
    }

    Ok(())
}

/// Show one cached script
fn show(store: &FilesystemStore, name: &str, with_content: bool, json: bool) -> Result<()> {
    let Some(raw) = store.get(name)? else {
        anyhow::bail!("No cached script named '{}'", name);
    };
    let (summary, entry) = describe(store, name, &raw)?;

    if json {
        let output = ShowOutput {
            entry: summary,
            content: with_content.then(|| entry.map(|e| e.content)).flatten(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Script: {}", summary.name);
    match &summary.version {
        Some(version) => println!("Version: {}", version),
        None => println!("Version: (malformed entry)"),
    }
    println!("Size: {} bytes", summary.size_bytes);
    if let Some(written_at) = &summary.written_at {
        println!("Written: {}", written_at);
    }

    if with_content {
        if let Some(entry) = entry {
            println!();
            println!("{}", entry.content);
        }
    }

    Ok(())
}

/// Remove one cached script
fn remove(store: &FilesystemStore, name: &str) -> Result<()> {
    store
        .remove(name)
        .with_context(|| format!("Failed to remove '{}'", name))?;
    println!("{} Removed {}", scriptcache_prefix(), name);
    Ok(())
}

/// Remove every cached script
fn clear(store: &FilesystemStore) -> Result<()> {
    let names = store.keys().context("Failed to list cached scripts")?;
    for name in &names {
        store
            .remove(name)
            .with_context(|| format!("Failed to remove '{}'", name))?;
    }
    println!(
        "{} Removed {} cached scripts.",
        scriptcache_prefix(),
        names.len()
    );
    Ok(())
}

/// Check store usability
fn probe(store: &FilesystemStore) -> Result<()> {
    if probe_store(store) {
        println!("Store: AVAILABLE ✓ ({})", store.origin_dir().display());
        Ok(())
    } else {
        anyhow::bail!("Store unavailable: {}", store.origin_dir().display())
    }
}
