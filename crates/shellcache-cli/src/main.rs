//! shellcache - offline shell cache maintenance for the catalogue app.
//!
//! Drives the cache worker end-to-end from the command line: precache the
//! application shell, inspect cached generations, fetch with offline
//! fallback, or drop everything.

use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shellcache_core::{
    channel, AssetManifest, CacheStorage, CacheWorker, Config, DiskStorage, HttpNetwork,
    NullPlatform, Request, WorkerHandle,
};

// ============================================================================
// Constants
// ============================================================================

/// Event channel depth between this process and the worker loop.
const EVENT_CHANNEL_SIZE: usize = 16;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Set up logging with environment-based filter
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(origin) = std::env::var("SHELLCACHE_ORIGIN") {
        config.origin = origin;
    }
    if let Ok(tag) = std::env::var("SHELLCACHE_GENERATION_TAG") {
        config.generation_tag = tag;
    }
    if let Ok(prefix) = std::env::var("SHELLCACHE_STATIC_BASE_PATH") {
        config.static_base_path = prefix;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    apply_env_overrides(&mut config);

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("install") => cmd_install(config).await,
        Some("status") => cmd_status(config).await,
        Some("fetch") => {
            let url = args
                .get(2)
                .ok_or_else(|| anyhow!("usage: shellcache fetch <url>"))?;
            cmd_fetch(config, url).await
        }
        Some("purge") => cmd_purge(config).await,
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    eprintln!("shellcache - offline shell cache for the catalogue app");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  shellcache install      precache the application shell and rotate generations");
    eprintln!("  shellcache status       show cached generations and entry ages");
    eprintln!("  shellcache fetch <url>  fetch network-first with offline fallback");
    eprintln!("  shellcache purge        drop every cached generation");
}

/// Wire the worker to the real network and the on-disk store, spawn its
/// event loop, and hand back the platform-side handle.
fn spawn_worker(config: &Config) -> Result<WorkerHandle> {
    let storage = DiskStorage::new(config.cache_dir()?)?;
    let network = HttpNetwork::new(config.origin.as_str())?;
    let worker = CacheWorker::new(
        config.clone(),
        Arc::new(network),
        Arc::new(storage),
        Arc::new(NullPlatform::new()),
    );
    let (handle, events) = channel(EVENT_CHANNEL_SIZE);
    tokio::spawn(worker.run(events));
    Ok(handle)
}

async fn cmd_install(config: Config) -> Result<()> {
    let assets = AssetManifest::from_config(&config).len();
    let handle = spawn_worker(&config)?;

    handle.install().await.context("install failed")?;
    handle.activate().await.context("activate failed")?;

    // Persist the configuration this shell was installed with, so status
    // and fetch run against the same generation later.
    config.save().context("Failed to save config")?;

    println!(
        "Cached {} shell assets into '{}'",
        assets, config.generation_tag
    );
    Ok(())
}

async fn cmd_status(config: Config) -> Result<()> {
    let storage = DiskStorage::new(config.cache_dir()?)?;
    let names = storage.keys().await?;
    if names.is_empty() {
        println!("No cached generations.");
        return Ok(());
    }

    for name in names {
        let marker = if name == config.generation_tag {
            "current"
        } else {
            "stale"
        };
        println!("{} ({})", name, marker);

        let bucket = storage.open(&name).await?;
        for url in bucket.urls().await? {
            if let Some(entry) = bucket.match_url(&url).await? {
                println!("  {:<50} {}", url, entry.age_display());
            }
        }
    }
    Ok(())
}

async fn cmd_fetch(config: Config, url: &str) -> Result<()> {
    let handle = spawn_worker(&config)?;
    handle.activate().await.context("activate failed")?;

    match handle.fetch(Request::new(url)).await? {
        Some(response) => {
            info!(url = %response.url, status = response.status, "response received");
            std::io::stdout().write_all(&response.body)?;
            Ok(())
        }
        None => Err(anyhow!(
            "request failed and no cached copy exists for {url}"
        )),
    }
}

async fn cmd_purge(config: Config) -> Result<()> {
    let storage = DiskStorage::new(config.cache_dir()?)?;
    let mut dropped = 0usize;
    for name in storage.keys().await? {
        if storage.delete(&name).await? {
            dropped += 1;
        }
    }
    println!("Dropped {} cached generation(s).", dropped);
    Ok(())
}
