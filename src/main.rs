//! resource-cache: fetch a JSON resource through a cached, retrying handle.
//!
//! ```text
//! config.toml ──▶ Config ──▶ FetchOptions ──▶ ResourceHandle ──▶ reqwest GET
//!                    │                              │
//!                    └──▶ ResourceCache ◀───────────┘  (repeat N times; later runs hit the cache)
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use async_resource_cache::cache::janitor::spawn_janitor;
use async_resource_cache::config::{load_config, Config};
use async_resource_cache::observability::{logging, metrics};
use async_resource_cache::{FetchOptions, FetchOutcome, ResourceCache, Shutdown};

#[derive(Parser)]
#[command(name = "resource-cache")]
#[command(about = "Fetch a JSON resource with timeout, retry and TTL caching", long_about = None)]
struct Cli {
    /// URL returning a JSON document.
    url: String,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cache key (defaults to the URL).
    #[arg(short, long)]
    key: Option<String>,

    /// Number of sequential fetches to perform.
    #[arg(short, long, default_value_t = 1)]
    repeat: u32,

    /// Bypass the cache with a forced refetch on every repetition.
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("resource-cache v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        timeout_ms = config.fetch.timeout_ms,
        max_attempts = config.retry.max_attempts,
        ttl_ms = config.cache.ttl_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let cache = ResourceCache::from_config(&config.cache);
    let shutdown = Shutdown::new();
    let janitor = (config.cache.purge_interval_secs > 0).then(|| {
        spawn_janitor(
            cache.clone(),
            Duration::from_secs(config.cache.purge_interval_secs),
            shutdown.subscribe(),
        )
    });

    let client = reqwest::Client::new();
    let url = cli.url.clone();
    let key = cli.key.clone().unwrap_or_else(|| cli.url.clone());

    for run in 1..=cli.repeat.max(1) {
        let client = client.clone();
        let url = url.clone();
        let options = FetchOptions::from_config(&config)
            .cached(key.clone())
            .fetch_on_mount(false);

        let handle = cache.run(
            move |_token| {
                let client = client.clone();
                let url = url.clone();
                async move {
                    let response = client.get(&url).send().await?.error_for_status()?;
                    response.json::<serde_json::Value>().await
                }
            },
            options,
        );

        let outcome = if cli.force {
            handle.refetch().await
        } else {
            handle.execute().await
        };

        match outcome {
            FetchOutcome::Fresh(value) | FetchOutcome::Cached(value) => {
                tracing::info!(run, handle = %handle.id(), "Resource available");
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            FetchOutcome::Failed(e) => {
                tracing::error!(run, error = %e, "Fetch failed");
            }
            FetchOutcome::Cancelled(reason) => {
                tracing::warn!(run, %reason, "Fetch ended without a result");
            }
        }
    }

    let stats = cache.stats();
    tracing::info!(
        entries = stats.entries,
        hits = stats.hits,
        misses = stats.misses,
        expired = stats.expired,
        "Cache statistics"
    );

    shutdown.trigger();
    if let Some(task) = janitor {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
