//! Cache warm-up CLI
//!
//! Fetches every catalog indicator from the World Bank into the on-disk
//! cache so the API server can start without network access.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use climate_domain::Catalog;
use climate_store::{Collector, DiskCache, WorldBankClient, WorldBankConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "climate-fetch")]
#[command(about = "Warm the World Bank indicator cache")]
struct Args {
    /// Directory holding world_bank_cache.json
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Hours before the cache is considered stale
    #[arg(long, env = "WB_CACHE_HOURS", default_value = "24")]
    cache_hours: u64,

    /// World Bank API base URL
    #[arg(long, env = "WB_BASE_URL", default_value = climate_store::worldbank::DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Parallel fetches
    #[arg(long, default_value = "12")]
    concurrency: usize,

    /// JSON catalog override; the built-in catalog when unset
    #[arg(long = "catalog", env = "CATALOG_PATH")]
    catalog_path: Option<PathBuf>,

    /// Ignore the existing cache and fetch everything
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("climate_store=info".parse()?)
                .add_directive("climate_fetch=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let catalog = Catalog::load(args.catalog_path.as_deref())?;

    info!(
        indicators = catalog.len(),
        data_dir = %args.data_dir.display(),
        force = args.force,
        "Warming indicator cache"
    );

    let client = WorldBankClient::new(WorldBankConfig {
        base_url: args.base_url,
        timeout: Duration::from_secs(args.timeout_secs),
        ..WorldBankConfig::default()
    })?;
    let max_age = Duration::from_secs(args.cache_hours.saturating_mul(3600));
    let cache = DiskCache::new(&args.data_dir, max_age);
    let collector = Collector::new(client)
        .with_cache(cache)
        .with_concurrency(args.concurrency);

    let codes: Vec<String> = catalog.indicators().map(|d| d.code.clone()).collect();
    let store = collector.collect(&codes, args.force).await?;

    info!(
        indicators = store.indicator_count(),
        countries = store.countries().len(),
        unavailable = ?store.unavailable(),
        "Cache warm-up complete"
    );
    Ok(())
}
