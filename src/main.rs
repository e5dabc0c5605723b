//! main.rs - Entry point for the Price Sentinel service
//!
//! - Loads the pair catalog from every configured exchange
//! - Runs the catalog refresher and the price change detector side by side

use anyhow::Context;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::task::JoinError;

use price_sentinel::{
    exchanges, CatalogRefresher, ChangeDetector, Config, JsonWatchStore, LogNotifier, Notifier,
    PairCatalog, PriceFeed, PriceLookup, TelegramNotifier, WatchStore, NAME, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    info!("Starting {} v{}", NAME, VERSION);

    let config = Config::from_env().context("invalid configuration")?;

    let feeds = exchanges::build_feeds(&config).context("failed to build price feeds")?;
    if feeds.is_empty() {
        anyhow::bail!("no price sources configured");
    }
    let sources: Vec<String> = feeds.iter().map(|f| f.exchange().to_string()).collect();
    info!("✓ Price sources: {}", sources.join(", "));

    let catalog = Arc::new(PairCatalog::new(feeds.clone()));

    info!("🔄 Loading trading pairs...");
    if let Err(e) = catalog.refresh().await {
        error!("✗ Initial pair load failed: {}", e);
        return Err(e).context("could not load trading pairs");
    }
    let total = catalog.snapshot_size().await;
    if total == 0 {
        anyhow::bail!("the list of trading pairs is empty");
    }
    info!("✅ Loaded {} trading pairs", total);

    let store: Arc<dyn WatchStore> = Arc::new(
        JsonWatchStore::open(&config.store_path)
            .await
            .with_context(|| format!("failed to open {}", config.store_path.display()))?,
    );

    let notifier: Arc<dyn Notifier> = match &config.telegram_bot_token {
        Some(token) => Arc::new(
            TelegramNotifier::new(token, config.price_timeout).context("failed to build Telegram client")?,
        ),
        None => {
            warn!("TELEGRAM_BOT_TOKEN not set, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let lookup = Arc::new(PriceLookup::new(catalog.clone(), feeds));
    let detector = ChangeDetector::new(store, lookup, notifier, config.alert_threshold_pct);
    let refresher = CatalogRefresher::new(catalog, config.refresh_interval);

    info!(
        "🔎 Checking prices every {}s (threshold {}%), refreshing pairs every {}s",
        config.check_interval.as_secs(),
        config.alert_threshold_pct,
        config.refresh_interval.as_secs()
    );

    let detector_task = tokio::spawn(detector.run(config.check_interval));
    let refresher_task = tokio::spawn(refresher.run());

    tokio::select! {
        result = detector_task => Err(loop_stopped("price detector", result)),
        result = refresher_task => Err(loop_stopped("catalog refresher", result)),
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}

/// Both loops run forever, so any exit is a failure of the service
fn loop_stopped(name: &str, result: Result<(), JoinError>) -> anyhow::Error {
    error!("✗ {} stopped: {:?}", name, result);
    match result {
        Ok(()) => anyhow::anyhow!("{} exited unexpectedly", name),
        Err(e) => anyhow::Error::new(e).context(format!("{} crashed", name)),
    }
}
