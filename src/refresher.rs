//! refresher.rs - Background loop keeping the pair catalog current

use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use crate::catalog::PairCatalog;

pub struct CatalogRefresher {
    catalog: Arc<PairCatalog>,
    period: Duration,
}

impl CatalogRefresher {
    pub fn new(catalog: Arc<PairCatalog>, period: Duration) -> Self {
        CatalogRefresher { catalog, period }
    }

    /// Refresh every `period` forever; the first refresh happens one period
    /// from now since startup already loaded the catalog
    pub async fn run(self) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.refresh_once().await;
        }
    }

    /// Returns whether any exchange was refreshed
    pub async fn refresh_once(&self) -> bool {
        match self.catalog.refresh().await {
            Ok(report) => {
                info!(
                    "📊 Catalog now holds {} pairs ({} exchanges refreshed, {} stale)",
                    report.total_pairs,
                    report.refreshed.len(),
                    report.failed.len()
                );
                true
            }
            Err(e) => {
                error!("✗ Catalog refresh failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exchange, Symbol};
    use crate::price_feed::{MockPriceFeed, PriceFeed};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_refresh_once_survives_failure() {
        let feed = Arc::new(MockPriceFeed::new(Exchange::ByBit).with_price("BTC", dec!(1)));
        let catalog = Arc::new(PairCatalog::new(vec![feed.clone() as Arc<dyn PriceFeed>]));
        let refresher = CatalogRefresher::new(catalog.clone(), Duration::from_secs(600));

        assert!(refresher.refresh_once().await);

        feed.set_listing_fails(true);
        assert!(!refresher.refresh_once().await);
        assert!(catalog.is_valid(Exchange::ByBit, &Symbol::new("BTC")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_picks_up_new_pairs() {
        let feed = Arc::new(MockPriceFeed::new(Exchange::Binance).with_price("BTC", dec!(1)));
        let catalog = Arc::new(PairCatalog::new(vec![feed.clone() as Arc<dyn PriceFeed>]));
        catalog.refresh().await.unwrap();

        let task = tokio::spawn(CatalogRefresher::new(catalog.clone(), Duration::from_secs(600)).run());
        feed.set_price("PEPE", dec!(0.00001)).await;

        tokio::time::sleep(Duration::from_secs(601)).await;
        assert!(catalog.is_valid(Exchange::Binance, &Symbol::new("PEPE")).await);
        task.abort();
    }
}
