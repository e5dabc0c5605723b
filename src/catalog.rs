//! catalog.rs - Per-exchange set of tradable base symbols
//!
//! Readers always see one complete snapshot: a refresh fetches every listing
//! first (no lock held), then swaps in a new `Arc` under a brief write lock.

use futures::future::join_all;
use log::{error, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::CatalogError;
use crate::models::{Exchange, Symbol};
use crate::price_feed::PriceFeed;

pub type CatalogSnapshot = HashMap<Exchange, HashSet<Symbol>>;

/// Which exchanges a refresh updated and which kept their previous entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: Vec<Exchange>,
    pub failed: Vec<Exchange>,
    pub total_pairs: usize,
}

impl RefreshReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub struct PairCatalog {
    feeds: Vec<Arc<dyn PriceFeed>>,
    snapshot: RwLock<Arc<CatalogSnapshot>>,
}

impl PairCatalog {
    pub fn new(feeds: Vec<Arc<dyn PriceFeed>>) -> Self {
        PairCatalog {
            feeds,
            snapshot: RwLock::new(Arc::new(CatalogSnapshot::new())),
        }
    }

    /// Current complete snapshot
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// `symbol` must already be normalized
    pub async fn is_valid(&self, exchange: Exchange, symbol: &Symbol) -> bool {
        self.snapshot
            .read()
            .await
            .get(&exchange)
            .is_some_and(|pairs| pairs.contains(symbol))
    }

    /// Total number of symbols across all exchanges
    pub async fn snapshot_size(&self) -> usize {
        self.snapshot.read().await.values().map(HashSet::len).sum()
    }

    /// Re-fetch every exchange's listing.
    ///
    /// Failed exchanges keep their previous entry. If every exchange fails the
    /// snapshot is left untouched and `TotalFailure` is returned.
    pub async fn refresh(&self) -> Result<RefreshReport, CatalogError> {
        if self.feeds.is_empty() {
            return Err(CatalogError::NoFeeds);
        }

        let fetches = self.feeds.iter().map(|feed| async move {
            info!("🔄 Fetching trading pairs from {}...", feed.exchange());
            (feed.exchange(), feed.fetch_pairs().await)
        });
        let results = join_all(fetches).await;

        let mut report = RefreshReport::default();
        let mut fresh = Vec::new();

        for (exchange, result) in results {
            match result {
                Ok(pairs) if !pairs.is_empty() => {
                    info!("✓ Retrieved {} pairs from {}", pairs.len(), exchange);
                    report.refreshed.push(exchange);
                    fresh.push((exchange, pairs));
                }
                Ok(_) => {
                    warn!("⚠ {}: listing came back empty, keeping previous pairs", exchange);
                    report.failed.push(exchange);
                }
                Err(e) => {
                    warn!("⚠ {}: failed to fetch pairs ({}), keeping previous pairs", exchange, e);
                    report.failed.push(exchange);
                }
            }
        }

        if fresh.is_empty() {
            error!("✗ Pair refresh failed for every exchange, keeping stale catalog");
            return Err(CatalogError::TotalFailure { failed: report.failed });
        }

        let mut guard = self.snapshot.write().await;
        let mut next: CatalogSnapshot = (**guard).clone();
        next.extend(fresh);
        report.total_pairs = next.values().map(HashSet::len).sum();
        *guard = Arc::new(next);
        drop(guard);

        if report.is_partial() {
            warn!(
                "Pair catalog partially refreshed: {} pairs, failed: {:?}",
                report.total_pairs, report.failed
            );
        } else {
            info!("✅ Pair catalog refreshed: {} pairs", report.total_pairs);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price_feed::MockPriceFeed;
    use rust_decimal_macros::dec;

    fn catalog_with(feeds: &[Arc<MockPriceFeed>]) -> PairCatalog {
        PairCatalog::new(feeds.iter().map(|f| f.clone() as Arc<dyn PriceFeed>).collect())
    }

    #[tokio::test]
    async fn test_empty_until_refreshed() {
        let binance = Arc::new(MockPriceFeed::new(Exchange::Binance).with_price("BTC", dec!(1)));
        let catalog = catalog_with(&[binance]);

        assert_eq!(catalog.snapshot_size().await, 0);
        assert!(!catalog.is_valid(Exchange::Binance, &Symbol::new("BTC")).await);

        let report = catalog.refresh().await.unwrap();
        assert_eq!(report.refreshed, vec![Exchange::Binance]);
        assert!(catalog.is_valid(Exchange::Binance, &Symbol::new("btc")).await);
        assert_eq!(catalog.snapshot_size().await, 1);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_previous_entry() {
        let a = Arc::new(MockPriceFeed::new(Exchange::Binance).with_price("BTC", dec!(1)));
        let b = Arc::new(MockPriceFeed::new(Exchange::ByBit).with_price("ETH", dec!(1)));
        let catalog = catalog_with(&[a.clone(), b.clone()]);
        catalog.refresh().await.unwrap();

        a.set_price("SOL", dec!(2)).await;
        b.set_price("XRP", dec!(3)).await;
        b.set_listing_fails(true);

        let report = catalog.refresh().await.unwrap();
        assert!(report.is_partial());
        assert_eq!(report.failed, vec![Exchange::ByBit]);

        let snapshot = catalog.snapshot().await;
        assert_eq!(snapshot[&Exchange::Binance].len(), 2);
        assert_eq!(
            snapshot[&Exchange::ByBit],
            HashSet::from([Symbol::new("ETH")])
        );
    }

    #[tokio::test]
    async fn test_total_failure_leaves_snapshot_identical() {
        let a = Arc::new(MockPriceFeed::new(Exchange::Binance).with_price("BTC", dec!(1)));
        let b = Arc::new(MockPriceFeed::new(Exchange::Okx).with_price("TON", dec!(1)));
        let catalog = catalog_with(&[a.clone(), b.clone()]);
        catalog.refresh().await.unwrap();
        let before = catalog.snapshot().await;

        a.set_listing_fails(true);
        b.set_listing_fails(true);

        let err = catalog.refresh().await.unwrap_err();
        assert_eq!(err, CatalogError::TotalFailure { failed: vec![Exchange::Binance, Exchange::Okx] });
        assert_eq!(*catalog.snapshot().await, *before);
    }

    #[tokio::test]
    async fn test_total_failure_on_first_refresh_stays_empty() {
        let a = Arc::new(MockPriceFeed::new(Exchange::Binance));
        let catalog = catalog_with(&[a]);

        assert!(catalog.refresh().await.is_err());
        assert_eq!(catalog.snapshot_size().await, 0);
    }

    #[tokio::test]
    async fn test_no_feeds() {
        let catalog = PairCatalog::new(Vec::new());
        assert_eq!(catalog.refresh().await.unwrap_err(), CatalogError::NoFeeds);
    }

    #[tokio::test]
    async fn test_refresh_replaces_exchange_set_wholesale() {
        let a = Arc::new(MockPriceFeed::new(Exchange::Binance)
            .with_price("BTC", dec!(1))
            .with_price("LUNA", dec!(1)));
        let catalog = catalog_with(&[a.clone()]);
        catalog.refresh().await.unwrap();

        a.delist("LUNA").await;
        catalog.refresh().await.unwrap();

        assert!(!catalog.is_valid(Exchange::Binance, &Symbol::new("LUNA")).await);
        assert!(catalog.is_valid(Exchange::Binance, &Symbol::new("BTC")).await);
    }
}
