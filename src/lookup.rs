//! lookup.rs - Catalog-guarded price lookup dispatching to exchange adapters

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::PairCatalog;
use crate::models::{Exchange, LookupResult, Symbol};
use crate::price_feed::PriceFeed;

pub struct PriceLookup {
    catalog: Arc<PairCatalog>,
    feeds: HashMap<Exchange, Arc<dyn PriceFeed>>,
}

impl PriceLookup {
    pub fn new(catalog: Arc<PairCatalog>, feeds: Vec<Arc<dyn PriceFeed>>) -> Self {
        let feeds = feeds.into_iter().map(|f| (f.exchange(), f)).collect();
        PriceLookup { catalog, feeds }
    }

    pub fn catalog(&self) -> &Arc<PairCatalog> {
        &self.catalog
    }

    /// Price of `symbol` on `exchange`.
    ///
    /// No pairs known for the exchange yet gives `SourceUnavailable`; a symbol
    /// missing from a loaded listing gives `PairNotFound`. Neither case
    /// touches the network.
    pub async fn get_price(&self, symbol: &Symbol, exchange: Exchange) -> LookupResult {
        let snapshot = self.catalog.snapshot().await;

        let Some(pairs) = snapshot.get(&exchange) else {
            warn!("⚠ No trading pair data available for {}", exchange);
            return LookupResult::SourceUnavailable;
        };

        if !pairs.contains(symbol) {
            debug!("Pair {} not found on {}", symbol, exchange);
            return LookupResult::PairNotFound;
        }

        match self.feeds.get(&exchange) {
            Some(feed) => feed.fetch_price(symbol).await,
            None => {
                warn!("⚠ No price feed registered for {}", exchange);
                LookupResult::SourceUnavailable
            }
        }
    }
}
