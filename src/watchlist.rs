//! watchlist.rs - User-facing operations on favorites and price sources
//!
//! Chat front-ends call these; they share the lookup and store with the
//! background detector.

use log::info;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::error::WatchError;
use crate::lookup::PriceLookup;
use crate::models::{Exchange, LookupResult, Symbol, UserId};
use crate::store::WatchStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Newly watched; `price` is the baseline for change detection
    Added { symbol: Symbol, price: Decimal },
    AlreadyWatched { symbol: Symbol, price: Decimal },
}

/// Favorites with their current price on the active exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoritesView {
    pub exchange: Exchange,
    pub entries: Vec<(Symbol, Decimal)>,
}

pub struct WatchlistService {
    lookup: Arc<PriceLookup>,
    store: Arc<dyn WatchStore>,
}

impl WatchlistService {
    pub fn new(lookup: Arc<PriceLookup>, store: Arc<dyn WatchStore>) -> Self {
        WatchlistService { lookup, store }
    }

    /// Price of `raw_symbol` on the user's active exchange
    pub async fn quote(&self, user: UserId, raw_symbol: &str) -> Result<(Exchange, LookupResult), WatchError> {
        let symbol = Symbol::parse(raw_symbol)?;
        let exchange = self.store.active_source(user).await?;
        Ok((exchange, self.lookup.get_price(&symbol, exchange).await))
    }

    /// Watch `raw_symbol` on the active exchange, recording the current price as baseline
    pub async fn add_favorite(&self, user: UserId, raw_symbol: &str) -> Result<AddOutcome, WatchError> {
        let symbol = Symbol::parse(raw_symbol)?;
        let exchange = self.store.active_source(user).await?;

        let price = match self.lookup.get_price(&symbol, exchange).await {
            LookupResult::Price(price) => price,
            LookupResult::PairNotFound => {
                return Err(WatchError::PairNotFound {
                    symbol: symbol.to_string(),
                    exchange,
                })
            }
            LookupResult::SourceUnavailable => return Err(WatchError::SourceUnavailable { exchange }),
        };

        if self.store.favorites(user, exchange).await?.contains(&symbol) {
            if self.store.last_price(user, &symbol, exchange).await?.is_none() {
                self.store.update_last_price(user, &symbol, price, exchange).await?;
            }
            return Ok(AddOutcome::AlreadyWatched { symbol, price });
        }

        // Baseline first: a favorite is never visible to the detector without one
        self.store.update_last_price(user, &symbol, price, exchange).await?;
        self.store.add_favorite(user, &symbol, exchange).await?;
        info!("⭐ User {} now watches {} on {} (baseline {})", user, symbol, exchange, price);

        Ok(AddOutcome::Added { symbol, price })
    }

    /// Stop watching `raw_symbol` on the active exchange; no-op if not watched
    pub async fn remove_favorite(&self, user: UserId, raw_symbol: &str) -> Result<(Exchange, Symbol), WatchError> {
        let symbol = Symbol::parse(raw_symbol)?;
        let exchange = self.store.active_source(user).await?;
        self.store.remove_favorite(user, &symbol, exchange).await?;
        Ok((exchange, symbol))
    }

    /// Favorites on the active exchange that currently have a price
    pub async fn list_favorites(&self, user: UserId) -> Result<FavoritesView, WatchError> {
        let exchange = self.store.active_source(user).await?;
        let mut entries = Vec::new();

        for symbol in self.store.favorites(user, exchange).await? {
            if let LookupResult::Price(price) = self.lookup.get_price(&symbol, exchange).await {
                entries.push((symbol, price));
            }
        }

        Ok(FavoritesView { exchange, entries })
    }

    /// Switch the active exchange; `false` if it was already active
    pub async fn select_source(&self, user: UserId, exchange: Exchange) -> Result<bool, WatchError> {
        if self.store.active_source(user).await? == exchange {
            return Ok(false);
        }
        self.store.update_active_source(user, exchange).await?;
        info!("🔄 User {} switched source to {}", user, exchange);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PairCatalog;
    use crate::error::ValidationError;
    use crate::price_feed::{MockPriceFeed, PriceFeed};
    use crate::error::StoreError;
    use crate::store::JsonWatchStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Delegates to an in-memory store, failing one chosen write once
    struct FlakyStore {
        inner: JsonWatchStore,
        fail_price_write: AtomicBool,
        fail_favorite_write: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            FlakyStore {
                inner: JsonWatchStore::in_memory(),
                fail_price_write: AtomicBool::new(false),
                fail_favorite_write: AtomicBool::new(false),
            }
        }

        fn trip(flag: &AtomicBool) -> Result<(), StoreError> {
            if flag.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl WatchStore for FlakyStore {
        async fn all_users(&self) -> Result<Vec<UserId>, StoreError> {
            self.inner.all_users().await
        }

        async fn active_source(&self, user: UserId) -> Result<Exchange, StoreError> {
            self.inner.active_source(user).await
        }

        async fn update_active_source(&self, user: UserId, exchange: Exchange) -> Result<(), StoreError> {
            self.inner.update_active_source(user, exchange).await
        }

        async fn favorites(&self, user: UserId, exchange: Exchange) -> Result<Vec<Symbol>, StoreError> {
            self.inner.favorites(user, exchange).await
        }

        async fn add_favorite(&self, user: UserId, symbol: &Symbol, exchange: Exchange) -> Result<(), StoreError> {
            Self::trip(&self.fail_favorite_write)?;
            self.inner.add_favorite(user, symbol, exchange).await
        }

        async fn remove_favorite(&self, user: UserId, symbol: &Symbol, exchange: Exchange) -> Result<(), StoreError> {
            self.inner.remove_favorite(user, symbol, exchange).await
        }

        async fn last_price(
            &self,
            user: UserId,
            symbol: &Symbol,
            exchange: Exchange,
        ) -> Result<Option<Decimal>, StoreError> {
            self.inner.last_price(user, symbol, exchange).await
        }

        async fn update_last_price(
            &self,
            user: UserId,
            symbol: &Symbol,
            price: Decimal,
            exchange: Exchange,
        ) -> Result<(), StoreError> {
            Self::trip(&self.fail_price_write)?;
            self.inner.update_last_price(user, symbol, price, exchange).await
        }
    }

    async fn flaky_service(feed: Arc<MockPriceFeed>) -> (WatchlistService, Arc<FlakyStore>) {
        let feeds: Vec<Arc<dyn PriceFeed>> = vec![feed];
        let catalog = Arc::new(PairCatalog::new(feeds.clone()));
        catalog.refresh().await.unwrap();
        let lookup = Arc::new(PriceLookup::new(catalog, feeds));
        let store = Arc::new(FlakyStore::new());
        (WatchlistService::new(lookup, store.clone()), store)
    }

    async fn service_with(feeds: Vec<Arc<MockPriceFeed>>) -> (WatchlistService, Arc<JsonWatchStore>) {
        let feeds: Vec<Arc<dyn PriceFeed>> = feeds.into_iter().map(|f| f as Arc<dyn PriceFeed>).collect();
        let catalog = Arc::new(PairCatalog::new(feeds.clone()));
        catalog.refresh().await.unwrap();
        let lookup = Arc::new(PriceLookup::new(catalog, feeds));
        let store = Arc::new(JsonWatchStore::in_memory());
        (WatchlistService::new(lookup, store.clone()), store)
    }

    fn binance() -> Arc<MockPriceFeed> {
        Arc::new(MockPriceFeed::new(Exchange::Binance)
            .with_price("BTC", dec!(67000))
            .with_price("ETH", dec!(3000)))
    }

    #[tokio::test]
    async fn test_add_twice() {
        let (service, store) = service_with(vec![binance()]).await;

        assert!(matches!(service.add_favorite(1, "btc").await.unwrap(), AddOutcome::Added { .. }));
        assert_eq!(
            service.add_favorite(1, "BTC").await.unwrap(),
            AddOutcome::AlreadyWatched { symbol: Symbol::new("BTC"), price: dec!(67000) }
        );
        assert_eq!(store.favorites(1, Exchange::Binance).await.unwrap(), vec![Symbol::new("BTC")]);
    }

    #[tokio::test]
    async fn test_failed_baseline_write_does_not_leave_bare_favorite() {
        let (service, store) = flaky_service(binance()).await;
        let btc = Symbol::new("BTC");
        store.fail_price_write.store(true, Ordering::SeqCst);

        assert!(matches!(service.add_favorite(1, "BTC").await, Err(WatchError::Store(_))));
        assert!(store.favorites(1, Exchange::Binance).await.unwrap().is_empty());

        assert!(matches!(service.add_favorite(1, "BTC").await.unwrap(), AddOutcome::Added { .. }));
        assert_eq!(store.favorites(1, Exchange::Binance).await.unwrap(), vec![btc.clone()]);
        assert_eq!(store.last_price(1, &btc, Exchange::Binance).await.unwrap(), Some(dec!(67000)));
    }

    #[tokio::test]
    async fn test_readding_backfills_missing_baseline() {
        let (service, store) = flaky_service(binance()).await;
        let btc = Symbol::new("BTC");
        // a favorite saved without its baseline, e.g. by an older build
        store.inner.add_favorite(1, &btc, Exchange::Binance).await.unwrap();

        assert_eq!(
            service.add_favorite(1, "btc").await.unwrap(),
            AddOutcome::AlreadyWatched { symbol: btc.clone(), price: dec!(67000) }
        );
        assert_eq!(store.last_price(1, &btc, Exchange::Binance).await.unwrap(), Some(dec!(67000)));
    }

    #[tokio::test]
    async fn test_failed_favorite_write_keeps_retry_clean() {
        let feed = binance();
        let (service, store) = flaky_service(feed.clone()).await;
        let btc = Symbol::new("BTC");
        store.fail_favorite_write.store(true, Ordering::SeqCst);

        assert!(service.add_favorite(1, "BTC").await.is_err());
        assert!(store.all_users().await.unwrap().is_empty());

        feed.set_price("BTC", dec!(68000)).await;
        service.add_favorite(1, "BTC").await.unwrap();
        assert_eq!(store.last_price(1, &btc, Exchange::Binance).await.unwrap(), Some(dec!(68000)));
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input_and_unknown_pairs() {
        let (service, store) = service_with(vec![binance()]).await;

        assert!(matches!(
            service.add_favorite(1, "BTC-USDT").await,
            Err(WatchError::Validation(ValidationError::InvalidSymbolChar { ch: '-' }))
        ));
        assert!(matches!(
            service.add_favorite(1, "DOGE").await,
            Err(WatchError::PairNotFound { exchange: Exchange::Binance, .. })
        ));
        assert!(store.all_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_on_unloaded_source_is_unavailable() {
        let (service, _) = service_with(vec![binance()]).await;
        service.select_source(1, Exchange::CoinMarketCap).await.unwrap();

        assert!(matches!(
            service.add_favorite(1, "BTC").await,
            Err(WatchError::SourceUnavailable { exchange: Exchange::CoinMarketCap })
        ));
    }

    #[tokio::test]
    async fn test_list_and_remove() {
        let feed = binance();
        let (service, _) = service_with(vec![feed.clone()]).await;
        service.add_favorite(1, "ETH").await.unwrap();
        service.add_favorite(1, "BTC").await.unwrap();

        feed.set_price("ETH", dec!(3100)).await;
        let view = service.list_favorites(1).await.unwrap();
        assert_eq!(view.exchange, Exchange::Binance);
        assert_eq!(
            view.entries,
            vec![(Symbol::new("ETH"), dec!(3100)), (Symbol::new("BTC"), dec!(67000))]
        );

        service.remove_favorite(1, "eth").await.unwrap();
        service.remove_favorite(1, "eth").await.unwrap();
        let view = service.list_favorites(1).await.unwrap();
        assert_eq!(view.entries, vec![(Symbol::new("BTC"), dec!(67000))]);
    }

    #[tokio::test]
    async fn test_list_skips_unpriced_favorites() {
        let feed = binance();
        let (service, _) = service_with(vec![feed.clone()]).await;
        service.add_favorite(1, "BTC").await.unwrap();
        feed.set_prices_fail(true);

        assert!(service.list_favorites(1).await.unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn test_favorites_follow_active_source() {
        let okx = Arc::new(MockPriceFeed::new(Exchange::Okx).with_price("TON", dec!(5.5)));
        let (service, _) = service_with(vec![binance(), okx]).await;
        service.add_favorite(1, "BTC").await.unwrap();

        assert!(service.select_source(1, Exchange::Okx).await.unwrap());
        assert!(!service.select_source(1, Exchange::Okx).await.unwrap());
        assert!(service.list_favorites(1).await.unwrap().entries.is_empty());

        let (exchange, result) = service.quote(1, "ton").await.unwrap();
        assert_eq!(exchange, Exchange::Okx);
        assert_eq!(result, LookupResult::Price(dec!(5.5)));
    }
}
