//! price_feed.rs - Price source abstraction
//!
//! Every exchange adapter implements [`PriceFeed`]; the HTTP plumbing they
//! share lives in [`HttpFetcher`].

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::SourceError;
use crate::models::{Exchange, LookupResult, Symbol};

/// Trait defining the interface for price feeds
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Exchange served by this feed
    fn exchange(&self) -> Exchange;

    /// Current price of `symbol` against the exchange's reference quote currency
    async fn fetch_price(&self, symbol: &Symbol) -> LookupResult;

    /// Base symbols tradable against the reference quote currency
    async fn fetch_pairs(&self) -> Result<HashSet<Symbol>, SourceError>;
}

/// Collapse an adapter's internal result into the lookup taxonomy
pub(crate) fn classify(
    exchange: Exchange,
    symbol: &Symbol,
    result: Result<LookupResult, SourceError>,
) -> LookupResult {
    match result {
        Ok(LookupResult::Price(price)) => {
            info!("✓ {}: {} price = {}", exchange, symbol, price);
            LookupResult::Price(price)
        }
        Ok(other) => {
            debug!("{}: no price for {} ({})", exchange, symbol, other);
            other
        }
        Err(e) => {
            warn!("{}: price request for {} failed: {}", exchange, symbol, e);
            LookupResult::SourceUnavailable
        }
    }
}

/// Parse a numeric field that an API ships as a string
pub(crate) fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal, SourceError> {
    Decimal::from_str(value.trim()).map_err(|_| SourceError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Keep only `<BASE><suffix>` entries and strip the suffix
pub(crate) fn strip_quote_suffix<'a, I>(symbols: I, suffix: &str) -> HashSet<Symbol>
where
    I: IntoIterator<Item = &'a str>,
{
    symbols
        .into_iter()
        .filter_map(|s| s.strip_suffix(suffix))
        .filter(|base| !base.is_empty())
        .map(Symbol::new)
        .collect()
}

/// Shared GET-and-read-body client with a bounded per-request timeout
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpFetcher { client })
    }

    /// GET `url` and return the body of a 2xx response
    pub async fn get_text(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&'static str, String)],
    ) -> Result<String, SourceError> {
        debug!("📡 GET {} {:?}", url, query);

        let mut request = self.client.get(url).query(query);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

// ============================================================================
// MockPriceFeed - For testing purposes
// ============================================================================

/// In-memory feed with call counting and switchable failures
#[derive(Debug)]
pub struct MockPriceFeed {
    exchange: Exchange,
    prices: RwLock<HashMap<Symbol, Decimal>>,
    listing_fails: AtomicBool,
    prices_fail: AtomicBool,
    price_calls: AtomicUsize,
}

impl MockPriceFeed {
    pub fn new(exchange: Exchange) -> Self {
        MockPriceFeed {
            exchange,
            prices: RwLock::new(HashMap::new()),
            listing_fails: AtomicBool::new(false),
            prices_fail: AtomicBool::new(false),
            price_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.get_mut().insert(Symbol::new(symbol), price);
        self
    }

    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.write().await.insert(Symbol::new(symbol), price);
    }

    pub async fn delist(&self, symbol: &str) {
        self.prices.write().await.remove(&Symbol::new(symbol));
    }

    pub fn set_listing_fails(&self, fails: bool) {
        self.listing_fails.store(fails, Ordering::SeqCst);
    }

    pub fn set_prices_fail(&self, fails: bool) {
        self.prices_fail.store(fails, Ordering::SeqCst);
    }

    /// Number of `fetch_price` calls so far
    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceFeed for MockPriceFeed {
    fn exchange(&self) -> Exchange {
        self.exchange
    }

    async fn fetch_price(&self, symbol: &Symbol) -> LookupResult {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        if self.prices_fail.load(Ordering::SeqCst) {
            return LookupResult::SourceUnavailable;
        }
        match self.prices.read().await.get(symbol) {
            Some(price) => LookupResult::Price(*price),
            None => LookupResult::PairNotFound,
        }
    }

    async fn fetch_pairs(&self) -> Result<HashSet<Symbol>, SourceError> {
        if self.listing_fails.load(Ordering::SeqCst) {
            return Err(SourceError::Status(503));
        }
        let pairs: HashSet<Symbol> = self.prices.read().await.keys().cloned().collect();
        if pairs.is_empty() {
            return Err(SourceError::EmptyListing);
        }
        Ok(pairs)
    }
}
