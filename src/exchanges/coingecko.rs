//! CoinGecko simple price API, quoted in USD
//!
//! Lookups use the lowercased symbol as the coin id.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::error::SourceError;
use crate::models::{Exchange, LookupResult, Symbol};
use crate::price_feed::{classify, HttpFetcher, PriceFeed};

const PRICE_URL: &str = "https://api.coingecko.com/api/v3/simple/price";
const COINS_URL: &str = "https://api.coingecko.com/api/v3/coins/list";

#[derive(Debug, Deserialize)]
struct CoinQuote {
    usd: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct CoinEntry {
    symbol: String,
}

fn parse_price(body: &str, id: &str) -> Result<LookupResult, SourceError> {
    let quotes: HashMap<String, CoinQuote> = serde_json::from_str(body)?;
    Ok(match quotes.get(id).and_then(|q| q.usd) {
        Some(price) => LookupResult::Price(price),
        None => LookupResult::PairNotFound,
    })
}

fn parse_pairs(body: &str) -> Result<HashSet<Symbol>, SourceError> {
    let coins: Vec<CoinEntry> = serde_json::from_str(body)?;
    Ok(coins
        .iter()
        .filter(|c| !c.symbol.trim().is_empty())
        .map(|c| Symbol::new(&c.symbol))
        .collect())
}

#[derive(Debug, Clone)]
pub struct CoinGeckoFeed {
    prices: HttpFetcher,
    listings: HttpFetcher,
}

impl CoinGeckoFeed {
    pub fn new(prices: HttpFetcher, listings: HttpFetcher) -> Self {
        CoinGeckoFeed { prices, listings }
    }

    async fn request_price(&self, symbol: &Symbol) -> Result<LookupResult, SourceError> {
        let id = symbol.to_lowercase();
        let query = [("ids", id.clone()), ("vs_currencies", "usd".to_string())];
        let body = self.prices.get_text(PRICE_URL, &query, &[]).await?;
        parse_price(&body, &id)
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    fn exchange(&self) -> Exchange {
        Exchange::CoinGecko
    }

    async fn fetch_price(&self, symbol: &Symbol) -> LookupResult {
        classify(self.exchange(), symbol, self.request_price(symbol).await)
    }

    async fn fetch_pairs(&self) -> Result<HashSet<Symbol>, SourceError> {
        let body = self.listings.get_text(COINS_URL, &[], &[]).await?;
        parse_pairs(&body)
    }
}
