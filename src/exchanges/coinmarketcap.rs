//! CoinMarketCap pro API, quoted in USD; needs an API key header

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::error::SourceError;
use crate::models::{Exchange, LookupResult, Symbol};
use crate::price_feed::{classify, HttpFetcher, PriceFeed};

const QUOTES_URL: &str = "https://pro-api.coinmarketcap.com/v1/cryptocurrency/quotes/latest";
const MAP_URL: &str = "https://pro-api.coinmarketcap.com/v1/cryptocurrency/map";
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    status: Option<Status>,
    #[serde(default)]
    data: HashMap<String, Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    quote: HashMap<String, FiatQuote>,
}

#[derive(Debug, Deserialize)]
struct FiatQuote {
    price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct MapResponse {
    status: Option<Status>,
    #[serde(default)]
    data: Vec<MapEntry>,
}

#[derive(Debug, Deserialize)]
struct MapEntry {
    symbol: String,
}

fn check_status(status: Option<Status>) -> Result<(), SourceError> {
    match status {
        Some(s) if s.error_code != 0 => Err(SourceError::Api {
            code: s.error_code.to_string(),
            message: s.error_message.unwrap_or_default(),
        }),
        _ => Ok(()),
    }
}

fn parse_price(body: &str, symbol: &Symbol) -> Result<LookupResult, SourceError> {
    let response: QuotesResponse = serde_json::from_str(body)?;
    check_status(response.status)?;

    let Some(asset) = response.data.get(symbol.as_str()) else {
        return Ok(LookupResult::PairNotFound);
    };

    // Asset known but quote incomplete: treat as a bad response, not a missing pair
    asset
        .quote
        .get("USD")
        .and_then(|q| q.price)
        .map(LookupResult::Price)
        .ok_or_else(|| SourceError::Api {
            code: "missing_usd_quote".to_string(),
            message: format!("no USD price for {}", symbol),
        })
}

fn parse_pairs(body: &str) -> Result<HashSet<Symbol>, SourceError> {
    let response: MapResponse = serde_json::from_str(body)?;
    check_status(response.status)?;
    Ok(response.data.iter().map(|e| Symbol::new(&e.symbol)).collect())
}

#[derive(Debug, Clone)]
pub struct CoinMarketCapFeed {
    prices: HttpFetcher,
    listings: HttpFetcher,
    api_key: String,
}

impl CoinMarketCapFeed {
    pub fn new(prices: HttpFetcher, listings: HttpFetcher, api_key: String) -> Self {
        CoinMarketCapFeed { prices, listings, api_key }
    }

    fn auth(&self) -> [(&'static str, String); 1] {
        [(API_KEY_HEADER, self.api_key.clone())]
    }

    async fn request_price(&self, symbol: &Symbol) -> Result<LookupResult, SourceError> {
        let query = [("symbol", symbol.to_string()), ("convert", "USD".to_string())];
        let body = self.prices.get_text(QUOTES_URL, &query, &self.auth()).await?;
        parse_price(&body, symbol)
    }
}

#[async_trait]
impl PriceFeed for CoinMarketCapFeed {
    fn exchange(&self) -> Exchange {
        Exchange::CoinMarketCap
    }

    async fn fetch_price(&self, symbol: &Symbol) -> LookupResult {
        classify(self.exchange(), symbol, self.request_price(symbol).await)
    }

    async fn fetch_pairs(&self) -> Result<HashSet<Symbol>, SourceError> {
        let body = self.listings.get_text(MAP_URL, &[], &self.auth()).await?;
        parse_pairs(&body)
    }
}
