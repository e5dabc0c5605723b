//! OKX v5 spot market, quoted in USDT (`<SYMBOL>-USDT` instruments)

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;

use crate::error::SourceError;
use crate::models::{Exchange, LookupResult, Symbol};
use crate::price_feed::{classify, parse_decimal, strip_quote_suffix, HttpFetcher, PriceFeed};

const TICKER_URL: &str = "https://www.okx.com/api/v5/market/ticker";
const TICKERS_URL: &str = "https://www.okx.com/api/v5/market/tickers";
const QUOTE_SUFFIX: &str = "-USDT";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Vec<Ticker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    inst_id: String,
    #[serde(default)]
    last: String,
}

fn parse_price(body: &str) -> Result<LookupResult, SourceError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    match envelope.data.first() {
        Some(ticker) => Ok(LookupResult::Price(parse_decimal("last", &ticker.last)?)),
        None => Ok(LookupResult::PairNotFound),
    }
}

fn parse_pairs(body: &str) -> Result<HashSet<Symbol>, SourceError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    Ok(strip_quote_suffix(envelope.data.iter().map(|t| t.inst_id.as_str()), QUOTE_SUFFIX))
}

#[derive(Debug, Clone)]
pub struct OkxFeed {
    prices: HttpFetcher,
    listings: HttpFetcher,
}

impl OkxFeed {
    pub fn new(prices: HttpFetcher, listings: HttpFetcher) -> Self {
        OkxFeed { prices, listings }
    }

    async fn request_price(&self, symbol: &Symbol) -> Result<LookupResult, SourceError> {
        let query = [("instId", format!("{}{}", symbol, QUOTE_SUFFIX))];
        let body = self.prices.get_text(TICKER_URL, &query, &[]).await?;
        parse_price(&body)
    }
}

#[async_trait]
impl PriceFeed for OkxFeed {
    fn exchange(&self) -> Exchange {
        Exchange::Okx
    }

    async fn fetch_price(&self, symbol: &Symbol) -> LookupResult {
        classify(self.exchange(), symbol, self.request_price(symbol).await)
    }

    async fn fetch_pairs(&self) -> Result<HashSet<Symbol>, SourceError> {
        let query = [("instType", "SPOT".to_string())];
        let body = self.listings.get_text(TICKERS_URL, &query, &[]).await?;
        parse_pairs(&body)
    }
}
