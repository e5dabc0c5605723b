//! ByBit v5 spot tickers, quoted in USDT
//!
//! There is no per-symbol endpoint here: a price lookup downloads the whole
//! spot ticker list and scans it.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;

use crate::error::SourceError;
use crate::models::{Exchange, LookupResult, Symbol};
use crate::price_feed::{classify, parse_decimal, strip_quote_suffix, HttpFetcher, PriceFeed};

const TICKERS_URL: &str = "https://api.bybit.com/v5/market/tickers";
const QUOTE: &str = "USDT";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    #[serde(default)]
    result: Option<TickerList>,
}

#[derive(Debug, Deserialize)]
struct TickerList {
    #[serde(default)]
    list: Vec<Ticker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    symbol: String,
    #[serde(default)]
    last_price: String,
}

/// Decode the envelope, rejecting non-zero `retCode`
fn parse_tickers(body: &str) -> Result<Vec<Ticker>, SourceError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if envelope.ret_code != 0 {
        return Err(SourceError::Api {
            code: envelope.ret_code.to_string(),
            message: envelope.ret_msg,
        });
    }
    Ok(envelope.result.map(|r| r.list).unwrap_or_default())
}

fn parse_price(body: &str, symbol: &Symbol) -> Result<LookupResult, SourceError> {
    let wanted = format!("{}{}", symbol, QUOTE);
    match parse_tickers(body)?.into_iter().find(|t| t.symbol == wanted) {
        Some(ticker) => Ok(LookupResult::Price(parse_decimal("lastPrice", &ticker.last_price)?)),
        None => Ok(LookupResult::PairNotFound),
    }
}

fn parse_pairs(body: &str) -> Result<HashSet<Symbol>, SourceError> {
    let tickers = parse_tickers(body)?;
    Ok(strip_quote_suffix(tickers.iter().map(|t| t.symbol.as_str()), QUOTE))
}

#[derive(Debug, Clone)]
pub struct ByBitFeed {
    prices: HttpFetcher,
    listings: HttpFetcher,
}

impl ByBitFeed {
    pub fn new(prices: HttpFetcher, listings: HttpFetcher) -> Self {
        ByBitFeed { prices, listings }
    }

    fn spot() -> [(&'static str, String); 1] {
        [("category", "spot".to_string())]
    }

    async fn request_price(&self, symbol: &Symbol) -> Result<LookupResult, SourceError> {
        let body = self.prices.get_text(TICKERS_URL, &Self::spot(), &[]).await?;
        parse_price(&body, symbol)
    }
}

#[async_trait]
impl PriceFeed for ByBitFeed {
    fn exchange(&self) -> Exchange {
        Exchange::ByBit
    }

    async fn fetch_price(&self, symbol: &Symbol) -> LookupResult {
        classify(self.exchange(), symbol, self.request_price(symbol).await)
    }

    async fn fetch_pairs(&self) -> Result<HashSet<Symbol>, SourceError> {
        let body = self.listings.get_text(TICKERS_URL, &Self::spot(), &[]).await?;
        parse_pairs(&body)
    }
}
