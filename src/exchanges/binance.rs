//! Binance spot tickers, quoted in USDT

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::collections::HashSet;

use crate::error::SourceError;
use crate::models::{Exchange, LookupResult, Symbol};
use crate::price_feed::{classify, parse_decimal, strip_quote_suffix, HttpFetcher, PriceFeed};

const TICKER_URL: &str = "https://api.binance.com/api/v3/ticker/price";
const QUOTE: &str = "USDT";

#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    price: String,
}

#[derive(Debug, Deserialize)]
struct TickerSymbol {
    symbol: String,
}

fn parse_price(body: &str) -> Result<LookupResult, SourceError> {
    let ticker: TickerPrice = serde_json::from_str(body)?;
    debug!("Binance ticker {} = {}", ticker.symbol, ticker.price);
    Ok(LookupResult::Price(parse_decimal("price", &ticker.price)?))
}

fn parse_pairs(body: &str) -> Result<HashSet<Symbol>, SourceError> {
    let tickers: Vec<TickerSymbol> = serde_json::from_str(body)?;
    Ok(strip_quote_suffix(tickers.iter().map(|t| t.symbol.as_str()), QUOTE))
}

/// Direct ticker query: `<SYMBOL>USDT`
#[derive(Debug, Clone)]
pub struct BinanceFeed {
    prices: HttpFetcher,
    listings: HttpFetcher,
    ticker_url: String,
}

impl BinanceFeed {
    pub fn new(prices: HttpFetcher, listings: HttpFetcher) -> Self {
        BinanceFeed {
            prices,
            listings,
            ticker_url: TICKER_URL.to_string(),
        }
    }

    /// Point the feed at another ticker endpoint (mirror or local server)
    pub fn with_ticker_url(mut self, url: impl Into<String>) -> Self {
        self.ticker_url = url.into();
        self
    }

    async fn request_price(&self, symbol: &Symbol) -> Result<LookupResult, SourceError> {
        let query = [("symbol", format!("{}{}", symbol, QUOTE))];
        let body = self.prices.get_text(&self.ticker_url, &query, &[]).await?;
        parse_price(&body)
    }
}

#[async_trait]
impl PriceFeed for BinanceFeed {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    async fn fetch_price(&self, symbol: &Symbol) -> LookupResult {
        classify(self.exchange(), symbol, self.request_price(symbol).await)
    }

    async fn fetch_pairs(&self) -> Result<HashSet<Symbol>, SourceError> {
        let body = self.listings.get_text(&self.ticker_url, &[], &[]).await?;
        parse_pairs(&body)
    }
}
