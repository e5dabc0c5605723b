//! One [`PriceFeed`](crate::PriceFeed) adapter per supported exchange
//!
//! | Exchange      | Price request                       | Pair listing                    |
//! |---------------|-------------------------------------|---------------------------------|
//! | Binance       | `ticker/price?symbol=<SYM>USDT`     | all tickers ending in `USDT`    |
//! | CoinGecko     | `simple/price?ids=<sym>`            | `coins/list` symbols            |
//! | CoinMarketCap | `quotes/latest?symbol=<SYM>` + key  | `cryptocurrency/map` symbols    |
//! | ByBit         | full spot ticker scan               | spot tickers ending in `USDT`   |
//! | OKX           | `market/ticker?instId=<SYM>-USDT`   | spot instIds ending in `-USDT`  |

pub mod binance;
pub mod bybit;
pub mod coingecko;
pub mod coinmarketcap;
pub mod okx;

use log::warn;
use std::sync::Arc;

use crate::config::Config;
use crate::error::SourceError;
use crate::price_feed::{HttpFetcher, PriceFeed};

pub use binance::BinanceFeed;
pub use bybit::ByBitFeed;
pub use coingecko::CoinGeckoFeed;
pub use coinmarketcap::CoinMarketCapFeed;
pub use okx::OkxFeed;

/// Build the adapters enabled by `config`
///
/// CoinMarketCap is skipped when no API key is configured.
pub fn build_feeds(config: &Config) -> Result<Vec<Arc<dyn PriceFeed>>, SourceError> {
    let prices = HttpFetcher::new(config.price_timeout)?;
    let listings = HttpFetcher::new(config.listing_timeout)?;

    let mut feeds: Vec<Arc<dyn PriceFeed>> = vec![
        Arc::new(BinanceFeed::new(prices.clone(), listings.clone())),
        Arc::new(CoinGeckoFeed::new(prices.clone(), listings.clone())),
    ];

    match &config.cmc_api_key {
        Some(key) => feeds.push(Arc::new(CoinMarketCapFeed::new(
            prices.clone(),
            listings.clone(),
            key.clone(),
        ))),
        None => warn!("CMC_API_KEY not set, CoinMarketCap disabled"),
    }

    feeds.push(Arc::new(ByBitFeed::new(prices.clone(), listings.clone())));
    feeds.push(Arc::new(OkxFeed::new(prices, listings)));

    Ok(feeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Exchange;

    #[test]
    fn test_build_feeds_without_cmc_key() {
        let config = Config::default();
        let feeds = build_feeds(&config).unwrap();
        let exchanges: Vec<Exchange> = feeds.iter().map(|f| f.exchange()).collect();

        assert_eq!(
            exchanges,
            vec![Exchange::Binance, Exchange::CoinGecko, Exchange::ByBit, Exchange::Okx]
        );
    }

    #[test]
    fn test_build_feeds_with_cmc_key() {
        let config = Config {
            cmc_api_key: Some("secret".to_string()),
            ..Config::default()
        };
        let feeds = build_feeds(&config).unwrap();

        assert_eq!(feeds.len(), Exchange::ALL.len());
        assert!(feeds.iter().any(|f| f.exchange() == Exchange::CoinMarketCap));
    }
}
