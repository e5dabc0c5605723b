//! Price Sentinel
//!
//! Watches cryptocurrency prices for chat users and alerts them when a
//! favorite token moves by more than a threshold on their chosen exchange.
//!
//! # Architecture
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │   CatalogRefresher   │      │    ChangeDetector    │
//! │   (every 10 min)     │      │    (every 5 min)     │
//! └──────────┬───────────┘      └──────────┬───────────┘
//!            │                             │ WatchStore / Notifier
//!            ▼                             ▼
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │     PairCatalog      │◄─────│     PriceLookup      │◄── WatchlistService
//! │ Exchange -> symbols  │      │ catalog guard + route│
//! └──────────┬───────────┘      └──────────┬───────────┘
//!            │ fetch_pairs()               │ fetch_price()
//!            ▼                             ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                  PriceFeed Trait                    │
//! │  Binance │ CoinGecko │ CoinMarketCap │ ByBit │ OKX  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod config;
pub mod detector;
pub mod error;
pub mod exchanges;
pub mod lookup;
pub mod models;
pub mod notifier;
pub mod price_feed;
pub mod refresher;
pub mod store;
pub mod watchlist;

// Re-export commonly used types
pub use catalog::{CatalogSnapshot, PairCatalog, RefreshReport};
pub use config::Config;
pub use detector::{relative_change_pct, ChangeDetector, CycleReport};
pub use error::{
    CatalogError,
    ConfigError,
    DeliveryError,
    SourceError,
    StoreError,
    ValidationError,
    WatchError,
};
pub use lookup::PriceLookup;
pub use models::{Exchange, LookupResult, PriceAlert, Symbol, UserId};
pub use notifier::{LogNotifier, Notifier, TelegramNotifier};
pub use price_feed::{HttpFetcher, MockPriceFeed, PriceFeed};
pub use refresher::CatalogRefresher;
pub use store::{JsonWatchStore, WatchStore};
pub use watchlist::{AddOutcome, FavoritesView, WatchlistService};

/// Version of the price watcher
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the package
pub const NAME: &str = env!("CARGO_PKG_NAME");
