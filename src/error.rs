//! Error types for the price watcher

use thiserror::Error;

use crate::models::Exchange;

/// User-input validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol may only contain letters and digits, found '{ch}'")]
    InvalidSymbolChar { ch: char },
    #[error("unknown price source '{0}'")]
    UnknownExchange(String),
}

/// Failures talking to an exchange REST API
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("unexpected response shape: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("field '{field}' is not a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("pair listing was empty")]
    EmptyListing,
}

/// Pair catalog refresh errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no price sources configured")]
    NoFeeds,

    #[error("every exchange failed to refresh: {failed:?}")]
    TotalFailure { failed: Vec<Exchange> },
}

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The user blocked the bot or otherwise revoked access
    #[error("recipient unreachable")]
    RecipientUnreachable,

    #[error("delivery rejected with HTTP status {status}")]
    Rejected { status: u16 },

    #[error("delivery transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Watch store backend errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidDuration { key: &'static str, value: String },

    #[error("{key} must be a positive decimal, got '{value}'")]
    InvalidThreshold { key: &'static str, value: String },
}

/// Errors from foreground watchlist operations
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{symbol} is not traded on {exchange}")]
    PairNotFound { symbol: String, exchange: Exchange },

    #[error("{exchange} is unavailable right now, try again later")]
    SourceUnavailable { exchange: Exchange },

    #[error(transparent)]
    Store(#[from] StoreError),
}
