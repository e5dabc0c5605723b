//! models.rs - Core data structures for the price watcher
//!
//! Defines Exchange, Symbol, LookupResult and PriceAlert

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Chat user identifier (Telegram chat ids are signed 64-bit)
pub type UserId = i64;

/// Supported price sources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Exchange {
    #[default]
    Binance,
    CoinGecko,
    CoinMarketCap,
    ByBit,
    #[serde(rename = "OKX")]
    Okx,
}

impl Exchange {
    /// Every supported exchange, in display order
    pub const ALL: [Exchange; 5] = [
        Exchange::Binance,
        Exchange::CoinGecko,
        Exchange::CoinMarketCap,
        Exchange::ByBit,
        Exchange::Okx,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Exchange::Binance => "Binance",
            Exchange::CoinGecko => "CoinGecko",
            Exchange::CoinMarketCap => "CoinMarketCap",
            Exchange::ByBit => "ByBit",
            Exchange::Okx => "OKX",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Exchange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Exchange::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownExchange(wanted.to_string()))
    }
}

/// Base-asset ticker, always stored uppercase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Normalize a raw ticker (trim + uppercase)
    pub fn new(raw: &str) -> Self {
        Symbol(raw.trim().to_ascii_uppercase())
    }

    /// Normalize and reject anything that is not a plain alphanumeric ticker
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let symbol = Symbol::new(raw);
        if symbol.0.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if let Some(ch) = symbol.0.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidSymbolChar { ch });
        }
        Ok(symbol)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form, for adapters whose request wants it
    pub fn to_lowercase(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl From<String> for Symbol {
    fn from(raw: String) -> Self {
        Symbol::new(&raw)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a price lookup; every consumer branches on this, never on raw errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    Price(Decimal),
    /// The exchange does not trade this symbol
    PairNotFound,
    /// Transient failure: network, timeout, bad status or unreadable body
    SourceUnavailable,
}

impl LookupResult {
    pub fn price(&self) -> Option<Decimal> {
        match self {
            LookupResult::Price(p) => Some(*p),
            _ => None,
        }
    }
}

impl fmt::Display for LookupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupResult::Price(p) => write!(f, "${}", p),
            LookupResult::PairNotFound => f.write_str("pair does not exist"),
            LookupResult::SourceUnavailable => f.write_str("price source unavailable"),
        }
    }
}

/// A detected price move that crossed the alert threshold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceAlert {
    pub user: UserId,
    pub symbol: Symbol,
    pub exchange: Exchange,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub change_pct: Decimal,
    pub detected_at: chrono::DateTime<chrono::Utc>,
}

impl PriceAlert {
    pub fn new(
        user: UserId,
        symbol: Symbol,
        exchange: Exchange,
        old_price: Decimal,
        new_price: Decimal,
    ) -> Self {
        // Zero when the move cannot be represented
        let change_pct = Some(old_price)
            .filter(|old| *old > Decimal::ZERO)
            .and_then(|old| new_price.checked_sub(old)?.checked_div(old))
            .and_then(|ratio| ratio.checked_mul(Decimal::from(100)))
            .unwrap_or(Decimal::ZERO);

        PriceAlert {
            user,
            symbol,
            exchange,
            old_price,
            new_price,
            change_pct,
            detected_at: chrono::Utc::now(),
        }
    }

    /// Text sent to the user
    pub fn message(&self) -> String {
        let arrow = if self.new_price >= self.old_price { "📈" } else { "📉" };
        format!(
            "🚨 {} has changed price on {}!\nOld price: ${:.2}\nNew price: ${:.2}\n{} Change: {:+.2}%",
            self.symbol, self.exchange, self.old_price, self.new_price, arrow, self.change_pct
        )
    }
}

impl fmt::Display for PriceAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {}: {} -> {} ({:+.2}%)",
            self.symbol, self.exchange, self.old_price, self.new_price, self.change_pct
        )
    }
}
