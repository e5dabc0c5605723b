//! config.rs - Runtime configuration from the environment

use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Seconds between change-detection cycles
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;

/// Seconds between pair catalog refreshes
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 600;

/// Relative move (in percent) that triggers an alert
pub const DEFAULT_ALERT_THRESHOLD_PCT: u64 = 5;

pub const DEFAULT_PRICE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LISTING_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_STORE_PATH: &str = "favorites.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub cmc_api_key: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub check_interval: Duration,
    pub refresh_interval: Duration,
    pub alert_threshold_pct: Decimal,
    pub price_timeout: Duration,
    pub listing_timeout: Duration,
    pub store_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cmc_api_key: None,
            telegram_bot_token: None,
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            alert_threshold_pct: Decimal::from(DEFAULT_ALERT_THRESHOLD_PCT),
            price_timeout: Duration::from_secs(DEFAULT_PRICE_TIMEOUT_SECS),
            listing_timeout: Duration::from_secs(DEFAULT_LISTING_TIMEOUT_SECS),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset or blank keys take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let secs = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match get(key) {
                None => Ok(default),
                Some(value) => match value.parse::<u64>() {
                    Ok(n) if n > 0 => Ok(Duration::from_secs(n)),
                    _ => Err(ConfigError::InvalidDuration { key, value }),
                },
            }
        };

        let alert_threshold_pct = match get("PRICE_ALERT_THRESHOLD_PCT") {
            None => defaults.alert_threshold_pct,
            Some(value) => match Decimal::from_str(&value) {
                Ok(pct) if pct > Decimal::ZERO => pct,
                _ => {
                    return Err(ConfigError::InvalidThreshold {
                        key: "PRICE_ALERT_THRESHOLD_PCT",
                        value,
                    })
                }
            },
        };

        Ok(Config {
            cmc_api_key: get("CMC_API_KEY"),
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            check_interval: secs("PRICE_CHECK_INTERVAL_SECS", defaults.check_interval)?,
            refresh_interval: secs("PAIRS_REFRESH_INTERVAL_SECS", defaults.refresh_interval)?,
            alert_threshold_pct,
            price_timeout: secs("PRICE_REQUEST_TIMEOUT_SECS", defaults.price_timeout)?,
            listing_timeout: secs("PAIRS_REQUEST_TIMEOUT_SECS", defaults.listing_timeout)?,
            store_path: get("WATCH_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
        })
    }
}
