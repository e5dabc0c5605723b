//! detector.rs - Periodic comparison of favorites against their last seen price
//!
//! Each cycle walks every user's favorites on their active exchange, fetches
//! the current price and alerts when the move exceeds the threshold. The
//! stored price only advances when an alert is delivered.

use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::error::{DeliveryError, StoreError};
use crate::lookup::PriceLookup;
use crate::models::{Exchange, LookupResult, PriceAlert, Symbol, UserId};
use crate::notifier::Notifier;
use crate::store::WatchStore;

/// Absolute relative move in percent; `None` unless `old` is positive and
/// the result fits in a `Decimal`
pub fn relative_change_pct(old: Decimal, new: Decimal) -> Option<Decimal> {
    if old <= Decimal::ZERO {
        return None;
    }
    new.checked_sub(old)?
        .abs()
        .checked_div(old)?
        .checked_mul(Decimal::from(100))
}

/// Counters for one detection cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub users: usize,
    pub checked: usize,
    pub alerts: usize,
    /// Lookups that gave no price, or no usable baseline
    pub skipped: usize,
    pub delivery_failures: usize,
    pub store_errors: usize,
}

pub struct ChangeDetector {
    store: Arc<dyn WatchStore>,
    lookup: Arc<PriceLookup>,
    notifier: Arc<dyn Notifier>,
    threshold_pct: Decimal,
}

impl ChangeDetector {
    pub fn new(
        store: Arc<dyn WatchStore>,
        lookup: Arc<PriceLookup>,
        notifier: Arc<dyn Notifier>,
        threshold_pct: Decimal,
    ) -> Self {
        ChangeDetector {
            store,
            lookup,
            notifier,
            threshold_pct,
        }
    }

    /// Run cycles forever, `period` apart
    ///
    /// A slow cycle pushes the next one back instead of overlapping it.
    pub async fn run(self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycle: u64 = 0;

        loop {
            interval.tick().await;
            cycle += 1;

            let report = self.run_cycle().await;
            info!(
                "🔎 Price check #{}: {} users, {} checked, {} alerts, {} skipped, {} undelivered",
                cycle, report.users, report.checked, report.alerts, report.skipped, report.delivery_failures
            );
        }
    }

    /// One pass over every user; never fails, problems are counted and logged
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let users = match self.store.all_users().await {
            Ok(users) => users,
            Err(e) => {
                error!("✗ Could not list users: {}", e);
                report.store_errors += 1;
                return report;
            }
        };
        report.users = users.len();

        for user in users {
            if let Err(e) = self.check_user(user, &mut report).await {
                error!("✗ Price check for user {} aborted: {}", user, e);
                report.store_errors += 1;
            }
        }

        report
    }

    async fn check_user(&self, user: UserId, report: &mut CycleReport) -> Result<(), StoreError> {
        let exchange = self.store.active_source(user).await?;
        let favorites = self.store.favorites(user, exchange).await?;

        for symbol in &favorites {
            if let Err(e) = self.check_symbol(user, symbol, exchange, report).await {
                warn!("⚠ Skipping {} for user {}: {}", symbol, user, e);
                report.store_errors += 1;
            }
        }
        Ok(())
    }

    async fn check_symbol(
        &self,
        user: UserId,
        symbol: &Symbol,
        exchange: Exchange,
        report: &mut CycleReport,
    ) -> Result<(), StoreError> {
        report.checked += 1;
        let old_price = self.store.last_price(user, symbol, exchange).await?;

        let new_price = match self.lookup.get_price(symbol, exchange).await {
            LookupResult::Price(price) => price,
            other => {
                debug!("{} on {}: {}, skipped this cycle", symbol, exchange, other);
                report.skipped += 1;
                return Ok(());
            }
        };

        let Some(old_price) = old_price else {
            debug!("{} on {}: no baseline for user {}", symbol, exchange, user);
            report.skipped += 1;
            return Ok(());
        };

        let Some(change) = relative_change_pct(old_price, new_price) else {
            if old_price > Decimal::ZERO {
                warn!(
                    "⚠ {} on {}: move {} -> {} is out of range, skipped",
                    symbol, exchange, old_price, new_price
                );
            }
            report.skipped += 1;
            return Ok(());
        };

        if change <= self.threshold_pct {
            return Ok(());
        }

        let alert = PriceAlert::new(user, symbol.clone(), exchange, old_price, new_price);
        info!("🚨 {}", alert);

        match self.notifier.send_message(user, &alert.message()).await {
            Ok(()) => {
                self.store.update_last_price(user, symbol, new_price, exchange).await?;
                report.alerts += 1;
            }
            Err(DeliveryError::RecipientUnreachable) => {
                warn!("❌ Could not send a message to user {}, possibly blocked the bot", user);
                report.delivery_failures += 1;
            }
            Err(e) => {
                warn!("❌ Delivery to user {} failed: {}", user, e);
                report.delivery_failures += 1;
            }
        }
        Ok(())
    }
}
