//! store.rs - Per-user watch state: active source, favorites, last seen prices
//!
//! [`WatchStore`] is the contract the engine relies on. [`JsonWatchStore`]
//! keeps everything in memory and optionally mirrors it to a JSON file.

use async_trait::async_trait;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{Exchange, Symbol, UserId};

/// Persistence contract. Writes are idempotent: adding twice is a no-op,
/// updates overwrite.
#[async_trait]
pub trait WatchStore: Send + Sync {
    /// Users with at least one favorite
    async fn all_users(&self) -> Result<Vec<UserId>, StoreError>;

    /// Active exchange, [`Exchange::default`] if never set
    async fn active_source(&self, user: UserId) -> Result<Exchange, StoreError>;

    async fn update_active_source(&self, user: UserId, exchange: Exchange) -> Result<(), StoreError>;

    /// Favorites on `exchange`, in insertion order
    async fn favorites(&self, user: UserId, exchange: Exchange) -> Result<Vec<Symbol>, StoreError>;

    async fn add_favorite(&self, user: UserId, symbol: &Symbol, exchange: Exchange) -> Result<(), StoreError>;

    async fn remove_favorite(&self, user: UserId, symbol: &Symbol, exchange: Exchange) -> Result<(), StoreError>;

    async fn last_price(
        &self,
        user: UserId,
        symbol: &Symbol,
        exchange: Exchange,
    ) -> Result<Option<Decimal>, StoreError>;

    async fn update_last_price(
        &self,
        user: UserId,
        symbol: &Symbol,
        price: Decimal,
        exchange: Exchange,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct WatchState {
    #[serde(default)]
    active_sources: BTreeMap<UserId, Exchange>,
    #[serde(default)]
    favorites: BTreeMap<UserId, BTreeMap<Exchange, Vec<Symbol>>>,
    /// Last observed prices; kept independently of favorites
    #[serde(default)]
    prices: BTreeMap<UserId, BTreeMap<Exchange, BTreeMap<Symbol, Decimal>>>,
}

#[derive(Debug, Default)]
pub struct JsonWatchStore {
    state: RwLock<WatchState>,
    path: Option<PathBuf>,
}

impl JsonWatchStore {
    /// Memory-only store
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path` if it exists; every write is saved back to it
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let state = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No watch store at {}, starting empty", path.display());
                WatchState::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(JsonWatchStore {
            state: RwLock::new(state),
            path: Some(path),
        })
    }

    async fn persist(&self, state: &WatchState) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string_pretty(state)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!("Watch store saved to {}", path.display());
        Ok(())
    }

    /// Apply `change` to a copy of the state and commit it only once saved.
    /// `change` returns `false` when there was nothing to do.
    async fn commit<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut WatchState) -> bool + Send,
    {
        let mut guard = self.state.write().await;
        let mut next = (*guard).clone();
        if !change(&mut next) {
            return Ok(());
        }
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }
}

#[async_trait]
impl WatchStore for JsonWatchStore {
    async fn all_users(&self) -> Result<Vec<UserId>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .favorites
            .iter()
            .filter(|(_, by_exchange)| by_exchange.values().any(|f| !f.is_empty()))
            .map(|(user, _)| *user)
            .collect())
    }

    async fn active_source(&self, user: UserId) -> Result<Exchange, StoreError> {
        let state = self.state.read().await;
        Ok(state.active_sources.get(&user).copied().unwrap_or_default())
    }

    async fn update_active_source(&self, user: UserId, exchange: Exchange) -> Result<(), StoreError> {
        self.commit(|state| {
            state.active_sources.insert(user, exchange);
            true
        })
        .await
    }

    async fn favorites(&self, user: UserId, exchange: Exchange) -> Result<Vec<Symbol>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .favorites
            .get(&user)
            .and_then(|by_exchange| by_exchange.get(&exchange))
            .cloned()
            .unwrap_or_default())
    }

    async fn add_favorite(&self, user: UserId, symbol: &Symbol, exchange: Exchange) -> Result<(), StoreError> {
        self.commit(|state| {
            let list = state
                .favorites
                .entry(user)
                .or_default()
                .entry(exchange)
                .or_default();
            if list.contains(symbol) {
                return false;
            }
            list.push(symbol.clone());
            true
        })
        .await
    }

    async fn remove_favorite(&self, user: UserId, symbol: &Symbol, exchange: Exchange) -> Result<(), StoreError> {
        self.commit(|state| {
            let Some(by_exchange) = state.favorites.get_mut(&user) else {
                return false;
            };
            if let Some(list) = by_exchange.get_mut(&exchange) {
                list.retain(|s| s != symbol);
                if list.is_empty() {
                    by_exchange.remove(&exchange);
                }
            }
            if by_exchange.is_empty() {
                state.favorites.remove(&user);
            }
            true
        })
        .await
    }

    async fn last_price(
        &self,
        user: UserId,
        symbol: &Symbol,
        exchange: Exchange,
    ) -> Result<Option<Decimal>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .prices
            .get(&user)
            .and_then(|by_exchange| by_exchange.get(&exchange))
            .and_then(|by_symbol| by_symbol.get(symbol))
            .copied())
    }

    async fn update_last_price(
        &self,
        user: UserId,
        symbol: &Symbol,
        price: Decimal,
        exchange: Exchange,
    ) -> Result<(), StoreError> {
        self.commit(|state| {
            state
                .prices
                .entry(user)
                .or_default()
                .entry(exchange)
                .or_default()
                .insert(symbol.clone(), price);
            true
        })
        .await
    }
}
