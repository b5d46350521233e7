//! Stock views and the in-memory result memo
//!
//! Syncing is cheap but not free, and chat users mash the refresh button.
//! Row sets are memoized per account with a short TTL; a forced refresh
//! bypasses the TTL but is throttled to one upstream hit per window. The
//! cache is an owned object with an injected clock, so expiry and throttling
//! are testable without sleeping.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;

use shared::models::StockRecord;

use crate::config::CacheConfig;
use crate::error::AppResult;
use crate::services::sync::SyncService;

/// Time source for cache expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock implementation used in production.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Keyed TTL memo cache.
pub struct TtlCache<V> {
    ttl: Duration,
    refresh_window: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, refresh_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            refresh_window,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value or run `refresh` to produce a new one.
    ///
    /// `force_refresh` ignores the TTL but still respects the refresh
    /// window: a forced refresh inside the window returns the cached value
    /// rather than hitting upstream again.
    pub async fn get_or_refresh<F, Fut>(
        &self,
        key: &str,
        force_refresh: bool,
        refresh: F,
    ) -> AppResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<V>>,
    {
        let now = self.clock.now();
        {
            let entries = self.entries.lock().await;
            if let Some(entry) = entries.get(key) {
                if !force_refresh && entry.expires_at > now {
                    tracing::debug!(key, "stock memo hit");
                    return Ok(entry.value.clone());
                }
                if force_refresh && now.duration_since(entry.fetched_at) < self.refresh_window {
                    tracing::warn!(key, "forced refresh throttled");
                    return Ok(entry.value.clone());
                }
            }
        }

        let value = refresh().await?;
        let now = self.clock.now();
        self.entries.lock().await.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                fetched_at: now,
                expires_at: now + self.ttl,
            },
        );
        tracing::info!(key, "stock memo refreshed");
        Ok(value)
    }
}

/// Totals for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationSummary {
    pub name: String,
    pub total_quantity: i64,
    pub product_count: usize,
}

/// Stock row retrieval with memoization, plus grouped summaries.
#[derive(Clone)]
pub struct StocksService {
    sync: SyncService,
    memo: Arc<TtlCache<Vec<StockRecord>>>,
}

impl StocksService {
    pub fn new(sync: SyncService, cache: &CacheConfig) -> Self {
        Self::with_clock(sync, cache, Arc::new(SystemClock))
    }

    pub fn with_clock(sync: SyncService, cache: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            sync,
            memo: Arc::new(TtlCache::new(
                Duration::from_secs(cache.ttl_seconds),
                Duration::from_secs(cache.refresh_window_seconds),
                clock,
            )),
        }
    }

    /// Current full row set for an account, synced through the incremental
    /// cache and memoized for the TTL.
    pub async fn current_rows(
        &self,
        account: &str,
        token: &str,
        force_refresh: bool,
    ) -> AppResult<Vec<StockRecord>> {
        let sync = self.sync.clone();
        let account_owned = account.to_string();
        let token_owned = token.to_string();
        self.memo
            .get_or_refresh(account, force_refresh, move || async move {
                Ok(sync.sync_account(&account_owned, &token_owned).await?.rows)
            })
            .await
    }
}

/// Group rows by location: total quantity and distinct product count,
/// zero/negative totals dropped, sorted by total descending.
pub fn summarize_by_location(rows: &[StockRecord]) -> Vec<LocationSummary> {
    let mut totals: HashMap<String, (i64, HashSet<i64>)> = HashMap::new();
    for row in rows {
        let Some(name) = row.location_name.as_deref().map(str::trim) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let entry = totals.entry(name.to_string()).or_default();
        entry.0 += row.quantity;
        if let Some(product_id) = row.product_id {
            entry.1.insert(product_id);
        }
    }

    let mut summaries: Vec<LocationSummary> = totals
        .into_iter()
        .filter(|(_, (total, _))| *total > 0)
        .map(|(name, (total, products))| LocationSummary {
            name,
            total_quantity: total,
            product_count: products.len(),
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_quantity
            .cmp(&a.total_quantity)
            .then_with(|| a.name.cmp(&b.name))
    });
    summaries
}
