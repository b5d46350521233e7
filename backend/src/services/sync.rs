//! Incremental sync cache
//!
//! The marketplace endpoint only returns records changed since the cursor,
//! so a full picture requires merging each fetch into the previously cached
//! rows. The cache is additive: identities never re-observed in a fetch
//! window survive untouched. Persistence is a whole-file atomic replace, so
//! a failed sync leaves the previous cache intact.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use shared::models::{format_timestamp, parse_timestamp, StockRecord};

use crate::error::{AppError, AppResult};
use crate::external::marketplace::MarketplaceClient;
use crate::storage::AccountStore;

/// Earliest cursor the marketplace accepts: 2019-06-20T00:00:00Z.
pub fn sync_baseline() -> DateTime<Utc> {
    DateTime::from_timestamp(1_560_988_800, 0).unwrap_or_default()
}

/// Cursor for the next fetch: one day before the high-water mark, clamped to
/// the baseline. The overlap re-fetches records whose `lastChangeDate`
/// lagged wall clock at the previous sync; the merge makes re-observation
/// idempotent.
pub fn fetch_cursor(last_sync_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match last_sync_at {
        None => sync_baseline(),
        Some(mark) => (mark - Duration::days(1)).max(sync_baseline()),
    }
}

/// On-disk cache document.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    last_sync_at: Option<String>,
    items: Vec<StockRecord>,
}

/// Per-account persistent stock cache.
#[derive(Debug)]
pub struct StockCache {
    items: BTreeMap<String, StockRecord>,
    pub last_sync_at: Option<DateTime<Utc>>,
    path: PathBuf,
}

impl StockCache {
    /// Load the cache for an account. A missing file yields an empty cache;
    /// so does a corrupt one — sync can always rebuild from the baseline.
    pub fn load(path: PathBuf) -> Self {
        let parsed = AccountStore::read(&path)
            .ok()
            .flatten()
            .and_then(|bytes| match serde_json::from_slice::<CacheFile>(&bytes) {
                Ok(file) => Some(file),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "cache unreadable, starting fresh");
                    None
                }
            });

        match parsed {
            Some(file) => {
                let mut items = BTreeMap::new();
                for record in file.items {
                    items.insert(record.composite_key(), record);
                }
                Self {
                    items,
                    last_sync_at: file.last_sync_at.as_deref().and_then(parse_timestamp),
                    path,
                }
            }
            None => Self {
                items: BTreeMap::new(),
                last_sync_at: None,
                path,
            },
        }
    }

    /// Upsert fetched records by composite identity; returns how many were
    /// new identities. Existing entries are overwritten, never removed.
    pub fn merge(&mut self, records: &[StockRecord]) -> usize {
        let mut inserted = 0;
        for record in records {
            if self
                .items
                .insert(record.composite_key(), record.clone())
                .is_none()
            {
                inserted += 1;
            }
        }
        inserted
    }

    /// Full row set in composite-identity order.
    pub fn rows(&self) -> Vec<StockRecord> {
        self.items.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn file_exists(&self) -> bool {
        AccountStore::exists(&self.path)
    }

    /// Persist atomically; item order follows the composite key so files
    /// stay diff-friendly.
    pub fn save(&self) -> AppResult<()> {
        let file = CacheFile {
            last_sync_at: self.last_sync_at.map(format_timestamp),
            items: self.items.values().cloned().collect(),
        };
        let mut payload = serde_json::to_vec_pretty(&file)
            .map_err(|err| AppError::StorageError(err.to_string()))?;
        payload.push(b'\n');
        AccountStore::write_atomic(&self.path, &payload)
    }
}

/// Result of one sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    #[serde(skip)]
    pub rows: Vec<StockRecord>,
    pub fetched: usize,
    pub inserted: usize,
    pub total: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Sync orchestration over the marketplace client and the per-account cache.
///
/// Concurrent syncs for the same account are not safe against each other;
/// callers serialize per account.
#[derive(Clone)]
pub struct SyncService {
    store: AccountStore,
    marketplace: MarketplaceClient,
}

impl SyncService {
    pub fn new(store: AccountStore, marketplace: MarketplaceClient) -> Self {
        Self { store, marketplace }
    }

    /// Fetch the delta since the high-water mark, merge it into the cache,
    /// persist when anything changed (or no cache file existed yet), and
    /// return the full current row set.
    pub async fn sync_account(&self, account: &str, token: &str) -> AppResult<SyncOutcome> {
        let path = self.store.cache_path(account)?;
        let mut cache = StockCache::load(path);
        let cursor = fetch_cursor(cache.last_sync_at);

        let fetched = self.marketplace.fetch_stocks(token, cursor).await?;

        let mut updated = false;
        let mut inserted = 0;
        if !fetched.is_empty() {
            inserted = cache.merge(&fetched);
            updated = true;
            tracing::info!(
                account,
                fetched = fetched.len(),
                inserted,
                total = cache.len(),
                date_from = %format_timestamp(cursor),
                "cache merged"
            );
        }

        let newest = fetched.iter().filter_map(|r| r.last_changed_at).max();
        if let Some(stamp) = newest {
            if cache.last_sync_at.map_or(true, |mark| stamp > mark) {
                cache.last_sync_at = Some(stamp);
                updated = true;
            }
        }

        if updated || !cache.file_exists() {
            cache.save()?;
        }

        Ok(SyncOutcome {
            fetched: fetched.len(),
            inserted,
            total: cache.len(),
            last_sync_at: cache.last_sync_at,
            rows: cache.rows(),
        })
    }
}
