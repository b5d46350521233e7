//! Marketplace statistics API client
//!
//! Stock observations are pulled through an incremental endpoint: each
//! request carries a `dateFrom` cursor and returns every record changed since
//! then, oldest first. Paging continues until an empty page; the cursor for
//! the next page is the newest `lastChangeDate` seen on the current one.

use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use std::time::Duration;

use shared::models::{format_timestamp, StockRecord};

use crate::config::MarketplaceConfig;
use crate::error::{AppError, AppResult};
use crate::external::{execute_with_retry, RetryPolicy};

/// Marketplace statistics API client
#[derive(Clone)]
pub struct MarketplaceClient {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl MarketplaceClient {
    /// Create a client with the configured timeouts.
    pub fn new(config: &MarketplaceConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
        }
    }

    /// Create a client against a custom base URL (for testing)
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
        }
    }

    /// Fetch every stock record changed since `date_from`.
    ///
    /// Pages are fetched strictly in cursor order — the next cursor depends
    /// on the current page, so this is never parallelized per credential.
    /// If a non-empty page fails to advance the cursor, fetching stops with a
    /// warning instead of re-requesting the same page forever.
    pub async fn fetch_stocks(
        &self,
        token: &str,
        date_from: DateTime<Utc>,
    ) -> AppResult<Vec<StockRecord>> {
        let mut cursor = date_from;
        let mut records: Vec<StockRecord> = Vec::new();

        loop {
            let page = self.fetch_page(token, cursor).await?;
            if page.is_empty() {
                break;
            }

            let newest = page.iter().filter_map(|r| r.last_changed_at).max();
            records.extend(page);

            match newest {
                Some(stamp) if stamp > cursor => cursor = stamp,
                _ => {
                    tracing::warn!(
                        cursor = %format_timestamp(cursor),
                        fetched = records.len(),
                        "page did not advance the cursor, stopping fetch"
                    );
                    break;
                }
            }
        }

        tracing::info!(
            count = records.len(),
            date_from = %format_timestamp(date_from),
            "stocks fetched"
        );
        Ok(records)
    }

    async fn fetch_page(
        &self,
        token: &str,
        cursor: DateTime<Utc>,
    ) -> AppResult<Vec<StockRecord>> {
        let url = format!("{}/api/v1/supplier/stocks", self.base_url);
        let date_from = format_timestamp(cursor);

        let response = execute_with_retry(&self.policy, "supplier/stocks", || {
            self.client
                .get(&url)
                .header(AUTHORIZATION, token)
                .query(&[("dateFrom", date_from.as_str())])
        })
        .await?;

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|err| AppError::MalformedResponse(err.to_string()))?;

        let entries = payload.as_array().ok_or_else(|| {
            AppError::MalformedResponse("expected a list of stock records".to_string())
        })?;

        let records = entries
            .iter()
            .filter(|entry| entry.is_object())
            .filter_map(|entry| serde_json::from_value::<StockRecord>(entry.clone()).ok())
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::parse_timestamp;

    #[test]
    fn page_cursor_uses_newest_timestamp() {
        // Timestamps within a page are not guaranteed monotonic; the next
        // cursor must be the maximum, not the last element.
        let records = vec![
            StockRecord {
                last_changed_at: parse_timestamp("2024-03-02T00:00:00Z"),
                ..StockRecord::default()
            },
            StockRecord {
                last_changed_at: parse_timestamp("2024-03-01T00:00:00Z"),
                ..StockRecord::default()
            },
        ];
        let newest = records.iter().filter_map(|r| r.last_changed_at).max();
        assert_eq!(newest, parse_timestamp("2024-03-02T00:00:00Z"));
    }
}
