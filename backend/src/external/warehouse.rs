//! Secondary warehouse system client
//!
//! The warehouse system exposes a stock report with classic offset
//! pagination, plus per-article filtered queries used when only a handful of
//! keys need fresh quantities. Per-article lookups fan out under a semaphore:
//! distinct keys only, bounded in-flight requests, results collected into a
//! key-indexed map so completion order never matters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use shared::article::normalize_article;

use crate::config::WarehouseConfig;
use crate::error::{AppError, AppResult};
use crate::external::{execute_with_retry, RetryPolicy};

const REPORT_PAGE_LIMIT: usize = 1000;

/// Warehouse system API client
#[derive(Clone)]
pub struct WarehouseClient {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
    max_concurrency: usize,
}

/// One row of the warehouse stock report.
#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseStockRow {
    #[serde(default)]
    pub article: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stock: Decimal,
    #[serde(default)]
    pub reserve: Decimal,
    #[serde(rename = "inTransit", default)]
    pub in_transit: Decimal,
    #[serde(default)]
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
struct StockReportPage {
    #[serde(default)]
    rows: Vec<WarehouseStockRow>,
}

impl WarehouseClient {
    pub fn new(config: &WarehouseConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// Create a client against a custom base URL (for testing)
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
            max_concurrency: 4,
        }
    }

    async fn fetch_report_page(
        &self,
        token: &str,
        offset: usize,
        filter: Option<&str>,
    ) -> AppResult<Vec<WarehouseStockRow>> {
        let url = format!("{}/report/stock/all", self.base_url);
        let bearer = format!("Bearer {token}");
        let limit = REPORT_PAGE_LIMIT.to_string();
        let offset = offset.to_string();

        let response = execute_with_retry(&self.policy, "report/stock/all", || {
            let mut request = self
                .client
                .get(&url)
                .header(AUTHORIZATION, &bearer)
                .header(ACCEPT, "application/json")
                .query(&[("limit", limit.as_str()), ("offset", offset.as_str())]);
            if let Some(article) = filter {
                request = request.query(&[("filter", format!("article={article}"))]);
            }
            request
        })
        .await?;

        let page: StockReportPage = response
            .json()
            .await
            .map_err(|err| AppError::MalformedResponse(err.to_string()))?;
        Ok(page.rows)
    }

    /// Fetch the full stock report, page by page.
    pub async fn fetch_stock_report(&self, token: &str) -> AppResult<Vec<WarehouseStockRow>> {
        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.fetch_report_page(token, offset, None).await?;
            if page.is_empty() {
                break;
            }
            rows.extend(page);
            offset += REPORT_PAGE_LIMIT;
        }
        tracing::info!(count = rows.len(), "warehouse stock report fetched");
        Ok(rows)
    }

    /// Fetch quantities for a set of articles with bounded concurrency.
    ///
    /// Articles are deduplicated by normalized key first, so no two in-flight
    /// requests ever target the same key. The returned map is keyed by the
    /// normalized article key.
    pub async fn fetch_quantities(
        &self,
        token: &str,
        articles: &[String],
    ) -> AppResult<HashMap<String, Decimal>> {
        let mut distinct: HashMap<String, String> = HashMap::new();
        for article in articles {
            let key = normalize_article(article);
            if !key.is_empty() {
                distinct.entry(key).or_insert_with(|| article.clone());
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<AppResult<(String, Decimal)>> = JoinSet::new();

        for (key, raw_article) in distinct {
            let client = self.clone();
            let token = token.to_string();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|err| AppError::Internal(err.into()))?;
                let rows = client
                    .fetch_report_page(&token, 0, Some(&raw_article))
                    .await?;
                let total = rows.iter().map(|row| row.quantity).sum();
                Ok((key, total))
            });
        }

        let mut quantities = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (key, total) = joined.map_err(|err| AppError::Internal(err.into()))??;
            quantities.insert(key, total);
        }
        Ok(quantities)
    }
}
