//! HTTP handlers for stock sync and views

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use shared::models::{LocationView, PagedView};
use shared::paginate::{location_view, paginate};

use crate::error::{AppError, AppResult};
use crate::services::stocks::{summarize_by_location, LocationSummary};
use crate::services::sync::SyncOutcome;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    /// Bypass the memo TTL (still throttled to one upstream refresh per
    /// window).
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub location: Option<String>,
    pub per_page: Option<usize>,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StockViewResponse {
    Location(LocationView),
    All(PagedView),
}

/// Run an incremental sync for an account and report the counters.
pub async fn sync_stocks(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> AppResult<Json<SyncOutcome>> {
    let token = state.credentials.marketplace_token(&account)?;
    let outcome = state.sync.sync_account(&account, &token).await?;
    Ok(Json(outcome))
}

/// Per-location totals for the account's current stock.
pub async fn stock_summary(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Query(query): Query<RefreshQuery>,
) -> AppResult<Json<Vec<LocationSummary>>> {
    let token = state.credentials.marketplace_token(&account)?;
    let rows = state
        .stocks
        .current_rows(&account, &token, query.refresh)
        .await?;
    Ok(Json(summarize_by_location(&rows)))
}

/// Paginated stock view, optionally scoped to one location.
pub async fn stock_view(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Query(query): Query<ViewQuery>,
) -> AppResult<Json<StockViewResponse>> {
    let per_page = query.per_page.unwrap_or(state.config.store.page_size);
    if per_page < 2 {
        return Err(AppError::Validation {
            field: "per_page".to_string(),
            message: "per_page must be at least 2".to_string(),
        });
    }

    let token = state.credentials.marketplace_token(&account)?;
    let rows = state
        .stocks
        .current_rows(&account, &token, query.refresh)
        .await?;

    let response = match query.location.as_deref() {
        Some(location) => {
            StockViewResponse::Location(location_view(&rows, location, per_page))
        }
        None => StockViewResponse::All(paginate(&rows, per_page)),
    };
    Ok(Json(response))
}
