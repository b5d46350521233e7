//! HTTP handlers for spreadsheet downloads

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue},
};
use serde::Deserialize;

use shared::models::StockRecord;
use shared::reconcile::apply_warehouse_quantities;

use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockExportMode {
    #[default]
    All,
    ByLocation,
    /// Detailed export with quantities replaced from the warehouse system
    /// and every row relabelled to the configured store.
    Store,
}

#[derive(Debug, Deserialize)]
pub struct StockExportQuery {
    #[serde(default)]
    pub mode: StockExportMode,
}

fn xlsx_response(filename: &str, bytes: Vec<u8>) -> AppResult<(HeaderMap, Vec<u8>)> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
    );
    let disposition = format!("attachment; filename=\"{filename}\"");
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|err| AppError::Internal(err.into()))?,
    );
    Ok((headers, bytes))
}

async fn current_rows(state: &AppState, account: &str) -> AppResult<Vec<StockRecord>> {
    let token = state.credentials.marketplace_token(account)?;
    state.stocks.current_rows(account, &token, false).await
}

/// Download the account's stock as a spreadsheet.
pub async fn export_stocks(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Query(query): Query<StockExportQuery>,
) -> AppResult<(HeaderMap, Vec<u8>)> {
    let rows = current_rows(&state, &account).await?;

    let (result, bytes) = match query.mode {
        StockExportMode::All => state.exports.export_stocks_all(&account, &rows)?,
        StockExportMode::ByLocation => {
            state.exports.export_stocks_by_location(&account, &rows)?
        }
        StockExportMode::Store => {
            let warehouse_token = state.credentials.warehouse_token(&account)?.ok_or_else(
                || {
                    AppError::CredentialMissing(format!(
                        "warehouse token is not set for {account}"
                    ))
                },
            )?;
            let articles: Vec<String> = rows
                .iter()
                .map(|row| row.supplier_article.clone())
                .collect();
            let quantities = state
                .warehouse
                .fetch_quantities(&warehouse_token, &articles)
                .await?;
            let (merged, stats) =
                apply_warehouse_quantities(&rows, &quantities, &state.config.store.label);
            tracing::info!(
                account,
                matched = stats.matched,
                unmatched = stats.unmatched,
                rows = stats.rows_total,
                "warehouse quantities applied"
            );
            state.exports.export_store_stocks(&account, &merged)?
        }
    };

    let filename = result
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stocks.xlsx".to_string());
    xlsx_response(&filename, bytes)
}

/// Download the full warehouse system stock report as a spreadsheet.
pub async fn export_warehouse(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> AppResult<(HeaderMap, Vec<u8>)> {
    let token = state
        .credentials
        .warehouse_token(&account)?
        .ok_or_else(|| {
            AppError::CredentialMissing(format!("warehouse token is not set for {account}"))
        })?;

    let rows = state.warehouse.fetch_stock_report(&token).await?;
    let (result, bytes) = state.exports.export_warehouse_report(&account, &rows)?;
    let filename = result
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "warehouse.xlsx".to_string());
    xlsx_response(&filename, bytes)
}

/// Download the reconciled upload result as a spreadsheet.
pub async fn export_reconciled(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> AppResult<(HeaderMap, Vec<u8>)> {
    let store_label = state.config.store.label.clone();
    let Some((rows, _stats)) = state.uploads.recompute_result(&account, &store_label)? else {
        return Err(AppError::NotFound(
            "stashed remote and local uploads".to_string(),
        ));
    };

    let (result, bytes) = state.exports.export_reconciled(&account, &rows)?;
    let filename = result
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reconciled.xlsx".to_string());
    xlsx_response(&filename, bytes)
}
