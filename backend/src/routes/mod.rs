//! Route definitions for the Shop Stock Assistant backend

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Stock sync and views
        .nest("/stocks", stock_routes())
        // Sheet uploads and reconciliation
        .nest("/uploads", upload_routes())
        // Spreadsheet downloads
        .nest("/exports", export_routes())
}

fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/:account/sync", post(handlers::sync_stocks))
        .route("/:account/summary", get(handlers::stock_summary))
        .route("/:account/view", get(handlers::stock_view))
}

fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/:account", post(handlers::upload_sheet))
        .route("/:account/reconcile", post(handlers::reconcile_uploads))
}

fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/:account/stocks", get(handlers::export_stocks))
        .route("/:account/warehouse", get(handlers::export_warehouse))
        .route("/:account/reconciled", get(handlers::export_reconciled))
}
