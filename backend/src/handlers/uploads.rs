//! HTTP handlers for sheet uploads and reconciliation

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;

use shared::models::ReconciliationStats;

use crate::error::{AppError, AppResult};
use crate::services::uploads::{build_result_preview, UploadOutcome};
use crate::AppState;

const PREVIEW_LIMIT: usize = 25;

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub stats: ReconciliationStats,
    pub total: usize,
    pub preview: Vec<String>,
}

/// Accept an uploaded sheet, classify it, and stash it for reconciliation.
pub async fn upload_sheet(
    State(state): State<AppState>,
    Path(account): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadOutcome>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::Validation {
            field: "file".to_string(),
            message: err.to_string(),
        })?
    {
        if field.file_name().is_none() && field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(|err| AppError::Validation {
            field: "file".to_string(),
            message: err.to_string(),
        })?;

        let outcome = state.uploads.ingest(&account, &data, filename.as_deref())?;
        return Ok(Json(outcome));
    }

    Err(AppError::Validation {
        field: "file".to_string(),
        message: "multipart file field is required".to_string(),
    })
}

/// Reconcile the stashed remote and local uploads for an account.
pub async fn reconcile_uploads(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> AppResult<Json<ReconcileResponse>> {
    let store_label = state.config.store.label.clone();
    let Some((rows, stats)) = state.uploads.recompute_result(&account, &store_label)? else {
        return Err(AppError::NotFound(
            "stashed remote and local uploads".to_string(),
        ));
    };

    let (preview, total) = build_result_preview(&rows, PREVIEW_LIMIT);
    Ok(Json(ReconcileResponse {
        stats,
        total,
        preview,
    }))
}
