//! Single and batch text analysis endpoints.

use crate::middleware::CurrentUser;
use crate::{api_error, blocking_conn, record_history_or_log, run_blocking, ApiError, AppState};
use axum::{extract::Extension, http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use textlens_analysis::{analyze, analyze_with_options, BATCH_MAX_KEYWORDS};
use textlens_auth::increment_quota_used;
use textlens_records::create_analysis;
use textlens_types::{AnalysisSource, AnalysisStatus, HistoryAction};

/// Maximum content length for a single analysis.
const MAX_CONTENT_CHARS: usize = 50_000;
/// Maximum number of items in a batch request.
const BATCH_MAX_ITEMS: usize = 10;
/// Maximum content length per batch item.
const BATCH_ITEM_MAX_CHARS: usize = 10_000;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub content: String,
}

/// POST /api/analyze
///
/// The engine itself cannot fail; persistence can, and a lost record is
/// not worth failing the request over — the caller still gets the
/// result, just without a stored `id`.
pub async fn analyze_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.content.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "content is required"));
    }
    let content_chars = payload.content.chars().count();
    if content_chars > MAX_CONTENT_CHARS {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            &format!("content exceeds {MAX_CONTENT_CHARS} characters"),
        ));
    }

    let report = analyze(&payload.content);
    let result = serde_json::to_value(&report).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize analysis report");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    })?;

    let pool = state.pool.clone();
    let user_id = current.user.id;
    let persist_result = result.clone();
    let stored_id = run_blocking(move || {
        let conn = blocking_conn(&pool)?;
        let stored = create_analysis(
            &conn,
            user_id,
            &payload.content,
            &persist_result,
            AnalysisStatus::Completed,
            AnalysisSource::Text,
        );
        let stored_id = match stored {
            Ok(analysis) => Some(analysis.analysis_id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist analysis");
                None
            }
        };
        if let Err(e) = increment_quota_used(&conn, user_id) {
            tracing::warn!(error = %e, "failed to increment api quota");
        }
        record_history_or_log(
            &conn,
            user_id,
            HistoryAction::Analyze,
            json!({ "content_length": content_chars }),
        );
        Ok(stored_id)
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "id": stored_id,
        "result": result,
        "message": "analysis completed",
    })))
}

#[derive(Deserialize)]
pub struct BatchAnalyzeRequest {
    pub contents: Vec<String>,
}

/// POST /api/analyze/batch
pub async fn batch_analyze_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<BatchAnalyzeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.contents.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "at least one content item is required",
        ));
    }
    if payload.contents.len() > BATCH_MAX_ITEMS {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            &format!("at most {BATCH_MAX_ITEMS} items per batch"),
        ));
    }
    for (index, content) in payload.contents.iter().enumerate() {
        if content.trim().is_empty() {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                &format!("item {index} is empty"),
            ));
        }
        if content.chars().count() > BATCH_ITEM_MAX_CHARS {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                &format!("item {index} exceeds {BATCH_ITEM_MAX_CHARS} characters"),
            ));
        }
    }

    let pool = state.pool.clone();
    let user_id = current.user.id;
    let contents = payload.contents;
    let (items, success, failed) = run_blocking(move || {
        let conn = blocking_conn(&pool)?;
        let mut items = Vec::with_capacity(contents.len());
        let mut success = 0u32;
        let mut failed = 0u32;

        for (index, content) in contents.iter().enumerate() {
            let report = analyze_with_options(content, BATCH_MAX_KEYWORDS);
            let result = match serde_json::to_value(&report) {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!(error = %e, index, "failed to serialize batch report");
                    failed += 1;
                    items.push(json!({ "index": index, "success": false }));
                    continue;
                }
            };

            match create_analysis(
                &conn,
                user_id,
                content,
                &result,
                AnalysisStatus::Completed,
                AnalysisSource::Batch,
            ) {
                Ok(stored) => {
                    success += 1;
                    items.push(json!({
                        "index": index,
                        "success": true,
                        "id": stored.analysis_id,
                        "result": result,
                    }));
                }
                Err(e) => {
                    tracing::warn!(error = %e, index, "failed to persist batch item");
                    failed += 1;
                    items.push(json!({
                        "index": index,
                        "success": false,
                        "result": result,
                    }));
                }
            }
        }

        if let Err(e) = increment_quota_used(&conn, user_id) {
            tracing::warn!(error = %e, "failed to increment api quota");
        }
        record_history_or_log(
            &conn,
            user_id,
            HistoryAction::BatchAnalyze,
            json!({ "count": contents.len() }),
        );
        Ok((items, success, failed))
    })
    .await?;

    let total = items.len();
    Ok(Json(json!({
        "success": true,
        "items": items,
        "summary": { "total": total, "success": success, "failed": failed },
    })))
}
