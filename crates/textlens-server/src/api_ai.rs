//! AI-assisted analysis endpoint.

use crate::ai::AiError;
use crate::middleware::CurrentUser;
use crate::{api_error, blocking_conn, record_history_or_log, run_blocking, ApiError, AppState};
use axum::{extract::Extension, http::StatusCode, response::Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use textlens_auth::increment_quota_used;
use textlens_records::create_analysis;
use textlens_types::{AnalysisKind, AnalysisSource, AnalysisStatus, HistoryAction};

/// Maximum text length for AI analysis.
const MAX_TEXT_CHARS: usize = 50_000;

#[derive(Deserialize)]
pub struct AiAnalyzeRequest {
    pub text: String,
    /// Analysis kind; defaults to `general`. Kept as a string so an
    /// unknown value maps to 400 instead of a body-rejection error.
    pub kind: Option<String>,
    /// Provider name or `auto`.
    pub provider: Option<String>,
}

/// POST /api/ai/analyze
pub async fn ai_analyze_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<AiAnalyzeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.text.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "text is required"));
    }
    if payload.text.chars().count() > MAX_TEXT_CHARS {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            &format!("text exceeds {MAX_TEXT_CHARS} characters"),
        ));
    }

    let kind = match payload.kind.as_deref() {
        None => AnalysisKind::General,
        Some(raw) => AnalysisKind::parse(raw).ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                &format!("unknown analysis kind: {raw}"),
            )
        })?,
    };

    if !state.ai.is_configured() {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "no AI provider configured",
        ));
    }

    let answer = state
        .ai
        .analyze(payload.provider.as_deref(), kind, &payload.text)
        .await
        .map_err(|e| match e {
            AiError::UnknownProvider(name) => api_error(
                StatusCode::BAD_REQUEST,
                &format!("unknown provider: {name}"),
            ),
            AiError::NoProvider => api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "requested provider is not configured",
            ),
            upstream @ (AiError::Upstream { .. }
            | AiError::MalformedResponse
            | AiError::Request(_)) => {
                tracing::error!(error = %upstream, kind = kind.as_str(), "ai analysis failed");
                api_error(StatusCode::BAD_GATEWAY, "AI provider request failed")
            }
        })?;

    let processed_at = Utc::now().to_rfc3339();
    let result = json!({
        "kind": kind,
        "provider": answer.provider_id,
        "result": answer.text.clone(),
        "processed_at": processed_at.clone(),
    });

    let pool = state.pool.clone();
    let user_id = current.user.id;
    let persist_result = result.clone();
    let text = payload.text;
    let stored_id = run_blocking(move || {
        let conn = blocking_conn(&pool)?;
        let stored = create_analysis(
            &conn,
            user_id,
            &text,
            &persist_result,
            AnalysisStatus::Completed,
            AnalysisSource::Ai,
        );
        let stored_id = match stored {
            Ok(analysis) => Some(analysis.analysis_id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist ai analysis");
                None
            }
        };
        if let Err(e) = increment_quota_used(&conn, user_id) {
            tracing::warn!(error = %e, "failed to increment api quota");
        }
        record_history_or_log(
            &conn,
            user_id,
            HistoryAction::AiAnalyze,
            json!({ "kind": kind }),
        );
        Ok(stored_id)
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "id": stored_id,
        "provider": answer.provider,
        "kind": kind,
        "result": answer.text,
        "processed_at": processed_at,
    })))
}
