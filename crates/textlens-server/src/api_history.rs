//! History endpoints.

use crate::api_favorites::page_params;
use crate::middleware::CurrentUser;
use crate::{api_error, blocking_conn, run_blocking, ApiError, AppState};
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use textlens_records::{clear_history, list_history, HistoryFilter};
use textlens_types::Pagination;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub action: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GET /api/history
pub async fn list_history_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (page, limit) = page_params(query.page, query.limit);
    let offset = u64::from(page - 1) * u64::from(limit);

    let filter = HistoryFilter {
        action: query.action.clone().filter(|a| !a.is_empty()),
        start_date: query.start_date.clone().filter(|d| !d.is_empty()),
        end_date: query.end_date.clone().filter(|d| !d.is_empty()),
    };

    let pool = state.pool.clone();
    let user_id = current.user.id;
    let query_filter = filter.clone();
    let (entries, total) = run_blocking(move || {
        let conn = blocking_conn(&pool)?;
        list_history(&conn, user_id, &query_filter, offset, limit).map_err(|e| {
            tracing::error!(error = %e, "history listing failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "history": entries,
        "pagination": Pagination::new(page, limit, total),
        "filters": {
            "action": filter.action,
            "start_date": filter.start_date,
            "end_date": filter.end_date,
        },
    })))
}

#[derive(Deserialize)]
pub struct ClearHistoryQuery {
    pub action: Option<String>,
    pub all: Option<String>,
}

/// DELETE /api/history?action=<a> or ?all=true
pub async fn clear_history_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ClearHistoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let clear_all = query.all.as_deref() == Some("true");
    let action = query.action.filter(|a| !a.is_empty());

    if !clear_all && action.is_none() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "either action or all=true is required",
        ));
    }

    let pool = state.pool.clone();
    let user_id = current.user.id;
    let deleted = run_blocking(move || {
        let conn = blocking_conn(&pool)?;
        let target = if clear_all { None } else { action.as_deref() };
        clear_history(&conn, user_id, target).map_err(|e| {
            tracing::error!(error = %e, "history clearing failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })
    })
    .await?;

    Ok(Json(json!({ "success": true, "deleted": deleted })))
}
