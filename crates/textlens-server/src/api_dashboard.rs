//! Dashboard endpoint.

use crate::middleware::CurrentUser;
use crate::{api_error, blocking_conn, run_blocking, ApiError, AppState};
use axum::{extract::Extension, http::StatusCode, Json};
use serde_json::json;
use std::sync::Arc;
use textlens_records::dashboard_data;

/// GET /api/dashboard
pub async fn dashboard_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.pool.clone();
    let user_id = current.user.id;
    let data = run_blocking(move || {
        let conn = blocking_conn(&pool)?;
        dashboard_data(&conn, user_id).map_err(|e| {
            tracing::error!(error = %e, "dashboard aggregation failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })
    })
    .await?;

    Ok(Json(json!({ "success": true, "data": data })))
}
