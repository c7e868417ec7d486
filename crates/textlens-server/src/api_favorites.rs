//! Favorites endpoints.

use crate::middleware::CurrentUser;
use crate::{api_error, blocking_conn, record_history_or_log, run_blocking, ApiError, AppState};
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use textlens_records::{
    add_favorite, delete_favorite, get_analysis, list_favorites, RecordError,
};
use textlens_types::{HistoryAction, Pagination};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub(crate) fn page_params(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

/// GET /api/favorites
pub async fn list_favorites_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (page, limit) = page_params(query.page, query.limit);
    let offset = u64::from(page - 1) * u64::from(limit);

    let pool = state.pool.clone();
    let user_id = current.user.id;
    let (favorites, total) = run_blocking(move || {
        let conn = blocking_conn(&pool)?;
        list_favorites(&conn, user_id, offset, limit).map_err(|e| {
            tracing::error!(error = %e, "favorite listing failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "favorites": favorites,
        "pagination": Pagination::new(page, limit, total),
    })))
}

#[derive(Deserialize)]
pub struct AddFavoriteRequest {
    pub analysis_id: Option<String>,
}

/// POST /api/favorites
pub async fn add_favorite_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<AddFavoriteRequest>,
) -> Result<Response, ApiError> {
    let Some(analysis_id) = payload.analysis_id.filter(|id| !id.is_empty()) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "analysis_id is required"));
    };

    let pool = state.pool.clone();
    let user_id = current.user.id;
    let favorite = run_blocking(move || {
        let conn = blocking_conn(&pool)?;
        let analysis = get_analysis(&conn, &analysis_id).map_err(|e| match e {
            RecordError::NotFound(_) => api_error(StatusCode::NOT_FOUND, "analysis not found"),
            other => {
                tracing::error!(error = %other, "analysis lookup failed");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        })?;
        if analysis.user_id != user_id {
            return Err(api_error(
                StatusCode::FORBIDDEN,
                "analysis belongs to another user",
            ));
        }

        let favorite = add_favorite(&conn, user_id, analysis.id).map_err(|e| match e {
            RecordError::Duplicate => {
                api_error(StatusCode::CONFLICT, "analysis already favorited")
            }
            other => {
                tracing::error!(error = %other, "favorite creation failed");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        })?;
        record_history_or_log(
            &conn,
            user_id,
            HistoryAction::FavoriteAdd,
            json!({ "analysis_id": analysis.analysis_id }),
        );
        Ok(favorite)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "favorite": favorite })),
    )
        .into_response())
}

#[derive(Deserialize)]
pub struct DeleteFavoriteQuery {
    pub id: Option<String>,
}

/// DELETE /api/favorites?id=<favorite_id>
pub async fn delete_favorite_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<DeleteFavoriteQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(favorite_id) = query.id.filter(|id| !id.is_empty()) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "id is required"));
    };

    let pool = state.pool.clone();
    let user_id = current.user.id;
    run_blocking(move || {
        let conn = blocking_conn(&pool)?;
        let analysis_id = delete_favorite(&conn, user_id, &favorite_id).map_err(|e| match e {
            RecordError::NotFound(_) => api_error(StatusCode::NOT_FOUND, "favorite not found"),
            other => {
                tracing::error!(error = %other, "favorite deletion failed");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        })?;
        record_history_or_log(
            &conn,
            user_id,
            HistoryAction::FavoriteRemove,
            json!({ "analysis_id": analysis_id }),
        );
        Ok(())
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": "favorite removed"
    })))
}
