//! Registration, login/logout, profile, and password change.

use crate::middleware::{extract_session_token, CurrentUser, SESSION_COOKIE};
use crate::{api_error, blocking_conn, record_history_or_log, run_blocking, ApiError, AppState};
use axum::{
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use textlens_auth::validate::{is_valid_email, is_valid_password, MIN_PASSWORD_LEN};
use textlens_auth::{
    create_session, create_user, delete_other_sessions, delete_session, get_session_user,
    update_password, verify_credentials, AuthError,
};
use textlens_types::HistoryAction;

/// Builds the session Set-Cookie value for a login.
fn session_cookie(token: &str, ttl_days: u32) -> String {
    let max_age = u64::from(ttl_days) * 86_400;
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age}")
}

/// Builds the Set-Cookie value that clears the session cookie.
fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Optional confirmation; must match `password` when present.
    pub confirm_password: Option<String>,
    pub name: Option<String>,
}

/// POST /api/auth/register
pub async fn register_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(api_error(StatusCode::BAD_REQUEST, "invalid email address"));
    }
    if !is_valid_password(&payload.password) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            &format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if let Some(confirm) = &payload.confirm_password {
        if *confirm != payload.password {
            return Err(api_error(StatusCode::BAD_REQUEST, "passwords do not match"));
        }
    }

    let pool = state.pool.clone();
    let user = run_blocking(move || {
        let conn = blocking_conn(&pool)?;
        let user = create_user(
            &conn,
            &email,
            payload.name.as_deref(),
            &payload.password,
        )
        .map_err(|e| match e {
            AuthError::EmailTaken(_) => {
                api_error(StatusCode::CONFLICT, "email already registered")
            }
            other => {
                tracing::error!(error = %other, "user creation failed");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        })?;
        record_history_or_log(&conn, user.id, HistoryAction::Register, json!({}));
        Ok(user)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "user": user })),
    )
        .into_response())
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/login
pub async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "email and password are required",
        ));
    }

    let pool = state.pool.clone();
    let ttl_days = state.session_ttl_days;
    let (user, session) = run_blocking(move || {
        let conn = blocking_conn(&pool)?;
        let user = verify_credentials(&conn, &email, &payload.password).map_err(|e| match e {
            AuthError::InvalidCredentials => {
                api_error(StatusCode::UNAUTHORIZED, "invalid email or password")
            }
            other => {
                tracing::error!(error = %other, "credential verification failed");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        })?;
        let session = create_session(&conn, user.id, ttl_days).map_err(|e| {
            tracing::error!(error = %e, "session creation failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })?;
        record_history_or_log(&conn, user.id, HistoryAction::Login, json!({}));
        Ok((user, session))
    })
    .await?;

    Ok((
        [(header::SET_COOKIE, session_cookie(&session.token, ttl_days))],
        Json(json!({
            "success": true,
            "user": user,
            "token": session.token,
        })),
    )
        .into_response())
}

/// POST /api/auth/logout
///
/// Public: a stale or missing session still gets its cookie cleared.
pub async fn logout_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_session_token(&headers) {
        let pool = state.pool.clone();
        run_blocking(move || {
            let conn = blocking_conn(&pool)?;
            // Best effort. Resolve the user first so the logout can be
            // recorded, then drop the session.
            if let Ok(user) = get_session_user(&conn, &token) {
                match delete_session(&conn, &token) {
                    Ok(true) => {
                        record_history_or_log(&conn, user.id, HistoryAction::Logout, json!({}));
                    }
                    Ok(false) => {}
                    Err(e) => tracing::warn!(error = %e, "session deletion failed"),
                }
            }
            Ok(())
        })
        .await?;
    }

    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "success": true, "message": "logged out" })),
    )
        .into_response())
}

/// GET /api/auth/me
pub async fn me_handler(
    Extension(current): Extension<CurrentUser>,
) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "user": current.user }))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// POST /api/auth/change-password
pub async fn change_password_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !is_valid_password(&payload.new_password) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            &format!("new password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if payload.new_password != payload.confirm_password {
        return Err(api_error(StatusCode::BAD_REQUEST, "passwords do not match"));
    }
    if payload.new_password == payload.current_password {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "new password must differ from the current password",
        ));
    }

    let pool = state.pool.clone();
    let user_id = current.user.id;
    let keep_token = current.token.clone();
    run_blocking(move || {
        let conn = blocking_conn(&pool)?;
        update_password(
            &conn,
            user_id,
            &payload.current_password,
            &payload.new_password,
        )
        .map_err(|e| match e {
            AuthError::InvalidCredentials => {
                api_error(StatusCode::UNAUTHORIZED, "current password is incorrect")
            }
            other => {
                tracing::error!(error = %other, "password update failed");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        })?;

        // Stolen sessions die with the old password; the one performing
        // the change stays alive.
        match delete_other_sessions(&conn, user_id, &keep_token) {
            Ok(removed) if removed > 0 => {
                tracing::info!(user_id, removed, "invalidated other sessions");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "failed to invalidate other sessions"),
        }

        record_history_or_log(&conn, user_id, HistoryAction::PasswordChange, json!({}));
        Ok(())
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": "password changed"
    })))
}
