//! Session authentication and rate limiting middleware.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use textlens_auth::{get_session_user, AuthError, User};

use crate::{api_error, ApiError, AppState};

/// Name of the session cookie set on login.
pub const SESSION_COOKIE: &str = "textlens_session";

/// The authenticated user for the current request, stored in request
/// extensions by [`session_auth_middleware`].
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: User,
    /// The session token the request authenticated with. Kept so the
    /// password-change handler can spare the current session when it
    /// invalidates the rest.
    pub token: String,
}

/// Pulls the session token out of the request headers: `textlens_session`
/// cookie first, then `Authorization: Bearer`.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookies) = headers.get(header::COOKIE) {
        if let Ok(cookies) = cookies.to_str() {
            for cookie in cookies.split(';') {
                if let Some(token) = cookie.trim().strip_prefix("textlens_session=") {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    let auth = headers.get(header::AUTHORIZATION)?;
    let auth = auth.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Middleware gating the protected API surface on a valid session.
///
/// Resolves the token to a user on a blocking task and stores a
/// [`CurrentUser`] in request extensions. Responds 401 with a JSON error
/// body for missing, unknown, or expired sessions.
pub async fn session_auth_middleware(
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_session_token(req.headers()) else {
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            "authentication required",
        ));
    };

    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or_else(|| {
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "server state missing")
        })?
        .clone();

    let lookup_token = token.clone();
    let user = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get db connection for session lookup");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })?;
        get_session_user(&conn, &lookup_token).map_err(|e| match e {
            AuthError::SessionInvalid => {
                api_error(StatusCode::UNAUTHORIZED, "session invalid or expired")
            }
            other => {
                tracing::error!(error = %other, "session lookup failed");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        })
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "session lookup task join error");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    })??;

    req.extensions_mut().insert(CurrentUser { user, token });

    Ok(next.run(req).await)
}

/// Rate limiting key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitKey {
    /// Rate limit by client IP address.
    Ip(IpAddr),
    /// Rate limit by internal user ID.
    User(i64),
}

/// Length of one counting window.
const WINDOW: Duration = Duration::from_secs(60);

/// Map size beyond which lapsed windows are swept out.
const EVICT_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Fixed-window request counter, one window per key.
///
/// The map is swept once it grows past [`EVICT_THRESHOLD`] entries;
/// only keys whose window has already lapsed are dropped, so live
/// counters keep their state through a sweep.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    state: Arc<Mutex<HashMap<RateLimitKey, Window>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts a request against `key`. Returns `false` once the key has
    /// gone past `limit` requests inside the current window.
    pub fn check(&self, key: RateLimitKey, limit: u32) -> bool {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // A stale counter beats refusing every request over a
                // poisoned lock.
                tracing::error!("rate limiter lock poisoned, recovering with stale state");
                poisoned.into_inner()
            }
        };
        let now = Instant::now();

        if state.len() > EVICT_THRESHOLD {
            state.retain(|_, window| now.duration_since(window.started) <= WINDOW);
        }

        let window = state.entry(key).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(window.started) > WINDOW {
            *window = Window {
                count: 1,
                started: now,
            };
            return true;
        }

        window.count += 1;
        window.count <= limit
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate limiting middleware.
///
/// Mounted inside the auth layer on protected routes, where it keys on
/// the authenticated user, and directly on public routes, where it keys
/// on the client IP. Requests with neither — direct service calls in
/// tests — pass through unlimited.
pub async fn rate_limit_middleware(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or_else(|| {
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "server state missing")
        })?
        .clone();

    let key = if let Some(current) = req.extensions().get::<CurrentUser>() {
        Some(RateLimitKey::User(current.user.id))
    } else {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| RateLimitKey::Ip(addr.ip()))
    };

    if let Some(key) = key {
        let path = req.uri().path();
        let limit = if path == "/api/auth/login" || path == "/api/auth/register" {
            state.auth_rate_limit
        } else {
            state.default_rate_limit
        };

        if !state.rate_limiter.check(key, limit) {
            let mut response =
                api_error(StatusCode::TOO_MANY_REQUESTS, "too many requests").into_response();
            response.headers_mut().insert(
                header::RETRY_AFTER,
                axum::http::HeaderValue::from_static("60"),
            );
            return Ok(response);
        }
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_once_the_window_limit_is_spent() {
        let limiter = RateLimiter::new();
        let key = RateLimitKey::User(7);

        assert!(limiter.check(key.clone(), 2));
        assert!(limiter.check(key.clone(), 2));
        assert!(!limiter.check(key.clone(), 2));
        // Still denied; the window has not rolled over.
        assert!(!limiter.check(key, 2));
    }

    #[test]
    fn user_and_ip_keys_count_separately() {
        let limiter = RateLimiter::new();
        let user = RateLimitKey::User(1);
        let ip = RateLimitKey::Ip("192.168.1.1".parse().unwrap());

        assert!(limiter.check(user.clone(), 1));
        assert!(!limiter.check(user, 1));

        // The IP key has its own window.
        assert!(limiter.check(ip, 1));
    }

    #[test]
    fn sweep_keeps_counters_with_live_windows() {
        let limiter = RateLimiter::new();
        let busy = RateLimitKey::User(-1);
        assert!(limiter.check(busy.clone(), 2));
        assert!(limiter.check(busy.clone(), 2));

        // Push the map over the sweep threshold with distinct IPs. Every
        // window is still live, so the busy key's count must survive.
        for i in 0..=(EVICT_THRESHOLD as u32) {
            let ip: IpAddr = std::net::Ipv4Addr::from(i.to_be_bytes()).into();
            limiter.check(RateLimitKey::Ip(ip), 2);
        }

        assert!(!limiter.check(busy, 2));
    }

    #[test]
    fn token_extraction_prefers_cookie() {
        let req = Request::builder()
            .header(header::COOKIE, "theme=dark; textlens_session=abc123")
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract_session_token(req.headers()).as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn token_extraction_falls_back_to_bearer() {
        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract_session_token(req.headers()).as_deref(),
            Some("from-header")
        );

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_session_token(bare.headers()), None);
    }
}
