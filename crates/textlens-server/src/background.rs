//! Background tasks for the TextLens server.
//!
//! Includes:
//! - Pruning expired sessions.

use crate::AppState;
use std::sync::Arc;
use textlens_auth::prune_expired_sessions;
use tokio::time::{sleep, Duration};

/// Starts the expired-session pruning task.
///
/// Runs indefinitely, deleting sessions past their expiry on each tick.
/// Expired sessions are already rejected at lookup time; this sweep only
/// keeps the table from growing without bound.
pub async fn start_session_prune_task(state: Arc<AppState>, interval_seconds: u64) {
    if interval_seconds == 0 {
        tracing::warn!("session pruning task disabled (interval=0)");
        return;
    }

    let interval = Duration::from_secs(interval_seconds);
    tracing::info!(interval_seconds, "starting session pruning task");

    loop {
        sleep(interval).await;

        let pool = state.pool.clone();
        let res = tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(|e| e.to_string())?;
            prune_expired_sessions(&conn).map_err(|e| e.to_string())
        })
        .await;

        match res {
            Ok(Ok(pruned)) => {
                if pruned > 0 {
                    tracing::info!(count = pruned, "pruned expired sessions");
                }
            }
            Ok(Err(e)) => {
                tracing::error!("failed to prune expired sessions: {}", e);
            }
            Err(e) => {
                tracing::error!("session pruning task join error: {}", e);
            }
        }
    }
}
