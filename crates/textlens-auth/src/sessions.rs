//! Server-side session records.
//!
//! Sessions are random 256-bit hex tokens with a TTL. The token itself
//! acts as the bearer credential; expiry is enforced in SQL so that a
//! clock skew between reads cannot resurrect an expired session.

use crate::users::{get_user_by_id, User};
use crate::AuthError;
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};

/// An issued session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub expires_at: String,
    pub created_at: String,
}

/// Generates a fresh 32-byte random token, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Creates a new session for the user with the given TTL.
pub fn create_session(
    conn: &Connection,
    user_id: i64,
    ttl_days: u32,
) -> Result<Session, AuthError> {
    let token = generate_token();

    conn.execute(
        "INSERT INTO sessions (token, user_id, expires_at)
         VALUES (?1, ?2, datetime('now', '+' || ?3 || ' days'))",
        params![token, user_id, ttl_days],
    )?;

    conn.query_row(
        "SELECT token, user_id, expires_at, created_at FROM sessions WHERE token = ?1",
        [&token],
        |row| {
            Ok(Session {
                token: row.get(0)?,
                user_id: row.get(1)?,
                expires_at: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .map_err(AuthError::Database)
}

/// Resolves a session token to its user.
///
/// # Errors
///
/// Returns `AuthError::SessionInvalid` for unknown or expired tokens.
pub fn get_session_user(conn: &Connection, token: &str) -> Result<User, AuthError> {
    let user_id: Option<i64> = conn
        .query_row(
            "SELECT user_id FROM sessions
             WHERE token = ?1 AND expires_at > datetime('now')",
            [token],
            |row| row.get(0),
        )
        .optional()?;

    match user_id {
        Some(id) => get_user_by_id(conn, id).map_err(|e| match e {
            // Session row outliving its user should read as a bad session.
            AuthError::UserNotFound => AuthError::SessionInvalid,
            other => other,
        }),
        None => Err(AuthError::SessionInvalid),
    }
}

/// Deletes a session by token. Returns `true` if a row was removed.
pub fn delete_session(conn: &Connection, token: &str) -> Result<bool, AuthError> {
    let changed = conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
    Ok(changed > 0)
}

/// Deletes every session of a user except the given token.
///
/// Used after a password change so that stolen sessions die with the
/// old password.
pub fn delete_other_sessions(
    conn: &Connection,
    user_id: i64,
    keep_token: &str,
) -> Result<usize, AuthError> {
    let changed = conn.execute(
        "DELETE FROM sessions WHERE user_id = ?1 AND token != ?2",
        params![user_id, keep_token],
    )?;
    Ok(changed)
}

/// Removes expired sessions. Returns the number of rows deleted.
pub fn prune_expired_sessions(conn: &Connection) -> Result<usize, AuthError> {
    let changed = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= datetime('now')",
        [],
    )?;
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::create_user;

    fn conn_with_user() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        textlens_db::run_migrations(&conn).unwrap();
        let user = create_user(&conn, "eve@example.com", None, "password1").unwrap();
        (conn, user)
    }

    #[test]
    fn session_round_trip() {
        let (conn, user) = conn_with_user();
        let session = create_session(&conn, user.id, 7).unwrap();
        assert_eq!(session.token.len(), 64);

        let resolved = get_session_user(&conn, &session.token).unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[test]
    fn unknown_token_rejected() {
        let (conn, _user) = conn_with_user();
        assert!(matches!(
            get_session_user(&conn, "deadbeef"),
            Err(AuthError::SessionInvalid)
        ));
    }

    #[test]
    fn expired_session_rejected_and_pruned() {
        let (conn, user) = conn_with_user();
        let session = create_session(&conn, user.id, 7).unwrap();

        // Force expiry in the past.
        conn.execute(
            "UPDATE sessions SET expires_at = datetime('now', '-1 hour') WHERE token = ?1",
            [&session.token],
        )
        .unwrap();

        assert!(matches!(
            get_session_user(&conn, &session.token),
            Err(AuthError::SessionInvalid)
        ));

        let pruned = prune_expired_sessions(&conn).unwrap();
        assert_eq!(pruned, 1);
    }

    #[test]
    fn delete_session_is_idempotent() {
        let (conn, user) = conn_with_user();
        let session = create_session(&conn, user.id, 7).unwrap();

        assert!(delete_session(&conn, &session.token).unwrap());
        assert!(!delete_session(&conn, &session.token).unwrap());
    }

    #[test]
    fn other_sessions_deleted_on_password_change() {
        let (conn, user) = conn_with_user();
        let keep = create_session(&conn, user.id, 7).unwrap();
        create_session(&conn, user.id, 7).unwrap();
        create_session(&conn, user.id, 7).unwrap();

        let removed = delete_other_sessions(&conn, user.id, &keep.token).unwrap();
        assert_eq!(removed, 2);
        get_session_user(&conn, &keep.token).unwrap();
    }
}
