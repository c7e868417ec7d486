//! Account and session management for the TextLens platform.
//!
//! Owns the `users` and `sessions` tables: registration, credential
//! verification, password hashing, session issuance and expiry, and the
//! request-level input validation shared by the auth endpoints.

mod password;
mod sessions;
mod users;
pub mod validate;

use thiserror::Error;

pub use password::{hash_password, verify_password};
pub use sessions::{
    create_session, delete_other_sessions, delete_session, get_session_user, prune_expired_sessions,
    Session,
};
pub use users::{
    create_user, get_user_by_email, get_user_by_id, increment_quota_used, update_password,
    verify_credentials, User,
};

/// Errors that can occur during account and session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An account with this email already exists.
    #[error("email already registered: {0}")]
    EmailTaken(String),

    /// No user matches the given identifier.
    #[error("user not found")]
    UserNotFound,

    /// Email/password pair did not match a stored credential.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session token is unknown or expired.
    #[error("session invalid or expired")]
    SessionInvalid,
}
