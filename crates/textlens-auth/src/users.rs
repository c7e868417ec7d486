//! User account records.

use crate::password::{hash_password, verify_password};
use crate::AuthError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

/// A user account as exposed by the API. Credential material never
/// leaves this module.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct User {
    /// Internal database ID.
    #[serde(skip)]
    pub id: i64,
    /// Public UUID.
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub api_quota_used: u32,
    pub api_quota_limit: u32,
    pub created_at: String,
    pub updated_at: String,
}

fn map_row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        avatar_url: row.get(4)?,
        api_quota_used: row.get(5)?,
        api_quota_limit: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const USER_COLUMNS: &str = "id, user_id, email, name, avatar_url,
    api_quota_used, api_quota_limit, created_at, updated_at";

/// Creates a new user account, hashing the password.
///
/// # Errors
///
/// Returns `AuthError::EmailTaken` if the email is already registered.
pub fn create_user(
    conn: &Connection,
    email: &str,
    name: Option<&str>,
    password: &str,
) -> Result<User, AuthError> {
    let user_id = Uuid::new_v4().to_string();
    let (hash, salt) = hash_password(password);

    conn.execute(
        "INSERT INTO users (user_id, email, name, password_hash, password_salt)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, email, name, hash, salt],
    )
    .map_err(|e| {
        if let rusqlite::Error::SqliteFailure(code, _) = &e {
            if code.code == rusqlite::ffi::ErrorCode::ConstraintViolation {
                return AuthError::EmailTaken(email.to_string());
            }
        }
        AuthError::Database(e)
    })?;

    get_user_by_email(conn, email)
}

/// Retrieves a user by email.
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<User, AuthError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        [email],
        map_row_to_user,
    )
    .optional()?
    .ok_or(AuthError::UserNotFound)
}

/// Retrieves a user by internal database ID.
pub fn get_user_by_id(conn: &Connection, id: i64) -> Result<User, AuthError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        map_row_to_user,
    )
    .optional()?
    .ok_or(AuthError::UserNotFound)
}

/// Verifies an email/password pair.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` for both unknown emails and
/// wrong passwords, so the response does not reveal which one failed.
pub fn verify_credentials(
    conn: &Connection,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    let row: Option<(i64, String, String)> = conn
        .query_row(
            "SELECT id, password_hash, password_salt FROM users WHERE email = ?1",
            [email],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let Some((id, hash, salt)) = row else {
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, &hash, &salt) {
        return Err(AuthError::InvalidCredentials);
    }

    get_user_by_id(conn, id)
}

/// Verifies the current password and replaces it with a new one.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the current password does
/// not match.
pub fn update_password(
    conn: &Connection,
    user_id: i64,
    current_password: &str,
    new_password: &str,
) -> Result<(), AuthError> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT password_hash, password_salt FROM users WHERE id = ?1",
            [user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((hash, salt)) = row else {
        return Err(AuthError::UserNotFound);
    };

    if !verify_password(current_password, &hash, &salt) {
        return Err(AuthError::InvalidCredentials);
    }

    let (new_hash, new_salt) = hash_password(new_password);
    conn.execute(
        "UPDATE users SET
            password_hash = ?1,
            password_salt = ?2,
            updated_at = datetime('now')
        WHERE id = ?3",
        params![new_hash, new_salt, user_id],
    )?;

    Ok(())
}

/// Increments the user's API quota usage counter.
pub fn increment_quota_used(conn: &Connection, user_id: i64) -> Result<(), AuthError> {
    let changed = conn.execute(
        "UPDATE users SET api_quota_used = api_quota_used + 1 WHERE id = ?1",
        [user_id],
    )?;
    if changed == 0 {
        return Err(AuthError::UserNotFound);
    }
    Ok(())
}
