//! Embedded SQL migration runner.
//!
//! Each migration is a SQL file compiled into the binary and applied at
//! most once, inside its own transaction, with the applied set tracked
//! in `_textlens_migrations`.

use rusqlite::Connection;
use std::collections::HashSet;
use thiserror::Error;

/// A single embedded migration.
struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. New migrations are appended here.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "000_users",
        sql: include_str!("migrations/000_users.sql"),
    },
    Migration {
        name: "001_sessions",
        sql: include_str!("migrations/001_sessions.sql"),
    },
    Migration {
        name: "002_analyses",
        sql: include_str!("migrations/002_analyses.sql"),
    },
    Migration {
        name: "003_favorites",
        sql: include_str!("migrations/003_favorites.sql"),
    },
    Migration {
        name: "004_history",
        sql: include_str!("migrations/004_history.sql"),
    },
];

/// Errors that can occur during migration execution.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A SQL statement within a migration failed.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        /// The name of the migration that failed.
        name: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// Failed to query migration state.
    #[error("failed to check migration state: {0}")]
    StateQuery(rusqlite::Error),
}

/// Brings the schema up to date, returning how many migrations ran.
///
/// Already-applied migrations are skipped; pending ones run in
/// declaration order, each in its own transaction, so a failure leaves
/// every earlier migration committed and the failing one fully rolled
/// back.
///
/// # Errors
///
/// Returns `MigrationError` naming the migration that failed, or
/// `StateQuery` if the tracking table cannot be read.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    run_migrations_from_list(conn, MIGRATIONS)
}

fn failed(name: &str, source: rusqlite::Error) -> MigrationError {
    MigrationError::ExecutionFailed {
        name: name.to_string(),
        source,
    }
}

fn applied_names(conn: &Connection) -> Result<HashSet<String>, MigrationError> {
    let mut stmt = conn
        .prepare("SELECT name FROM _textlens_migrations")
        .map_err(MigrationError::StateQuery)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(MigrationError::StateQuery)?;

    let mut names = HashSet::new();
    for row in rows {
        names.insert(row.map_err(MigrationError::StateQuery)?);
    }
    Ok(names)
}

fn run_migrations_from_list(
    conn: &Connection,
    migrations: &[Migration],
) -> Result<usize, MigrationError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _textlens_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| failed("_textlens_migrations_bootstrap", e))?;

    let done = applied_names(conn)?;
    let mut applied = 0;

    for migration in migrations {
        if done.contains(migration.name) {
            tracing::debug!(migration = migration.name, "already applied");
            continue;
        }

        tracing::info!(migration = migration.name, "applying migration");

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| failed(migration.name, e))?;
        tx.execute_batch(migration.sql)
            .map_err(|e| failed(migration.name, e))?;
        tx.execute(
            "INSERT INTO _textlens_migrations (name) VALUES (?1)",
            [migration.name],
        )
        .map_err(|e| failed(migration.name, e))?;
        tx.commit().map_err(|e| failed(migration.name, e))?;

        applied += 1;
    }

    Ok(applied)
}
