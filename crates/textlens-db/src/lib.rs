//! Database layer for the TextLens platform.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode
//! initialization, embedded SQL migrations, and runtime tunables. Every
//! table in TextLens is created through versioned migrations managed by
//! this crate.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: the service is single-node; WAL allows
//!   concurrent readers with a single writer, which matches the
//!   read-heavy access pattern of the API.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, ensuring migrations ship with the server and cannot
//!   drift from the code that depends on them.

mod migrations;
mod pool;

pub use migrations::run_migrations;
pub use pool::{create_pool, DbPool, DbRuntimeSettings};
