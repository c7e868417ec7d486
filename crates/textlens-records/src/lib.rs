//! Analysis, favorite, and history records for the TextLens platform.
//!
//! Implements the CRUD queries behind the analyze, favorites, and
//! history endpoints plus the dashboard aggregation queries. All
//! functions operate on a borrowed connection; handlers run them on
//! blocking tasks.

mod analyses;
mod dashboard;
mod favorites;
mod history;

use thiserror::Error;

pub use analyses::{create_analysis, get_analysis, Analysis, AnalysisSummary};
pub use dashboard::{
    dashboard_data, DashboardData, DashboardStats, KeywordCount, TrendPoint,
};
pub use favorites::{
    add_favorite, delete_favorite, list_favorites, Favorite, FavoriteWithAnalysis,
};
pub use history::{clear_history, list_history, record_history, HistoryEntry, HistoryFilter};

/// Errors that can occur during record operations.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No record matched the given identifier.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated (e.g. favoriting twice).
    #[error("record already exists")]
    Duplicate,

    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
