//! Stored analysis records.

use crate::RecordError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use textlens_types::{AnalysisSource, AnalysisStatus};
use uuid::Uuid;

/// How much of the analyzed content is persisted.
pub const STORED_CONTENT_CHARS: usize = 1000;

/// A stored analysis.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Analysis {
    /// Internal database ID.
    #[serde(skip)]
    pub id: i64,
    /// Internal owner row ID.
    #[serde(skip)]
    pub user_id: i64,
    /// Public UUID, serialized as `id`.
    #[serde(rename = "id")]
    pub analysis_id: String,
    /// Stored content excerpt (at most [`STORED_CONTENT_CHARS`] chars).
    pub content: String,
    /// The analysis report.
    pub result: serde_json::Value,
    pub status: AnalysisStatus,
    pub source: AnalysisSource,
    pub created_at: String,
}

/// The embedded form used inside favorite listings.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalysisSummary {
    pub id: String,
    pub content: String,
    pub result: serde_json::Value,
    pub created_at: String,
}

fn map_row_to_analysis(row: &Row) -> rusqlite::Result<Analysis> {
    let result_json: String = row.get(4)?;
    let result = serde_json::from_str(&result_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status_str: String = row.get(5)?;
    let status = AnalysisStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown analysis status: {status_str}").into(),
        )
    })?;
    let source_str: String = row.get(6)?;
    let source = match source_str.as_str() {
        "text" => AnalysisSource::Text,
        "batch" => AnalysisSource::Batch,
        "ai" => AnalysisSource::Ai,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                format!("unknown analysis source: {other}").into(),
            ))
        }
    };

    Ok(Analysis {
        id: row.get(0)?,
        user_id: row.get(1)?,
        analysis_id: row.get(2)?,
        content: row.get(3)?,
        result,
        status,
        source,
        created_at: row.get(7)?,
    })
}

const ANALYSIS_COLUMNS: &str =
    "id, user_id, analysis_id, content, result_json, status, source, created_at";

/// Truncates content to the stored excerpt length on a character boundary.
pub fn content_excerpt(content: &str) -> &str {
    match content.char_indices().nth(STORED_CONTENT_CHARS) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

/// Persists an analysis and returns the stored record.
pub fn create_analysis(
    conn: &Connection,
    user_id: i64,
    content: &str,
    result: &serde_json::Value,
    status: AnalysisStatus,
    source: AnalysisSource,
) -> Result<Analysis, RecordError> {
    let analysis_id = Uuid::new_v4().to_string();
    let result_json = serde_json::to_string(result)?;

    conn.execute(
        "INSERT INTO analyses (analysis_id, user_id, content, result_json, status, source)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            analysis_id,
            user_id,
            content_excerpt(content),
            result_json,
            status.as_str(),
            source.as_str(),
        ],
    )?;

    get_analysis(conn, &analysis_id)
}

/// Retrieves an analysis by its public UUID.
pub fn get_analysis(conn: &Connection, analysis_id: &str) -> Result<Analysis, RecordError> {
    conn.query_row(
        &format!("SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE analysis_id = ?1"),
        [analysis_id],
        map_row_to_analysis,
    )
    .optional()?
    .ok_or_else(|| RecordError::NotFound(analysis_id.to_string()))
}
