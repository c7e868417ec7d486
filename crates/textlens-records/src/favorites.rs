//! Favorites over stored analyses.

use crate::analyses::AnalysisSummary;
use crate::RecordError;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

/// A favorite as returned from a create operation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Favorite {
    /// Internal database ID.
    #[serde(skip)]
    pub id: i64,
    /// Public UUID, serialized as `id`.
    #[serde(rename = "id")]
    pub favorite_id: String,
    /// Public UUID of the favorited analysis.
    pub analysis_id: String,
    pub created_at: String,
}

/// A favorite with its analysis embedded, as returned by the listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FavoriteWithAnalysis {
    pub id: String,
    pub created_at: String,
    pub analysis: AnalysisSummary,
}

/// Adds a favorite for `(user, analysis)`.
///
/// `analysis_row_id` is the internal analysis ID — callers resolve and
/// authorize the analysis first.
///
/// # Errors
///
/// Returns `RecordError::Duplicate` if the analysis is already favorited
/// by this user.
pub fn add_favorite(
    conn: &Connection,
    user_id: i64,
    analysis_row_id: i64,
) -> Result<Favorite, RecordError> {
    let favorite_id = Uuid::new_v4().to_string();

    conn.execute(
        "INSERT INTO favorites (favorite_id, user_id, analysis_id) VALUES (?1, ?2, ?3)",
        params![favorite_id, user_id, analysis_row_id],
    )
    .map_err(|e| {
        if let rusqlite::Error::SqliteFailure(code, _) = &e {
            if code.code == rusqlite::ffi::ErrorCode::ConstraintViolation {
                return RecordError::Duplicate;
            }
        }
        RecordError::Database(e)
    })?;

    conn.query_row(
        "SELECT f.id, f.favorite_id, a.analysis_id, f.created_at
         FROM favorites f JOIN analyses a ON a.id = f.analysis_id
         WHERE f.favorite_id = ?1",
        [&favorite_id],
        |row| {
            Ok(Favorite {
                id: row.get(0)?,
                favorite_id: row.get(1)?,
                analysis_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .map_err(RecordError::Database)
}

/// Deletes a user's favorite by public UUID.
///
/// Returns the public analysis UUID of the removed favorite.
///
/// # Errors
///
/// Returns `RecordError::NotFound` if the favorite does not exist or
/// belongs to another user; the two cases are not distinguished.
pub fn delete_favorite(
    conn: &Connection,
    user_id: i64,
    favorite_id: &str,
) -> Result<String, RecordError> {
    let analysis_id: Option<String> = conn
        .query_row(
            "SELECT a.analysis_id
             FROM favorites f JOIN analyses a ON a.id = f.analysis_id
             WHERE f.favorite_id = ?1 AND f.user_id = ?2",
            params![favorite_id, user_id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(analysis_id) = analysis_id else {
        return Err(RecordError::NotFound(favorite_id.to_string()));
    };

    conn.execute(
        "DELETE FROM favorites WHERE favorite_id = ?1 AND user_id = ?2",
        params![favorite_id, user_id],
    )?;

    Ok(analysis_id)
}

/// Lists a user's favorites, newest first, with the referenced analysis
/// embedded. Returns the page plus the total favorite count.
pub fn list_favorites(
    conn: &Connection,
    user_id: i64,
    offset: u64,
    limit: u32,
) -> Result<(Vec<FavoriteWithAnalysis>, u64), RecordError> {
    let total: u64 = conn.query_row(
        "SELECT COUNT(*) FROM favorites WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT f.favorite_id, f.created_at,
                a.analysis_id, a.content, a.result_json, a.created_at
         FROM favorites f JOIN analyses a ON a.id = f.analysis_id
         WHERE f.user_id = ?1
         ORDER BY f.created_at DESC, f.id DESC
         LIMIT ?2 OFFSET ?3",
    )?;

    let rows = stmt.query_map(params![user_id, limit, offset], |row| {
        let result_json: String = row.get(4)?;
        let result = serde_json::from_str(&result_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(FavoriteWithAnalysis {
            id: row.get(0)?,
            created_at: row.get(1)?,
            analysis: AnalysisSummary {
                id: row.get(2)?,
                content: row.get(3)?,
                result,
                created_at: row.get(5)?,
            },
        })
    })?;

    let mut favorites = Vec::new();
    for row in rows {
        favorites.push(row?);
    }
    Ok((favorites, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyses::create_analysis;
    use serde_json::json;
    use textlens_types::{AnalysisSource, AnalysisStatus};

    fn setup() -> (Connection, i64, crate::Analysis) {
        let conn = Connection::open_in_memory().unwrap();
        textlens_db::run_migrations(&conn).unwrap();
        let user =
            textlens_auth::create_user(&conn, "fav@example.com", None, "password1").unwrap();
        let analysis = create_analysis(
            &conn,
            user.id,
            "favorite me",
            &json!({"summary": "s"}),
            AnalysisStatus::Completed,
            AnalysisSource::Text,
        )
        .unwrap();
        (conn, user.id, analysis)
    }

    #[test]
    fn add_list_delete_favorite() {
        let (conn, user_id, analysis) = setup();

        let favorite = add_favorite(&conn, user_id, analysis.id).unwrap();
        assert_eq!(favorite.analysis_id, analysis.analysis_id);

        let (listed, total) = list_favorites(&conn, user_id, 0, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].analysis.id, analysis.analysis_id);
        assert_eq!(listed[0].analysis.content, "favorite me");

        let removed_analysis = delete_favorite(&conn, user_id, &favorite.favorite_id).unwrap();
        assert_eq!(removed_analysis, analysis.analysis_id);

        let (listed, total) = list_favorites(&conn, user_id, 0, 10).unwrap();
        assert_eq!(total, 0);
        assert!(listed.is_empty());
    }

    #[test]
    fn duplicate_favorite_rejected() {
        let (conn, user_id, analysis) = setup();
        add_favorite(&conn, user_id, analysis.id).unwrap();
        assert!(matches!(
            add_favorite(&conn, user_id, analysis.id),
            Err(RecordError::Duplicate)
        ));
    }

    #[test]
    fn delete_foreign_favorite_not_found() {
        let (conn, user_id, analysis) = setup();
        let favorite = add_favorite(&conn, user_id, analysis.id).unwrap();

        let other =
            textlens_auth::create_user(&conn, "other@example.com", None, "password1").unwrap();
        assert!(matches!(
            delete_favorite(&conn, other.id, &favorite.favorite_id),
            Err(RecordError::NotFound(_))
        ));
    }

    #[test]
    fn listing_pages_newest_first() {
        let (conn, user_id, first) = setup();
        let second = create_analysis(
            &conn,
            user_id,
            "second",
            &json!({}),
            AnalysisStatus::Completed,
            AnalysisSource::Text,
        )
        .unwrap();

        add_favorite(&conn, user_id, first.id).unwrap();
        add_favorite(&conn, user_id, second.id).unwrap();

        let (page, total) = list_favorites(&conn, user_id, 0, 1).unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        // Same-second inserts fall back to rowid ordering: newest row first.
        assert_eq!(page[0].analysis.id, second.analysis_id);

        let (page2, _) = list_favorites(&conn, user_id, 1, 1).unwrap();
        assert_eq!(page2[0].analysis.id, first.analysis_id);
    }
}
