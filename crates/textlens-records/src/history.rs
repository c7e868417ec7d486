//! Per-user action history.

use crate::RecordError;
use rusqlite::{params, Connection};
use serde::Serialize;
use textlens_types::HistoryAction;

/// A history entry as returned by the listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub action: String,
    /// Human-readable label; falls back to the raw action for unknown
    /// values so old rows never break the listing.
    pub action_label: String,
    pub details: serde_json::Value,
    pub created_at: String,
}

/// Filters for the history listing.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Exact action match.
    pub action: Option<String>,
    /// Inclusive start date, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive end date, `YYYY-MM-DD` (extended by one day in SQL).
    pub end_date: Option<String>,
}

/// Appends a history entry. Failures are the caller's business — most
/// handlers log and continue, since history is an audit trail, not a
/// transactional dependency.
pub fn record_history(
    conn: &Connection,
    user_id: i64,
    action: HistoryAction,
    details: &serde_json::Value,
) -> Result<(), RecordError> {
    let details_json = serde_json::to_string(details)?;
    conn.execute(
        "INSERT INTO history (user_id, action, details_json) VALUES (?1, ?2, ?3)",
        params![user_id, action.as_str(), details_json],
    )?;
    Ok(())
}

/// Lists a user's history, newest first, applying the filter. Returns
/// the page plus the total count of matching rows.
pub fn list_history(
    conn: &Connection,
    user_id: i64,
    filter: &HistoryFilter,
    offset: u64,
    limit: u32,
) -> Result<(Vec<HistoryEntry>, u64), RecordError> {
    let mut where_parts = vec!["user_id = ?1".to_string()];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(user_id)];
    let mut idx = 2usize;

    if let Some(action) = &filter.action {
        where_parts.push(format!("action = ?{idx}"));
        values.push(Box::new(action.clone()));
        idx += 1;
    }
    if let Some(start) = &filter.start_date {
        where_parts.push(format!("created_at >= datetime(?{idx})"));
        values.push(Box::new(start.clone()));
        idx += 1;
    }
    if let Some(end) = &filter.end_date {
        // Extend by one day so the end date itself is included.
        where_parts.push(format!("created_at < datetime(?{idx}, '+1 day')"));
        values.push(Box::new(end.clone()));
        idx += 1;
    }

    let where_clause = where_parts.join(" AND ");
    let sql_params: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();

    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM history WHERE {where_clause}"),
        sql_params.as_slice(),
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT id, action, details_json, created_at FROM history
         WHERE {where_clause}
         ORDER BY created_at DESC, id DESC
         LIMIT ?{idx} OFFSET ?{}",
        idx + 1
    );
    let mut values = values;
    values.push(Box::new(limit));
    values.push(Box::new(offset as i64));
    let sql_params: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(sql_params.as_slice(), |row| {
        let action: String = row.get(1)?;
        let details_json: String = row.get(2)?;
        let details = serde_json::from_str(&details_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let action_label = HistoryAction::parse(&action)
            .map(|a| a.label().to_string())
            .unwrap_or_else(|| action.clone());
        Ok(HistoryEntry {
            id: row.get(0)?,
            action,
            action_label,
            details,
            created_at: row.get(3)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok((entries, total))
}

/// Clears a user's history — all of it, or one action's records.
///
/// Returns the number of rows deleted.
pub fn clear_history(
    conn: &Connection,
    user_id: i64,
    action: Option<&str>,
) -> Result<usize, RecordError> {
    let deleted = match action {
        Some(action) => conn.execute(
            "DELETE FROM history WHERE user_id = ?1 AND action = ?2",
            params![user_id, action],
        )?,
        None => conn.execute("DELETE FROM history WHERE user_id = ?1", [user_id])?,
    };
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conn_with_user() -> (Connection, i64) {
        let conn = Connection::open_in_memory().unwrap();
        textlens_db::run_migrations(&conn).unwrap();
        let user =
            textlens_auth::create_user(&conn, "hist@example.com", None, "password1").unwrap();
        (conn, user.id)
    }

    #[test]
    fn record_and_list_history() {
        let (conn, user_id) = conn_with_user();
        record_history(&conn, user_id, HistoryAction::Login, &json!({})).unwrap();
        record_history(
            &conn,
            user_id,
            HistoryAction::Analyze,
            &json!({"content_length": 42}),
        )
        .unwrap();

        let (entries, total) =
            list_history(&conn, user_id, &HistoryFilter::default(), 0, 20).unwrap();
        assert_eq!(total, 2);
        assert_eq!(entries.len(), 2);
        // Newest first.
        assert_eq!(entries[0].action, "analyze");
        assert_eq!(entries[0].action_label, "Text analysis");
        assert_eq!(entries[0].details["content_length"], 42);
        assert_eq!(entries[1].action, "login");
    }

    #[test]
    fn action_filter_applies() {
        let (conn, user_id) = conn_with_user();
        record_history(&conn, user_id, HistoryAction::Login, &json!({})).unwrap();
        record_history(&conn, user_id, HistoryAction::Analyze, &json!({})).unwrap();
        record_history(&conn, user_id, HistoryAction::Analyze, &json!({})).unwrap();

        let filter = HistoryFilter {
            action: Some("analyze".to_string()),
            ..Default::default()
        };
        let (entries, total) = list_history(&conn, user_id, &filter, 0, 20).unwrap();
        assert_eq!(total, 2);
        assert!(entries.iter().all(|e| e.action == "analyze"));
    }

    #[test]
    fn date_range_filter_applies() {
        let (conn, user_id) = conn_with_user();
        record_history(&conn, user_id, HistoryAction::Login, &json!({})).unwrap();
        conn.execute(
            "UPDATE history SET created_at = '2020-01-15 12:00:00'",
            [],
        )
        .unwrap();
        record_history(&conn, user_id, HistoryAction::Logout, &json!({})).unwrap();

        let filter = HistoryFilter {
            start_date: Some("2020-01-01".to_string()),
            end_date: Some("2020-01-15".to_string()),
            ..Default::default()
        };
        let (entries, total) = list_history(&conn, user_id, &filter, 0, 20).unwrap();
        assert_eq!(total, 1, "end date itself should be included");
        assert_eq!(entries[0].action, "login");
    }

    #[test]
    fn clear_all_and_by_action() {
        let (conn, user_id) = conn_with_user();
        record_history(&conn, user_id, HistoryAction::Login, &json!({})).unwrap();
        record_history(&conn, user_id, HistoryAction::Analyze, &json!({})).unwrap();
        record_history(&conn, user_id, HistoryAction::Analyze, &json!({})).unwrap();

        let removed = clear_history(&conn, user_id, Some("analyze")).unwrap();
        assert_eq!(removed, 2);

        let removed = clear_history(&conn, user_id, None).unwrap();
        assert_eq!(removed, 1);

        let (_, total) = list_history(&conn, user_id, &HistoryFilter::default(), 0, 20).unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn history_is_scoped_per_user() {
        let (conn, user_id) = conn_with_user();
        let other =
            textlens_auth::create_user(&conn, "other@example.com", None, "password1").unwrap();
        record_history(&conn, user_id, HistoryAction::Login, &json!({})).unwrap();

        let (_, total) = list_history(&conn, other.id, &HistoryFilter::default(), 0, 20).unwrap();
        assert_eq!(total, 0);
    }
}
