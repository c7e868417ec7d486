//! Dashboard aggregation queries.
//!
//! Everything here is computed per user on demand. Each aggregate is a
//! straightforward query; `dashboard_data` bundles them into the shape
//! the dashboard endpoint returns.

use crate::RecordError;
use chrono::{Days, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;

/// Window for trend and growth figures, in days.
const TREND_WINDOW_DAYS: u64 = 30;

/// How many recent completed analyses feed the keyword ranking.
const KEYWORD_SAMPLE: u32 = 100;

/// Top-line counters.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_analyses: u64,
    pub total_favorites: u64,
    pub api_used: u32,
    pub api_limit: u32,
    /// Completed analyses as a percentage of all analyses, rounded.
    pub success_rate: u32,
    /// Share of analyses created in the trend window, rounded percent.
    pub analyses_growth: u32,
    /// Share of favorites created in the trend window, rounded percent.
    pub favorites_growth: u32,
}

/// One day in the analysis trend series.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TrendPoint {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub count: u64,
}

/// A ranked keyword.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: u64,
}

/// The full dashboard payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub trends: Vec<TrendPoint>,
    pub sources: HashMap<String, u64>,
    pub keywords: Vec<KeywordCount>,
}

fn count_where(conn: &Connection, sql: &str, user_id: i64) -> Result<u64, RecordError> {
    Ok(conn.query_row(sql, [user_id], |row| row.get(0))?)
}

fn percent(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        0
    } else {
        ((part as f64 / whole as f64) * 100.0).round() as u32
    }
}

/// Computes the full dashboard payload for a user.
pub fn dashboard_data(conn: &Connection, user_id: i64) -> Result<DashboardData, RecordError> {
    let total_analyses = count_where(
        conn,
        "SELECT COUNT(*) FROM analyses WHERE user_id = ?1",
        user_id,
    )?;
    let completed = count_where(
        conn,
        "SELECT COUNT(*) FROM analyses WHERE user_id = ?1 AND status = 'completed'",
        user_id,
    )?;
    let recent_analyses = count_where(
        conn,
        "SELECT COUNT(*) FROM analyses WHERE user_id = ?1 AND created_at >= datetime('now', '-30 days')",
        user_id,
    )?;

    let total_favorites = count_where(
        conn,
        "SELECT COUNT(*) FROM favorites WHERE user_id = ?1",
        user_id,
    )?;
    let recent_favorites = count_where(
        conn,
        "SELECT COUNT(*) FROM favorites WHERE user_id = ?1 AND created_at >= datetime('now', '-30 days')",
        user_id,
    )?;

    let quota: Option<(u32, u32)> = conn
        .query_row(
            "SELECT api_quota_used, api_quota_limit FROM users WHERE id = ?1",
            [user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (api_used, api_limit) = quota.unwrap_or((0, 100));

    Ok(DashboardData {
        stats: DashboardStats {
            total_analyses,
            total_favorites,
            api_used,
            api_limit,
            success_rate: percent(completed, total_analyses),
            analyses_growth: percent(recent_analyses, total_analyses),
            favorites_growth: percent(recent_favorites, total_favorites),
        },
        trends: analysis_trends(conn, user_id)?,
        sources: source_distribution(conn, user_id)?,
        keywords: hot_keywords(conn, user_id)?,
    })
}

/// Daily analysis counts for the trend window, zero-filled so the chart
/// always has exactly one point per day.
pub fn analysis_trends(conn: &Connection, user_id: i64) -> Result<Vec<TrendPoint>, RecordError> {
    let mut stmt = conn.prepare(
        "SELECT date(created_at), COUNT(*) FROM analyses
         WHERE user_id = ?1 AND created_at >= datetime('now', '-30 days')
         GROUP BY date(created_at)",
    )?;
    let rows = stmt.query_map([user_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
    })?;

    let mut by_day: HashMap<String, u64> = HashMap::new();
    for row in rows {
        let (date, count) = row?;
        by_day.insert(date, count);
    }

    let today = Utc::now().date_naive();
    let mut trends = Vec::with_capacity(TREND_WINDOW_DAYS as usize);
    for back in (0..TREND_WINDOW_DAYS).rev() {
        let date = today
            .checked_sub_days(Days::new(back))
            .unwrap_or(today)
            .format("%Y-%m-%d")
            .to_string();
        let count = by_day.get(&date).copied().unwrap_or(0);
        trends.push(TrendPoint { date, count });
    }
    Ok(trends)
}

/// Completed-analysis counts per source.
pub fn source_distribution(
    conn: &Connection,
    user_id: i64,
) -> Result<HashMap<String, u64>, RecordError> {
    let mut stmt = conn.prepare(
        "SELECT source, COUNT(*) FROM analyses
         WHERE user_id = ?1 AND status = 'completed'
         GROUP BY source",
    )?;
    let rows = stmt.query_map([user_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
    })?;

    let mut sources = HashMap::new();
    for row in rows {
        let (source, count) = row?;
        sources.insert(source, count);
    }
    Ok(sources)
}

/// Top keywords across the user's most recent completed analyses.
///
/// Keywords are read back from the stored reports rather than recomputed
/// from content — the stored excerpt may be truncated.
pub fn hot_keywords(conn: &Connection, user_id: i64) -> Result<Vec<KeywordCount>, RecordError> {
    let mut stmt = conn.prepare(
        "SELECT result_json FROM analyses
         WHERE user_id = ?1 AND status = 'completed'
         ORDER BY created_at DESC, id DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user_id, KEYWORD_SAMPLE], |row| {
        row.get::<_, String>(0)
    })?;

    let mut counts: HashMap<String, u64> = HashMap::new();
    for row in rows {
        let result_json = row?;
        let Ok(result) = serde_json::from_str::<serde_json::Value>(&result_json) else {
            continue;
        };
        let Some(keywords) = result.get("keywords").and_then(|k| k.as_array()) else {
            continue;
        };
        for keyword in keywords.iter().filter_map(|k| k.as_str()) {
            *counts.entry(keyword.to_string()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<KeywordCount> = counts
        .into_iter()
        .map(|(keyword, count)| KeywordCount { keyword, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keyword.cmp(&b.keyword)));
    ranked.truncate(10);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyses::create_analysis;
    use crate::favorites::add_favorite;
    use serde_json::json;
    use textlens_types::{AnalysisSource, AnalysisStatus};

    fn conn_with_user() -> (Connection, i64) {
        let conn = Connection::open_in_memory().unwrap();
        textlens_db::run_migrations(&conn).unwrap();
        let user =
            textlens_auth::create_user(&conn, "dash@example.com", None, "password1").unwrap();
        (conn, user.id)
    }

    #[test]
    fn empty_dashboard_is_all_zeroes() {
        let (conn, user_id) = conn_with_user();
        let data = dashboard_data(&conn, user_id).unwrap();
        assert_eq!(data.stats.total_analyses, 0);
        assert_eq!(data.stats.total_favorites, 0);
        assert_eq!(data.stats.success_rate, 0);
        assert_eq!(data.stats.api_limit, 100);
        assert_eq!(data.trends.len(), 30);
        assert!(data.trends.iter().all(|t| t.count == 0));
        assert!(data.sources.is_empty());
        assert!(data.keywords.is_empty());
    }

    #[test]
    fn stats_reflect_records() {
        let (conn, user_id) = conn_with_user();
        let a = create_analysis(
            &conn,
            user_id,
            "one",
            &json!({"keywords": ["rust", "tokio"]}),
            AnalysisStatus::Completed,
            AnalysisSource::Text,
        )
        .unwrap();
        create_analysis(
            &conn,
            user_id,
            "two",
            &json!({"keywords": ["rust"]}),
            AnalysisStatus::Completed,
            AnalysisSource::Ai,
        )
        .unwrap();
        create_analysis(
            &conn,
            user_id,
            "three",
            &json!({}),
            AnalysisStatus::Failed,
            AnalysisSource::Text,
        )
        .unwrap();
        add_favorite(&conn, user_id, a.id).unwrap();

        let data = dashboard_data(&conn, user_id).unwrap();
        assert_eq!(data.stats.total_analyses, 3);
        assert_eq!(data.stats.total_favorites, 1);
        assert_eq!(data.stats.success_rate, 67);
        assert_eq!(data.stats.analyses_growth, 100);
        assert_eq!(data.stats.favorites_growth, 100);

        assert_eq!(data.sources.get("text"), Some(&1));
        assert_eq!(data.sources.get("ai"), Some(&1));

        assert_eq!(data.keywords[0].keyword, "rust");
        assert_eq!(data.keywords[0].count, 2);
        assert_eq!(data.keywords[1].keyword, "tokio");

        // Today's bucket carries all three analyses.
        assert_eq!(data.trends.last().unwrap().count, 3);
    }

    #[test]
    fn old_records_fall_out_of_growth_window() {
        let (conn, user_id) = conn_with_user();
        create_analysis(
            &conn,
            user_id,
            "old",
            &json!({}),
            AnalysisStatus::Completed,
            AnalysisSource::Text,
        )
        .unwrap();
        conn.execute(
            "UPDATE analyses SET created_at = datetime('now', '-60 days')",
            [],
        )
        .unwrap();

        let data = dashboard_data(&conn, user_id).unwrap();
        assert_eq!(data.stats.total_analyses, 1);
        assert_eq!(data.stats.analyses_growth, 0);
        assert!(data.trends.iter().all(|t| t.count == 0));
    }
}
