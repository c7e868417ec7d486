//! Shared types and constants for the TextLens platform.
//!
//! This crate provides the foundational types used across all TextLens
//! crates: the history action vocabulary, analysis kinds for AI-assisted
//! analysis, record status/source markers, and the pagination envelope
//! shared by list endpoints.
//!
//! No crate in the workspace depends on anything *except* `textlens-types`
//! for cross-cutting type definitions. This keeps the dependency graph
//! clean and prevents circular dependencies.

use serde::{Deserialize, Serialize};

/// Actions recorded in the per-user history log.
///
/// Serialized as `snake_case` strings both in the database and on the
/// wire, so the stored value and the API filter parameter are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// A single text analysis.
    Analyze,
    /// A batch text analysis.
    BatchAnalyze,
    /// An AI-assisted analysis.
    AiAnalyze,
    /// An analysis was favorited.
    FavoriteAdd,
    /// A favorite was removed.
    FavoriteRemove,
    /// User logged in.
    Login,
    /// User logged out.
    Logout,
    /// Account registration.
    Register,
    /// Password change.
    PasswordChange,
}

impl HistoryAction {
    /// Returns the stable string form used in the database and API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::BatchAnalyze => "batch_analyze",
            Self::AiAnalyze => "ai_analyze",
            Self::FavoriteAdd => "favorite_add",
            Self::FavoriteRemove => "favorite_remove",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Register => "register",
            Self::PasswordChange => "password_change",
        }
    }

    /// Attempts to parse a stored action string.
    ///
    /// Returns `None` for unknown strings so callers can fall back to the
    /// raw value instead of failing the whole listing.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "analyze" => Some(Self::Analyze),
            "batch_analyze" => Some(Self::BatchAnalyze),
            "ai_analyze" => Some(Self::AiAnalyze),
            "favorite_add" => Some(Self::FavoriteAdd),
            "favorite_remove" => Some(Self::FavoriteRemove),
            "login" => Some(Self::Login),
            "logout" => Some(Self::Logout),
            "register" => Some(Self::Register),
            "password_change" => Some(Self::PasswordChange),
            _ => None,
        }
    }

    /// Human-readable display label for the history view.
    pub fn label(self) -> &'static str {
        match self {
            Self::Analyze => "Text analysis",
            Self::BatchAnalyze => "Batch analysis",
            Self::AiAnalyze => "AI analysis",
            Self::FavoriteAdd => "Favorite added",
            Self::FavoriteRemove => "Favorite removed",
            Self::Login => "Logged in",
            Self::Logout => "Logged out",
            Self::Register => "Account registered",
            Self::PasswordChange => "Password changed",
        }
    }
}

/// Kinds of AI-assisted analysis, each mapped to a prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// General content analysis.
    General,
    /// Sentiment classification.
    Sentiment,
    /// Text summarization.
    Summary,
    /// Keyword extraction.
    Keywords,
    /// Translation to English.
    Translation,
    /// Code review.
    CodeReview,
}

impl AnalysisKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Sentiment => "sentiment",
            Self::Summary => "summary",
            Self::Keywords => "keywords",
            Self::Translation => "translation",
            Self::CodeReview => "code_review",
        }
    }

    /// Attempts to parse a kind string from an API request.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "general" => Some(Self::General),
            "sentiment" => Some(Self::Sentiment),
            "summary" => Some(Self::Summary),
            "keywords" => Some(Self::Keywords),
            "translation" => Some(Self::Translation),
            "code_review" => Some(Self::CodeReview),
            _ => None,
        }
    }
}

/// Processing status of a stored analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// The analysis completed and its result is stored.
    Completed,
    /// The analysis failed; the record exists only for accounting.
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Origin of a stored analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    /// Single-text analysis endpoint.
    Text,
    /// Batch analysis endpoint.
    Batch,
    /// AI-assisted analysis endpoint.
    Ai,
}

impl AnalysisSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Batch => "batch",
            Self::Ai => "ai",
        }
    }
}

/// Pagination envelope returned by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Total matching rows.
    pub total: u64,
    /// Total pages at this page size.
    pub total_pages: u64,
}

impl Pagination {
    /// Builds the envelope, rounding the page count up.
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }

    /// Row offset for this page.
    pub fn offset(self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_action_round_trips_through_str() {
        let actions = [
            HistoryAction::Analyze,
            HistoryAction::BatchAnalyze,
            HistoryAction::AiAnalyze,
            HistoryAction::FavoriteAdd,
            HistoryAction::FavoriteRemove,
            HistoryAction::Login,
            HistoryAction::Logout,
            HistoryAction::Register,
            HistoryAction::PasswordChange,
        ];
        for action in actions {
            assert_eq!(HistoryAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(HistoryAction::parse("unknown"), None);
    }

    #[test]
    fn history_action_serde_matches_as_str() {
        let json = serde_json::to_string(&HistoryAction::BatchAnalyze).unwrap();
        assert_eq!(json, "\"batch_analyze\"");
        let parsed: HistoryAction = serde_json::from_str("\"favorite_add\"").unwrap();
        assert_eq!(parsed, HistoryAction::FavoriteAdd);
    }

    #[test]
    fn analysis_kind_serde() {
        let parsed: AnalysisKind = serde_json::from_str("\"code_review\"").unwrap();
        assert_eq!(parsed, AnalysisKind::CodeReview);
        assert_eq!(parsed.as_str(), "code_review");
        assert_eq!(AnalysisKind::parse("code_review"), Some(parsed));
        assert_eq!(AnalysisKind::parse("haiku"), None);
    }

    #[test]
    fn pagination_rounds_up() {
        let p = Pagination::new(2, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset(), 10);
    }

    #[test]
    fn pagination_empty_result() {
        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset(), 0);
    }
}
