//! Query history: most-recent-first, capped at [`HISTORY_LIMIT`] entries.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::sources::{deserialize_optional_sources, Source};

/// Retention cap for the local history log.
pub const HISTORY_LIMIT: usize = 50;

/// How the user asked: maps onto an API answer mode or the search endpoint.
/// Server-side logs may record the API spelling, so `extractive` and `llm`
/// are read as `fast` and `full`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[serde(alias = "extractive")]
    Fast,
    #[default]
    #[serde(alias = "llm")]
    Full,
    Auto,
    Search,
}

impl SearchMode {
    /// API answer mode, or `None` when the query goes to `/search`.
    pub fn answer_mode(self) -> Option<crate::AnswerMode> {
        match self {
            SearchMode::Fast => Some(crate::AnswerMode::Extractive),
            SearchMode::Full => Some(crate::AnswerMode::Llm),
            SearchMode::Auto => Some(crate::AnswerMode::Auto),
            SearchMode::Search => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Fast => "fast",
            SearchMode::Full => "full",
            SearchMode::Auto => "auto",
            SearchMode::Search => "search",
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(SearchMode::Fast),
            "full" => Ok(SearchMode::Full),
            "auto" => Ok(SearchMode::Auto),
            "search" => Ok(SearchMode::Search),
            other => Err(format!("unknown search mode: {other} (expected fast, full, auto or search)")),
        }
    }
}

/// One past query. `timestamp` is Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    #[serde(default)]
    pub id: String,
    pub query: String,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_sources",
        skip_serializing_if = "Option::is_none"
    )]
    pub sources: Option<Vec<Source>>,
}

impl HistoryItem {
    /// New entry stamped with a fresh id and the current time.
    pub fn new(query: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.into(),
            mode,
            timestamp: Utc::now().timestamp_millis(),
            answer: None,
            sources: None,
        }
    }

    pub fn with_answer(mut self, answer: impl Into<String>, sources: Vec<Source>) -> Self {
        self.answer = Some(answer.into());
        self.sources = Some(sources);
        self
    }
}

/// Append-only, capped history. Index 0 is the newest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    items: Vec<HistoryItem>,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryLog {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Rebuild from persisted entries, enforcing the cap.
    pub fn from_items(mut items: Vec<HistoryItem>) -> Self {
        items.truncate(HISTORY_LIMIT);
        Self { items }
    }

    /// Record an entry as the newest; the oldest entries past the cap drop off.
    pub fn push(&mut self, item: HistoryItem) {
        self.items.insert(0, item);
        self.items.truncate(HISTORY_LIMIT);
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
