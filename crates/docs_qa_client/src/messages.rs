//! HTTP request and response bodies for the documentation Q&A API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::sources::{deserialize_sources, Source};

/// Answer strategy on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    Extractive,
    Llm,
    Search,
    Auto,
}

impl AnswerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerMode::Extractive => "extractive",
            AnswerMode::Llm => "llm",
            AnswerMode::Search => "search",
            AnswerMode::Auto => "auto",
        }
    }
}

impl std::fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnswerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extractive" => Ok(AnswerMode::Extractive),
            "llm" => Ok(AnswerMode::Llm),
            "search" => Ok(AnswerMode::Search),
            "auto" => Ok(AnswerMode::Auto),
            other => Err(format!("unknown answer mode: {other}")),
        }
    }
}

/// Client → server: `POST /answer`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<AnswerMode>,
}

impl AnswerRequest {
    pub fn new(query: impl Into<String>, mode: Option<AnswerMode>) -> Self {
        Self {
            query: query.into(),
            mode,
        }
    }
}

/// Optional narrowing of a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<String>>,
}

/// Client → server: `POST /search`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: None,
            limit: None,
        }
    }
}

/// Server-side timings in milliseconds. Missing values read as zero/None.
/// `total_ms` is read as `total`; `total` wins when both are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireTimings")]
pub struct TimingsMs {
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<f64>,
}

#[derive(Deserialize)]
struct WireTimings {
    #[serde(default)]
    total: Option<f64>,
    #[serde(default)]
    total_ms: Option<f64>,
    #[serde(default)]
    retrieval: Option<f64>,
    #[serde(default)]
    generation: Option<f64>,
    #[serde(default)]
    embedding: Option<f64>,
}

impl From<WireTimings> for TimingsMs {
    fn from(wire: WireTimings) -> Self {
        Self {
            total: wire.total.or(wire.total_ms).unwrap_or_default(),
            retrieval: wire.retrieval,
            generation: wire.generation,
            embedding: wire.embedding,
        }
    }
}

/// Server → client: generated answer with cited sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    #[serde(default, deserialize_with = "deserialize_sources")]
    pub sources: Vec<Source>,
    #[serde(default = "default_response_mode")]
    pub mode: AnswerMode,
    #[serde(default)]
    pub timings_ms: TimingsMs,
}

fn default_response_mode() -> AnswerMode {
    AnswerMode::Llm
}

/// One ranked document from `POST /search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<String>>,
}

/// `POST /search` answers either with a bare list or `{"results": [...]}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    List(Vec<SearchResult>),
    Wrapped {
        #[serde(default)]
        results: Vec<SearchResult>,
    },
}

impl SearchResponse {
    pub fn into_results(self) -> Vec<SearchResult> {
        match self {
            SearchResponse::List(results) | SearchResponse::Wrapped { results } => results,
        }
    }
}

/// Health of one backend dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Server → client: `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    /// `ok` and `healthy` both count as healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "healthy")
    }
}

/// Server → client: `GET /history`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub items: Vec<crate::history::HistoryItem>,
}
