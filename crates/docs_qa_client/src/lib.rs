//! Documentation Q&A client library (HTTP API, source normalization, answer
//! Markdown rendering, settings and persisted state).
//! Used by the `docs_qa_app` front end.

pub mod client;
pub mod config;
pub mod history;
pub mod markdown;
pub mod messages;
pub mod sources;
pub mod store;

pub use client::{ApiClient, ApiError};
pub use config::{default_state_path, AppSettings, ClientConfig, ConfigError, SettingsPatch};
pub use history::{HistoryItem, HistoryLog, SearchMode, HISTORY_LIMIT};
pub use messages::{
    AnswerMode, AnswerRequest, AnswerResponse, HealthStatus, HistoryResponse, SearchFilters,
    SearchRequest, SearchResult, ServiceStatus, TimingsMs,
};
pub use sources::{normalize, RawSource, Source};
pub use store::{Store, StoreError};
