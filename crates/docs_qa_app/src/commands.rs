//! Application state and commands: settings, local history, ratings, and the
//! ask/health/smoke entry points used by the CLI.
//! Commands are plain methods on [`App`] so they can be tested without a terminal.

use std::path::PathBuf;

use chrono::Utc;
use docs_qa_client::store::{HISTORY_KEY, RATINGS_KEY, SETTINGS_KEY};
use docs_qa_client::{
    default_state_path, ApiClient, AppSettings, ConfigError, HistoryItem, HistoryLog, SearchMode,
    SettingsPatch, Store, StoreError,
};
use serde::{Deserialize, Serialize};

use crate::session::{SearchOutcome, SearchSession};
use crate::smoke::{self, SmokeCase, SmokeRow};
use crate::status::StatusReport;

/// Command error.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
    #[error("cannot determine state file path (set --state or DOCS_QA_STATE)")]
    NoStatePath,
}

/// Resolve the state file path from an explicit override, `DOCS_QA_STATE`, or the default.
pub fn resolve_state_path(override_path: Option<&str>) -> Result<PathBuf, AppError> {
    if let Some(p) = override_path {
        return Ok(PathBuf::from(p));
    }
    if let Ok(val) = std::env::var("DOCS_QA_STATE") {
        return Ok(PathBuf::from(val));
    }
    default_state_path().ok_or(AppError::NoStatePath)
}

/// User feedback on one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub answer_id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub timestamp: i64,
}

/// Remote history fetch result; a failure leaves `items` empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteHistory {
    pub items: Vec<HistoryItem>,
    pub error: Option<String>,
}

/// Result of [`App::ask`].
#[derive(Debug, Clone, PartialEq)]
pub struct AskReply {
    pub outcome: SearchOutcome,
    /// Id of the history entry recorded for a successful query.
    pub history_id: Option<String>,
    pub elapsed_ms: u64,
}

/// Settings, history and the API client built from the settings.
pub struct App {
    store: Store,
    settings: AppSettings,
    history: HistoryLog,
    client: ApiClient,
}

impl App {
    /// Load settings and history from the state file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let store = Store::open(path)?;
        let settings: AppSettings = store.get(SETTINGS_KEY).unwrap_or_default();
        let history = store
            .get::<Vec<HistoryItem>>(HISTORY_KEY)
            .map(HistoryLog::from_items)
            .unwrap_or_default();
        let client = ApiClient::new(settings.client_config());
        tracing::debug!(base_url = %settings.api_base_url, history = history.len(), "app state loaded");
        Ok(Self {
            store,
            settings,
            history,
            client,
        })
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Merge `patch` into the settings, persist them, and point the client at
    /// the new base URL and timeout.
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<&AppSettings, AppError> {
        self.settings.apply(patch);
        self.store.set(SETTINGS_KEY, &self.settings)?;
        self.client.set_config(self.settings.client_config());
        tracing::info!(base_url = %self.settings.api_base_url, timeout_ms = self.settings.timeout_ms, "settings updated");
        Ok(&self.settings)
    }

    /// `settings set KEY VALUE`.
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<&AppSettings, AppError> {
        let patch = SettingsPatch::from_key_value(key, value)?;
        self.update_settings(patch)
    }

    pub fn record_history(&mut self, item: HistoryItem) -> Result<(), AppError> {
        self.history.push(item);
        self.store.set(HISTORY_KEY, &self.history)?;
        Ok(())
    }

    pub fn clear_history(&mut self) -> Result<(), AppError> {
        self.history.clear();
        self.store.remove(HISTORY_KEY)?;
        Ok(())
    }

    /// Fetch the server-side query log.
    pub async fn refresh_remote_history(&self, limit: u32) -> RemoteHistory {
        match self.client.history(limit).await {
            Ok(response) => RemoteHistory {
                items: response.items,
                error: None,
            },
            Err(e) => RemoteHistory {
                items: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    pub fn rate_answer(&mut self, answer_id: &str, rating: u8, comment: &str) -> Result<Rating, AppError> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::InvalidRating(rating));
        }
        let entry = Rating {
            answer_id: answer_id.to_string(),
            rating,
            comment: comment.trim().to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };
        let mut ratings = self.ratings();
        ratings.push(entry.clone());
        self.store.set(RATINGS_KEY, &ratings)?;
        Ok(entry)
    }

    pub fn ratings(&self) -> Vec<Rating> {
        self.store.get(RATINGS_KEY).unwrap_or_default()
    }

    /// A fresh search session using the current client and default mode.
    pub fn session(&self) -> SearchSession {
        SearchSession::new(self.client.clone(), self.settings.default_mode)
    }

    /// Run one query and record it in history when it succeeds.
    pub async fn ask(&mut self, query: &str, mode: SearchMode) -> Result<AskReply, AppError> {
        let session = self.session();
        let outcome = session.search_for(query, mode).await;
        let elapsed_ms = session.elapsed_ms();

        let entry = match &outcome {
            SearchOutcome::Answered(answer) => {
                Some(HistoryItem::new(query.trim(), mode).with_answer(answer.answer.clone(), answer.sources.clone()))
            }
            SearchOutcome::Found(_) => Some(HistoryItem::new(query.trim(), mode)),
            _ => None,
        };
        let history_id = match entry {
            Some(item) => {
                let id = item.id.clone();
                self.record_history(item)?;
                Some(id)
            }
            None => None,
        };

        Ok(AskReply {
            outcome,
            history_id,
            elapsed_ms,
        })
    }

    pub async fn check_health(&self) -> StatusReport {
        StatusReport::check(&self.client).await
    }

    pub async fn openapi(&self) -> Result<serde_json::Value, docs_qa_client::ApiError> {
        self.client.openapi().await
    }

    /// Run the smoke cases in `mode` (defaults to the configured mode).
    pub async fn run_smoke<F>(&self, cases: &[SmokeCase], mode: Option<SearchMode>, on_update: F) -> Vec<SmokeRow>
    where
        F: FnMut(&SmokeRow),
    {
        let mode = smoke::smoke_mode(mode.unwrap_or(self.settings.default_mode));
        smoke::run(&self.client, cases, mode, on_update).await
    }
}
