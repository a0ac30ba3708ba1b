//! Smoke harness: run a fixed list of questions through `/answer` and record
//! basic per-question metrics.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Instant;

use docs_qa_client::{AnswerMode, AnswerRequest, ApiClient, SearchMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmokeCase {
    pub id: String,
    pub query: String,
}

impl SmokeCase {
    pub fn new(id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
        }
    }
}

pub fn default_cases() -> Vec<SmokeCase> {
    vec![
        SmokeCase::new("q1", "How to get a list of infoblock elements with CIBlockElement::GetList?"),
        SmokeCase::new("q2", "How to create a user?"),
        SmokeCase::new("q3", "Where are smart processes configured?"),
        SmokeCase::new("q4", "How to make the first REST API request?"),
        SmokeCase::new("q5", "How to enable the iblock module?"),
    ]
}

/// Case file error.
#[derive(Debug, thiserror::Error)]
pub enum SmokeError {
    #[error("cannot read cases file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid cases file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("cases file {0} contains no cases")]
    Empty(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CaseFile {
    List(Vec<SmokeCase>),
    Wrapped { cases: Vec<SmokeCase> },
}

/// Load cases from YAML: either a bare list of `{id, query}` or `cases: [...]`.
pub fn load_cases(path: &Path) -> Result<Vec<SmokeCase>, SmokeError> {
    let display = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|source| SmokeError::Io {
        path: display.clone(),
        source,
    })?;
    let file: CaseFile = serde_yaml::from_str(&contents).map_err(|source| SmokeError::Yaml {
        path: display.clone(),
        source,
    })?;
    let cases = match file {
        CaseFile::List(cases) | CaseFile::Wrapped { cases } => cases,
    };
    if cases.is_empty() {
        return Err(SmokeError::Empty(display));
    }
    Ok(cases)
}

/// Smoke runs never use the search endpoint; search mode falls back to auto.
pub fn smoke_mode(mode: SearchMode) -> AnswerMode {
    mode.answer_mode().unwrap_or(AnswerMode::Auto)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Idle,
    Running,
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmokeRow {
    pub id: String,
    pub query: String,
    pub status: RowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<AnswerMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SmokeRow {
    fn idle(case: &SmokeCase) -> Self {
        Self {
            id: case.id.clone(),
            query: case.query.clone(),
            status: RowStatus::Idle,
            ms: None,
            mode: None,
            sources: None,
            error: None,
        }
    }

    pub fn to_text(&self) -> String {
        let marker = match self.status {
            RowStatus::Ok => "ok",
            RowStatus::Error => "FAIL",
            RowStatus::Running => "..",
            RowStatus::Idle => "--",
        };
        let mut line = format!("[{marker}] {} {}", self.id, self.query);
        if let Some(ms) = self.ms {
            let _ = write!(line, " | {ms} ms");
        }
        if let Some(mode) = self.mode {
            let _ = write!(line, " | mode: {mode}");
        }
        if let Some(n) = self.sources {
            let _ = write!(line, " | sources: {n}");
        }
        if let Some(e) = &self.error {
            let _ = write!(line, " | {e}");
        }
        line
    }
}

/// Run every case in order, one request at a time. `on_update` sees each row
/// as it starts and again when it finishes.
pub async fn run<F>(client: &ApiClient, cases: &[SmokeCase], mode: AnswerMode, mut on_update: F) -> Vec<SmokeRow>
where
    F: FnMut(&SmokeRow),
{
    let mut rows: Vec<SmokeRow> = cases.iter().map(SmokeRow::idle).collect();
    for row in &mut rows {
        row.status = RowStatus::Running;
        on_update(row);

        let started = Instant::now();
        let result = client
            .answer(&AnswerRequest::new(row.query.clone(), Some(mode)))
            .await;
        row.ms = Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
        match result {
            Ok(response) => {
                row.status = RowStatus::Ok;
                row.mode = Some(response.mode);
                row.sources = Some(response.sources.len());
            }
            Err(e) => {
                tracing::warn!(case = %row.id, error = %e, "smoke case failed");
                row.status = RowStatus::Error;
                row.error = Some(e.to_string());
            }
        }
        on_update(row);
    }
    rows
}

/// `(passed, failed)` counts.
pub fn summary(rows: &[SmokeRow]) -> (usize, usize) {
    let passed = rows.iter().filter(|r| r.status == RowStatus::Ok).count();
    let failed = rows.iter().filter(|r| r.status == RowStatus::Error).count();
    (passed, failed)
}
