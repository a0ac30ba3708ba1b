//! Search session: one active query at a time, with live elapsed time.
//!
//! Starting a search clears the previous answer, results and error before the
//! request goes out. A response that lands after a newer search has started
//! is dropped. The elapsed-time ticker stops as soon as the active request
//! settles, whichever way it settles, or when its future is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use docs_qa_client::{AnswerRequest, AnswerResponse, ApiClient, SearchMode, SearchRequest, SearchResult};

/// Refresh period of the elapsed-time display.
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

/// Periodic callback on a background task; aborted when dropped.
pub struct ElapsedTicker {
    handle: tokio::task::JoinHandle<()>,
}

impl ElapsedTicker {
    /// Call `on_tick` with the time since start every `period`. Must be
    /// called from within a tokio runtime.
    pub fn start<F>(period: Duration, on_tick: F) -> Self
    where
        F: Fn(Duration) + Send + 'static,
    {
        let started = Instant::now();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                on_tick(started.elapsed());
            }
        });
        Self { handle }
    }
}

impl Drop for ElapsedTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// What a call to [`SearchSession::search`] ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The query was blank; nothing was sent.
    Skipped,
    /// A newer search started before this one settled; its result was dropped.
    Superseded,
    Answered(AnswerResponse),
    Found(Vec<SearchResult>),
    Failed(String),
}

/// Point-in-time copy of the session's displayable state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub query: String,
    pub mode: SearchMode,
    pub is_searching: bool,
    pub answer: Option<AnswerResponse>,
    pub results: Vec<SearchResult>,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

#[derive(Default)]
struct SessionState {
    view: SessionSnapshot,
    generation: u64,
    ticker: Option<ElapsedTicker>,
}

/// Settles one generation when dropped, so a search future cancelled
/// mid-request does not leave the session searching with a live ticker.
struct InFlight {
    state: Arc<Mutex<SessionState>>,
    generation: u64,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if state.generation == self.generation && state.view.is_searching {
            state.ticker = None;
            state.view.is_searching = false;
        }
    }
}

/// Request lifecycle for one search box.
#[derive(Clone)]
pub struct SearchSession {
    client: ApiClient,
    state: Arc<Mutex<SessionState>>,
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl SearchSession {
    pub fn new(client: ApiClient, mode: SearchMode) -> Self {
        let state = SessionState {
            view: SessionSnapshot {
                mode,
                ..SessionSnapshot::default()
            },
            ..SessionState::default()
        };
        Self {
            client,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.state).view.clone()
    }

    pub fn is_searching(&self) -> bool {
        lock(&self.state).view.is_searching
    }

    pub fn elapsed_ms(&self) -> u64 {
        lock(&self.state).view.elapsed_ms
    }

    /// True while an elapsed-time ticker is running.
    pub fn ticker_running(&self) -> bool {
        lock(&self.state).ticker.is_some()
    }

    pub fn set_query(&self, query: impl Into<String>) {
        lock(&self.state).view.query = query.into();
    }

    pub fn set_mode(&self, mode: SearchMode) {
        lock(&self.state).view.mode = mode;
    }

    /// Set query and mode, then search.
    pub async fn search_for(&self, query: &str, mode: SearchMode) -> SearchOutcome {
        {
            let mut state = lock(&self.state);
            state.view.query = query.to_string();
            state.view.mode = mode;
        }
        self.search().await
    }

    /// Run the current query in the current mode.
    pub async fn search(&self) -> SearchOutcome {
        let (generation, query, mode, started) = {
            let mut state = lock(&self.state);
            let query = state.view.query.trim().to_string();
            if query.is_empty() {
                return SearchOutcome::Skipped;
            }

            state.generation += 1;
            let generation = state.generation;
            state.view.is_searching = true;
            state.view.answer = None;
            state.view.results.clear();
            state.view.error = None;
            state.view.elapsed_ms = 0;

            let shared = Arc::clone(&self.state);
            state.ticker = Some(ElapsedTicker::start(TICK_PERIOD, move |elapsed| {
                let mut state = lock(&shared);
                if state.generation == generation && state.view.is_searching {
                    state.view.elapsed_ms = millis(elapsed);
                }
            }));
            (generation, query, state.view.mode, Instant::now())
        };

        tracing::debug!(generation, %mode, "search started");
        let _in_flight = InFlight {
            state: Arc::clone(&self.state),
            generation,
        };
        let outcome = self.dispatch(&query, mode).await;

        let mut state = lock(&self.state);
        if state.generation != generation {
            tracing::debug!(generation, current = state.generation, "dropping stale search result");
            return SearchOutcome::Superseded;
        }
        state.ticker = None;
        state.view.elapsed_ms = millis(started.elapsed());
        state.view.is_searching = false;
        match &outcome {
            SearchOutcome::Answered(answer) => state.view.answer = Some(answer.clone()),
            SearchOutcome::Found(results) => state.view.results = results.clone(),
            SearchOutcome::Failed(message) => state.view.error = Some(message.clone()),
            SearchOutcome::Skipped | SearchOutcome::Superseded => {}
        }
        outcome
    }

    async fn dispatch(&self, query: &str, mode: SearchMode) -> SearchOutcome {
        let result = match mode.answer_mode() {
            Some(answer_mode) => self
                .client
                .answer(&AnswerRequest::new(query, Some(answer_mode)))
                .await
                .map(SearchOutcome::Answered),
            None => self
                .client
                .search(&SearchRequest::new(query))
                .await
                .map(SearchOutcome::Found),
        };
        result.unwrap_or_else(|e| SearchOutcome::Failed(e.to_string()))
    }

    /// Reset query, results, error and elapsed time. The mode is kept.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.view.query.clear();
        state.view.answer = None;
        state.view.results.clear();
        state.view.error = None;
        state.view.elapsed_ms = 0;
    }
}
