//! docs-qa: command-line front end for the documentation Q&A API.
//! Loads settings and history from the state file, runs one command, prints
//! the result to stdout. Errors go to stderr with a non-zero exit code.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use docs_qa_app::smoke::{self, RowStatus};
use docs_qa_app::view::{results_to_text, AnswerView};
use docs_qa_app::{resolve_state_path, App, SearchOutcome};
use docs_qa_client::{HistoryItem, SearchMode};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docs-qa", version, about = "Ask questions about your documentation")]
struct Cli {
    /// State file holding settings and history (default: ~/.docs-qa/state.json).
    #[arg(long, global = true)]
    state: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question. Reads the first line of stdin when no question is given.
    Ask {
        question: Vec<String>,
        /// fast, full, auto or search (default: from settings).
        #[arg(long)]
        mode: Option<SearchMode>,
        /// Print the answer as an HTML fragment.
        #[arg(long)]
        html: bool,
    },
    /// Ranked document search without answer generation.
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Check backend health.
    Health,
    /// Show query history.
    History {
        /// Fetch the server-side log instead of the local one.
        #[arg(long)]
        remote: bool,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Delete the local history.
        #[arg(long, conflicts_with = "remote")]
        clear: bool,
    },
    /// Show or change settings.
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// Run the smoke-test question set.
    Smoke {
        /// YAML file with `{id, query}` cases.
        #[arg(long)]
        cases: Option<PathBuf>,
        #[arg(long)]
        mode: Option<SearchMode>,
        /// Print rows as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Rate an answer from history (1-5).
    Rate {
        answer_id: String,
        stars: u8,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Print the API's OpenAPI schema.
    Openapi,
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    /// Keys: api_base_url, timeout_ms, default_mode, show_timings, show_debug, source_url_prefix.
    Set { key: String, value: String },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_question(words: &[String]) -> Result<String> {
    let question = if words.is_empty() {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read question from stdin")?;
        line
    } else {
        words.join(" ")
    };
    let question = question.trim().to_string();
    if question.is_empty() {
        bail!("no question provided (pass it as an argument or on stdin)");
    }
    Ok(question)
}

fn format_history_item(item: &HistoryItem) -> String {
    let when = DateTime::<Utc>::from_timestamp_millis(item.timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into());
    format!("{when}  [{}]  {}  ({})", item.mode, item.query, item.id)
}

async fn ask(app: &mut App, query: &str, mode: SearchMode, html: bool) -> Result<()> {
    let reply = app.ask(query, mode).await?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match reply.outcome {
        SearchOutcome::Answered(answer) => {
            let view = AnswerView::build(&answer, app.settings());
            let text = if html { view.to_html() } else { view.to_text() };
            write!(out, "{text}")?;
        }
        SearchOutcome::Found(results) => {
            write!(out, "{}", results_to_text(&results, app.settings()))?;
        }
        SearchOutcome::Failed(message) => bail!(message),
        SearchOutcome::Skipped => bail!("no question provided"),
        SearchOutcome::Superseded => bail!("query was superseded"),
    }
    out.flush()?;
    if app.settings().show_timings {
        eprintln!("Elapsed: {} ms", reply.elapsed_ms);
    }
    if let Some(id) = reply.history_id {
        eprintln!("Rate this answer: docs-qa rate {id} <1-5>");
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let state_path = resolve_state_path(cli.state.as_deref())?;
    let mut app = App::open(&state_path)
        .with_context(|| format!("failed to load state from {}", state_path.display()))?;

    match cli.command {
        Command::Ask { question, mode, html } => {
            let question = read_question(&question)?;
            let mode = mode.unwrap_or(app.settings().default_mode);
            ask(&mut app, &question, mode, html).await?;
        }
        Command::Search { query } => {
            ask(&mut app, &query.join(" "), SearchMode::Search, false).await?;
        }
        Command::Health => {
            let report = app.check_health().await;
            print!("{}", report.to_text());
            if report.error.is_some() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::History { remote, limit, clear } => {
            if clear {
                app.clear_history()?;
                println!("History cleared.");
            } else if remote {
                let history = app.refresh_remote_history(limit).await;
                if let Some(error) = history.error {
                    bail!(error);
                }
                for item in &history.items {
                    println!("{}", format_history_item(item));
                }
            } else if app.history().is_empty() {
                println!("No queries yet.");
            } else {
                for item in app.history().items().iter().take(limit as usize) {
                    println!("{}", format_history_item(item));
                }
            }
        }
        Command::Settings { action } => {
            let settings = match action {
                None | Some(SettingsAction::Show) => app.settings(),
                Some(SettingsAction::Set { key, value }) => app.set_setting(&key, &value)?,
            };
            println!("{}", serde_json::to_string_pretty(settings)?);
        }
        Command::Smoke { cases, mode, json } => {
            let cases = match cases {
                Some(path) => smoke::load_cases(&path)?,
                None => smoke::default_cases(),
            };
            let rows = app
                .run_smoke(&cases, mode, |row| {
                    if !json && matches!(row.status, RowStatus::Ok | RowStatus::Error) {
                        println!("{}", row.to_text());
                    }
                })
                .await;
            let (passed, failed) = smoke::summary(&rows);
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("{passed} passed, {failed} failed");
            }
            if failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Rate { answer_id, stars, comment } => {
            let rating = app.rate_answer(&answer_id, stars, &comment)?;
            println!("Saved rating {}/5 for {}", rating.rating, rating.answer_id);
        }
        Command::Openapi => {
            let schema = app.openapi().await?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
