//! Display models for answers and search results, rendered either as an HTML
//! fragment or as terminal text.

use std::fmt::Write as _;

use docs_qa_client::markdown::{escape_html, render, resolve_link};
use docs_qa_client::{AnswerMode, AnswerResponse, AppSettings, SearchResult};

pub fn mode_label(mode: AnswerMode) -> &'static str {
    match mode {
        AnswerMode::Extractive => "Fast mode",
        AnswerMode::Llm => "Full mode",
        AnswerMode::Search => "Search",
        AnswerMode::Auto => "Auto",
    }
}

pub fn sources_label(count: usize) -> String {
    format!("Sources ({count})")
}

/// One cited source as shown under the answer.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCard {
    /// 1-based position.
    pub index: usize,
    pub title: String,
    pub path: String,
    pub href: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimingLabel {
    pub label: &'static str,
    pub ms: f64,
}

/// Everything needed to show one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerView {
    pub markdown: String,
    pub html: String,
    pub mode_label: &'static str,
    pub sources_label: String,
    pub sources: Vec<SourceCard>,
    /// Empty unless timings are enabled in settings.
    pub timings: Vec<TimingLabel>,
    /// Raw response JSON, only with debug output enabled.
    pub debug: Option<String>,
}

impl AnswerView {
    pub fn build(answer: &AnswerResponse, settings: &AppSettings) -> Self {
        let prefix = settings.source_url_prefix.as_str();
        let sources = answer
            .sources
            .iter()
            .enumerate()
            .map(|(i, s)| SourceCard {
                index: i + 1,
                title: s.title.clone(),
                path: s.path.clone(),
                href: resolve_link(&s.path, prefix),
                snippet: s.snippet.clone(),
            })
            .collect();

        let timings = if settings.show_timings {
            let t = &answer.timings_ms;
            let mut labels = vec![TimingLabel {
                label: "Total",
                ms: t.total,
            }];
            for (label, value) in [
                ("Retrieval", t.retrieval),
                ("Generation", t.generation),
                ("Embedding", t.embedding),
            ] {
                if let Some(ms) = value.filter(|ms| *ms > 0.0) {
                    labels.push(TimingLabel { label, ms });
                }
            }
            labels
        } else {
            Vec::new()
        };

        let debug = if settings.show_debug {
            serde_json::to_string_pretty(answer).ok()
        } else {
            None
        };

        Self {
            markdown: answer.answer.clone(),
            html: render(&answer.answer, prefix),
            mode_label: mode_label(answer.mode),
            sources_label: sources_label(answer.sources.len()),
            sources,
            timings,
            debug,
        }
    }

    /// Source paths, one per line.
    pub fn copy_links(&self) -> String {
        self.sources
            .iter()
            .map(|s| s.path.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, r#"<section class="answer">"#);
        let _ = writeln!(out, "<header><h3>Answer</h3><p>{}</p></header>", self.mode_label);
        let _ = writeln!(out, r#"<div class="markdown-content">{}</div>"#, self.html);
        if !self.timings.is_empty() {
            let _ = writeln!(out, r#"<footer class="timings">{}</footer>"#, self.timing_line());
        }
        let _ = writeln!(out, "</section>");

        if !self.sources.is_empty() {
            let _ = writeln!(out, r#"<section class="sources">"#);
            let _ = writeln!(out, "<h4>{}</h4>", self.sources_label);
            let _ = writeln!(out, "<ol>");
            for s in &self.sources {
                let _ = write!(
                    out,
                    r#"<li><a href="{}" target="_blank" rel="noopener noreferrer">{}</a> <code>{}</code>"#,
                    escape_html(&s.href).replace('"', "&quot;"),
                    escape_html(&s.title),
                    escape_html(&s.path),
                );
                if !s.snippet.is_empty() {
                    let _ = write!(out, "<p>{}</p>", escape_html(&s.snippet));
                }
                let _ = writeln!(out, "</li>");
            }
            let _ = writeln!(out, "</ol>");
            let _ = writeln!(out, "</section>");
        }
        out
    }

    /// Terminal rendering: raw answer text, sources with resolved links, timings.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[{}]", self.mode_label);
        let _ = writeln!(out, "{}", self.markdown.trim_end());
        if !self.sources.is_empty() {
            let _ = writeln!(out, "\n{}:", self.sources_label);
            for s in &self.sources {
                let _ = writeln!(out, "  {}. {}  {}", s.index, s.title, s.href);
                if !s.snippet.is_empty() {
                    let _ = writeln!(out, "     {}", s.snippet);
                }
            }
        }
        if !self.timings.is_empty() {
            let _ = writeln!(out, "\n{}", self.timing_line());
        }
        if let Some(debug) = &self.debug {
            let _ = writeln!(out, "\n{debug}");
        }
        out
    }

    fn timing_line(&self) -> String {
        self.timings
            .iter()
            .map(|t| format!("{}: {}ms", t.label, t.ms))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Terminal rendering of `/search` results.
pub fn results_to_text(results: &[SearchResult], settings: &AppSettings) -> String {
    let mut out = String::new();
    if results.is_empty() {
        let _ = writeln!(out, "No results.");
        return out;
    }
    let _ = writeln!(out, "Results ({}):", results.len());
    for (i, r) in results.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} ({:.2})  {}",
            i + 1,
            r.title,
            r.score,
            resolve_link(&r.path, &settings.source_url_prefix)
        );
        if let Some(section) = &r.section {
            let _ = writeln!(out, "     section: {section}");
        }
        let excerpt: String = r.content.chars().take(200).collect();
        if !excerpt.is_empty() {
            let _ = writeln!(out, "     {}", excerpt.replace('\n', " "));
        }
    }
    out
}
