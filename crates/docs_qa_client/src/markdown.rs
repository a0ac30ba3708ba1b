//! Markdown subset → HTML fragment for answer text.
//!
//! Rules run in a fixed order over the output of the previous rule: escaping,
//! fenced code, inline code, bold, italic, headers, lists, paragraphs, links.
//! Anything a rule does not match stays as escaped literal text.

use regex::{Captures, Regex};
use std::sync::OnceLock;

struct Rules {
    fenced_code: Regex,
    inline_code: Regex,
    bold: Regex,
    italic: Regex,
    h3: Regex,
    h2: Regex,
    h1: Regex,
    list_item: Regex,
    list_run: Regex,
    link: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        fenced_code: compile(r"```(\w+)?\n([\s\S]*?)```"),
        inline_code: compile(r"`([^`]+)`"),
        bold: compile(r"\*\*([^*]+)\*\*"),
        italic: compile(r"\*([^*]+)\*"),
        h3: compile(r"(?mR)^### (.+)$"),
        h2: compile(r"(?mR)^## (.+)$"),
        h1: compile(r"(?mR)^# (.+)$"),
        list_item: compile(r"(?mR)^- (.+)$"),
        list_run: compile(r"(?R)(?:<li>.*</li>\n?)+"),
        link: compile(r"\[([^\]]+)\]\(([^)]+)\)"),
    })
}

// Line rules use CRLF mode so a trailing `\r` stays outside the tag.
// Patterns are literals; a failure here is a programming error caught by the tests.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid markdown rule {pattern:?}: {e}"))
}

/// Escape the HTML metacharacters `&`, `<` and `>`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Returns true for `http://` and `https://` URLs, which are never prefixed.
pub fn is_absolute_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Resolve a link target against the documentation source root.
pub fn resolve_link(url: &str, link_prefix: &str) -> String {
    if is_absolute_url(url) {
        url.to_string()
    } else {
        format!("{link_prefix}{url}")
    }
}

/// Render answer Markdown to an HTML fragment. Relative link targets are
/// prefixed with `link_prefix`.
pub fn render(text: &str, link_prefix: &str) -> String {
    let rules = rules();

    let html = escape_html(text);
    let html = rules
        .fenced_code
        .replace_all(&html, "<pre><code>${2}</code></pre>");
    let html = rules.inline_code.replace_all(&html, "<code>${1}</code>");
    let html = rules.bold.replace_all(&html, "<strong>${1}</strong>");
    let html = rules.italic.replace_all(&html, "<em>${1}</em>");
    let html = rules.h3.replace_all(&html, "<h3>${1}</h3>");
    let html = rules.h2.replace_all(&html, "<h2>${1}</h2>");
    let html = rules.h1.replace_all(&html, "<h1>${1}</h1>");
    let html = rules.list_item.replace_all(&html, "<li>${1}</li>");
    let html = rules.list_run.replace_all(&html, "<ul>${0}</ul>");

    let html = format!("<p>{}</p>", html.replace("\n\n", "</p><p>"));
    let html = html.replace("<p></p>", "");

    rules
        .link
        .replace_all(&html, |caps: &Captures| {
            let href = resolve_link(&caps[2], link_prefix).replace('"', "&quot;");
            format!(
                r#"<a href="{href}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                &caps[1]
            )
        })
        .into_owned()
}
