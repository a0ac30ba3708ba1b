//! Source normalization. The answer API has shipped several source shapes:
//! bare path strings and objects whose fields go by different names. All
//! accepted names live in [`ALIASES`]; everything funnels through
//! [`normalize`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A cited documentation fragment in its normalized shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub path: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

/// Field names accepted for each normalized field, in priority order.
pub struct SourceAliases {
    pub title: &'static [&'static str],
    pub path: &'static [&'static str],
    pub snippet: &'static [&'static str],
    pub relevance: &'static [&'static str],
}

pub const ALIASES: SourceAliases = SourceAliases {
    title: &["title", "name", "doc_title"],
    path: &["path", "url", "source", "file"],
    snippet: &["snippet", "text", "content", "excerpt"],
    relevance: &["relevance", "score"],
};

/// A source as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawSource {
    Path(String),
    Fields(Map<String, Value>),
    Other(Value),
}

impl From<Value> for RawSource {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => RawSource::Path(s),
            Value::Object(map) => RawSource::Fields(map),
            other => RawSource::Other(other),
        }
    }
}

fn placeholder_title(position: usize) -> String {
    format!("Source {}", position + 1)
}

fn first_text(fields: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match fields.get(*name) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    })
}

fn first_number(fields: &Map<String, Value>, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|name| match fields.get(*name) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Normalize one raw source. `position` is its zero-based index in the
/// answer, used for the `Source N` placeholder title. Never fails.
pub fn normalize(raw: &RawSource, position: usize) -> Source {
    match raw {
        RawSource::Path(path) => Source {
            title: placeholder_title(position),
            path: path.clone(),
            snippet: String::new(),
            relevance: None,
        },
        RawSource::Fields(fields) => Source {
            title: first_text(fields, ALIASES.title).unwrap_or_else(|| placeholder_title(position)),
            path: first_text(fields, ALIASES.path).unwrap_or_default(),
            snippet: first_text(fields, ALIASES.snippet).unwrap_or_default(),
            relevance: first_number(fields, ALIASES.relevance),
        },
        RawSource::Other(_) => Source {
            title: placeholder_title(position),
            ..Source::default()
        },
    }
}

/// Normalize a whole source list, keeping order.
pub fn normalize_all(raw: &[RawSource]) -> Vec<Source> {
    raw.iter()
        .enumerate()
        .map(|(i, r)| normalize(r, i))
        .collect()
}

/// `deserialize_with` helper: any JSON array of sources → `Vec<Source>`.
/// A missing or null list yields no sources.
pub fn deserialize_sources<'de, D>(deserializer: D) -> Result<Vec<Source>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<RawSource>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|r| normalize_all(&r)).unwrap_or_default())
}

/// Like [`deserialize_sources`] but keeps "no list" distinct from an empty one.
pub fn deserialize_optional_sources<'de, D>(deserializer: D) -> Result<Option<Vec<Source>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<RawSource>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|r| normalize_all(&r)))
}
