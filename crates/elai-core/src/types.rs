//! Domain types shared by the loader, the retriever and the assistant.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Where inside its source document a chunk was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// 1-based page number of a page-oriented document.
    Page(u32),
    /// Plain text and markdown sources have no pages.
    NotApplicable,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Page(n) => write!(f, "{n}"),
            Location::NotApplicable => f.write_str("n/a"),
        }
    }
}

/// A paragraph of a source document that is independently retrievable.
///
/// - `source_id`: file name of the originating document (relative path for
///   files below the corpus root)
/// - `location`: page marker
/// - `text`: trimmed paragraph content, never blank
///
/// Chunks are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    source_id: String,
    location: Location,
    text: String,
}

impl Chunk {
    /// Builds a chunk from a paragraph, trimming it. Returns `None` when the
    /// paragraph is blank.
    pub fn new(source_id: impl Into<String>, location: Location, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() { return None; }
        Some(Self { source_id: source_id.into(), location, text: text.to_string() })
    }

    pub fn source_id(&self) -> &str { &self.source_id }

    pub fn location(&self) -> Location { self.location }

    pub fn text(&self) -> &str { &self.text }
}

/// A non-fatal problem met while loading one source file (or one page of it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub file: PathBuf,
    pub page: Option<u32>,
    pub error: String,
}

/// Result of one load pass: the chunks in load order plus the diagnostics
/// for everything that had to be skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Corpus {
    pub chunks: Vec<Chunk>,
    pub failures: Vec<LoadFailure>,
}

impl Corpus {
    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn len(&self) -> usize { self.chunks.len() }
}

/// An item paired with its similarity to a query. Higher is better, the
/// score is always in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredMatch<'a, T> {
    pub score: f64,
    pub item: &'a T,
}

/// One row of the failure-history log.
///
/// Column names follow the log written by the field tool; the English names
/// are accepted as aliases when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    #[serde(rename = "일시", alias = "timestamp", default, with = "timestamp_column")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(rename = "고장증상", alias = "symptom")]
    pub symptom: String,
    #[serde(rename = "에러코드", alias = "error_code")]
    pub error_code: String,
    #[serde(rename = "처리내용", alias = "resolution")]
    pub resolution: String,
}

impl FailureRecord {
    /// A record stamped with `at`, as logged after an answered question.
    pub fn interaction(at: NaiveDateTime, symptom: impl Into<String>, error_code: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self { timestamp: Some(at), symptom: symptom.into(), error_code: error_code.into(), resolution: resolution.into() }
    }

    /// Header row written when a new log is created, in column order.
    pub const HEADERS: [&'static str; 4] = ["일시", "고장증상", "에러코드", "처리내용"];

    /// Value of the named column, as it would be written to the log.
    pub fn column(&self, header: &str) -> Option<String> {
        match header {
            "일시" | "timestamp" => Some(
                self.timestamp.map(|ts| ts.format(timestamp_column::FORMAT).to_string()).unwrap_or_default(),
            ),
            "고장증상" | "symptom" => Some(self.symptom.clone()),
            "에러코드" | "error_code" => Some(self.error_code.clone()),
            "처리내용" | "resolution" => Some(self.resolution.clone()),
            _ => None,
        }
    }
}

/// Context retrieved for one question and handed to the generator.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext<'a> {
    pub manual: Vec<ScoredMatch<'a, Chunk>>,
    pub history: Vec<ScoredMatch<'a, FailureRecord>>,
}

impl RetrievedContext<'_> {
    pub fn is_empty(&self) -> bool { self.manual.is_empty() && self.history.is_empty() }
}

mod timestamp_column {
    use chrono::NaiveDateTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    const ACCEPTED: [&str; 3] = [FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => s.serialize_str(&ts.format(FORMAT).to_string()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        let Some(raw) = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else { return Ok(None) };
        ACCEPTED
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&raw, fmt).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("unrecognized timestamp '{raw}'")))
    }
}
