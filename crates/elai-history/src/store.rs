use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use tracing::info;

use elai_core::types::{FailureRecord, ScoredMatch};
use elai_core::{Error, Result};
use elai_lexical::{LexicalRetriever, RetrievalParams};

use crate::{csv_error, missing_columns};

/// Failure-history records held in memory, in file order.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    path: PathBuf,
    records: Vec<FailureRecord>,
}

impl HistoryStore {
    /// Read the log at `path`. A missing file is an empty history. Any
    /// malformed row fails the whole read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match File::open(&path) {
            Ok(file) => parse_records(file, &path)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no failure history yet");
                Vec::new()
            }
            Err(e) => return Err(Error::io(&path, e)),
        };
        info!(path = %path.display(), records = records.len(), "failure history loaded");
        Ok(Self { path, records })
    }

    /// Parse records from any reader; `origin` only labels errors.
    pub fn from_reader(reader: impl Read, origin: &Path) -> Result<Self> {
        Ok(Self { path: origin.to_path_buf(), records: parse_records(reader, origin)? })
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn records(&self) -> &[FailureRecord] { &self.records }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// Records whose symptom resembles `query`, best first.
    pub fn related<'a>(&'a self, retriever: &LexicalRetriever, query: &str, params: &RetrievalParams) -> Vec<ScoredMatch<'a, FailureRecord>> {
        retriever.rank(query, &self.records, params)
    }
}

fn parse_records(reader: impl Read, path: &Path) -> Result<Vec<FailureRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).trim(Trim::All).from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|e| csv_error(path, 1, e))?
        .clone();
    if headers.is_empty() { return Ok(Vec::new()); }
    let missing = missing_columns(&headers);
    if !missing.is_empty() { return Err(Error::HistorySchema { path: path.to_path_buf(), missing }); }

    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<FailureRecord>().enumerate() {
        let record = result.map_err(|e| {
            let line = e.position().map_or(row as u64 + 2, csv::Position::line);
            csv_error(path, line, e)
        })?;
        records.push(record);
    }
    Ok(records)
}
