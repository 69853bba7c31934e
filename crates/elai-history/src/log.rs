use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use tracing::debug;

use elai_core::types::FailureRecord;
use elai_core::{Error, Result};

use crate::{csv_error, missing_columns};

/// Append-only writer for the failure-history CSV.
///
/// Each record is serialized up front and written with a single `write_all`
/// on a file opened in append mode; appends from one process are serialized
/// by an internal lock. A new file gets the standard header row, an existing
/// file keeps its own column order.
pub struct HistoryLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into(), lock: Mutex::new(()) } }

    pub fn path(&self) -> &Path { &self.path }

    pub fn append(&self, record: &FailureRecord) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let io_err = |e: std::io::Error| Error::io(&self.path, e);

        let existing = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        let mut out: Vec<u8> = Vec::new();
        let columns: Vec<String> = if existing == 0 {
            FailureRecord::HEADERS.iter().map(|h| (*h).to_string()).collect()
        } else {
            let headers = read_headers(&self.path)?;
            let missing = missing_columns(&headers);
            if !missing.is_empty() { return Err(Error::HistorySchema { path: self.path.clone(), missing }); }
            if !ends_with_newline(&self.path).map_err(io_err)? { out.push(b'\n'); }
            headers.iter().map(str::to_string).collect()
        };

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
        if existing == 0 { writer.write_record(&columns).map_err(|e| io_err(e.into()))?; }
        writer
            .write_record(columns.iter().map(|h| record.column(h).unwrap_or_default()))
            .map_err(|e| io_err(e.into()))?;
        let bytes = writer.into_inner().map_err(|e| io_err(e.into_error()))?;

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.flush().map_err(io_err)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "failure history appended");
        Ok(())
    }
}

fn read_headers(path: &Path) -> Result<StringRecord> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(path, 1, e))?;
    let headers = reader
        .headers()
        .map_err(|e| csv_error(path, 1, e))?;
    Ok(headers.clone())
}

fn ends_with_newline(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    if file.seek(SeekFrom::End(0))? == 0 { return Ok(true); }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
