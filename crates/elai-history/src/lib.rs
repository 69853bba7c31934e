//! elai-history
//!
//! The failure-history log: a CSV of past symptoms, error codes and
//! resolutions. `HistoryStore` reads and searches it, `HistoryLog` appends
//! new interactions to it.
use std::path::Path;

use elai_core::Error;

pub mod log;
pub mod store;

pub use log::HistoryLog;
pub use store::HistoryStore;

/// Columns every log must have, by their written name and English alias.
pub(crate) const REQUIRED_COLUMNS: [(&str, &str); 3] =
    [("고장증상", "symptom"), ("에러코드", "error_code"), ("처리내용", "resolution")];

/// Required columns absent from `headers`, by written name.
pub(crate) fn missing_columns(headers: &csv::StringRecord) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|(name, alias)| !headers.iter().any(|h| h == *name || h == *alias))
        .map(|(name, _)| (*name).to_string())
        .collect()
}

/// Reader failures at `line`: I/O problems stay I/O errors, anything else
/// is a malformed log.
pub(crate) fn csv_error(path: &Path, line: u64, e: csv::Error) -> Error {
    let message = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(source) => Error::io(path, source),
        _ => Error::HistoryFormat { path: path.to_path_buf(), line, message },
    }
}
