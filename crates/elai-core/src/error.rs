use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to extract PDF text from {}: {message}", path.display())]
    Pdf { path: PathBuf, message: String },

    #[error("OCR failed for {} page {page}: {message}", path.display())]
    Ocr { path: PathBuf, page: u32, message: String },

    #[error("Malformed failure-history row in {} (line {line}): {message}", path.display())]
    HistoryFormat { path: PathBuf, line: u64, message: String },

    #[error("Failure-history log {} is missing columns: {}", path.display(), missing.join(", "))]
    HistorySchema { path: PathBuf, missing: Vec<String> },

    #[error("Text generation failed: {0}")]
    Generation(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
