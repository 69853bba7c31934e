//! elai-corpus
//!
//! Turns a directory of manuals (PDF, text, markdown) into an ordered list of
//! paragraph chunks. See `loader` for the load pass and `cache` for the
//! memoized variant keyed by the directory's file listing.
pub mod cache;
pub mod loader;
pub mod paragraph;
pub mod pdf;

pub use cache::{fingerprint, CachedCorpus, Fingerprint};
pub use loader::{load_corpus, CorpusLoader, LoaderOptions, SourceKind};
pub use pdf::PdfTextExtractor;
