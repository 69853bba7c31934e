use std::path::Path;

use crate::types::{Chunk, FailureRecord, RetrievedContext};

/// Text the lexical retriever scores an item by.
pub trait Searchable {
    fn search_text(&self) -> &str;
}

impl Searchable for Chunk {
    fn search_text(&self) -> &str { self.text() }
}

/// History entries are matched on their symptom only.
impl Searchable for FailureRecord {
    fn search_text(&self) -> &str { &self.symptom }
}

/// Per-page text of a page-oriented document. A page without a text layer
/// comes back as an empty string, not as an error.
pub trait PageTextExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> anyhow::Result<Vec<String>>;
}

/// Image-based text recognition for pages that carry no text layer.
/// `page` is 1-based.
pub trait PageOcr: Send + Sync {
    fn recognize_page(&self, path: &Path, page: u32) -> anyhow::Result<String>;
}

/// Hosted text-generation service. How instructions, context and query are
/// rendered into a request is up to the implementation.
pub trait Generator: Send + Sync {
    fn generate(&self, system_instructions: &str, context: &RetrievedContext<'_>, query: &str) -> anyhow::Result<String>;
}
