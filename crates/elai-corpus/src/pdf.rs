use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use anyhow::anyhow;
use elai_core::traits::PageTextExtractor;

/// Text-layer extraction backed by `pdf-extract`, one string per page in
/// page order. Pages without a text layer come back empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PageTextExtractor for PdfTextExtractor {
    fn extract_pages(&self, path: &Path) -> anyhow::Result<Vec<String>> {
        // pdf-extract panics on some malformed documents
        catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_by_pages(path)))
            .map_err(|_| anyhow!("PDF parser panicked"))?
            .map_err(|e| anyhow!("{e}"))
    }
}
