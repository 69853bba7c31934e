use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use elai_core::config::CorpusSettings;
use elai_core::traits::{PageOcr, PageTextExtractor};
use elai_core::types::{Chunk, Corpus, LoadFailure, Location};
use elai_core::{Error, Result};

use crate::paragraph::{normalize_newlines, split_paragraphs};
use crate::pdf::PdfTextExtractor;

/// How a source file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Page-oriented documents (PDF).
    Paged,
    /// Text and markdown, read as a single unit.
    Plain,
}

impl SourceKind {
    /// Classify by extension, case-insensitively. `None` means the file is ignored.
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Paged),
            "txt" | "md" | "markdown" => Some(Self::Plain),
            _ => None,
        }
    }
}

/// Minimum paragraph lengths, in characters. A paragraph is kept only when
/// it is strictly longer than the threshold for its source kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    pub page_min_chars: usize,
    pub text_min_chars: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self { Self { page_min_chars: 40, text_min_chars: 30 } }
}

impl From<&CorpusSettings> for LoaderOptions {
    fn from(s: &CorpusSettings) -> Self { Self { page_min_chars: s.page_min_chars, text_min_chars: s.text_min_chars } }
}

pub struct CorpusLoader {
    options: LoaderOptions,
    pages: Box<dyn PageTextExtractor>,
    ocr: Option<Box<dyn PageOcr>>,
}

impl Default for CorpusLoader {
    fn default() -> Self { Self::new(LoaderOptions::default()) }
}

impl CorpusLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options, pages: Box::new(PdfTextExtractor), ocr: None }
    }

    /// Replace the PDF text-layer extractor.
    #[must_use]
    pub fn with_page_extractor(mut self, extractor: impl PageTextExtractor + 'static) -> Self {
        self.pages = Box::new(extractor);
        self
    }

    /// Enable OCR for pages whose text layer is blank.
    #[must_use]
    pub fn with_ocr(mut self, ocr: impl PageOcr + 'static) -> Self {
        self.ocr = Some(Box::new(ocr));
        self
    }

    pub fn options(&self) -> &LoaderOptions { &self.options }

    /// Load every eligible file under `data_dir`.
    ///
    /// A missing or empty directory gives an empty corpus. Files that cannot
    /// be read are skipped and reported in `Corpus::failures`.
    pub fn load(&self, data_dir: &Path) -> Corpus {
        let mut corpus = Corpus::default();
        if !data_dir.exists() {
            info!(dir = %data_dir.display(), "corpus directory does not exist, nothing to load");
            return corpus;
        }
        let files = list_source_files(data_dir, &mut corpus.failures);
        for (file_index, (path, kind)) in files.iter().enumerate() {
            let source_id = source_id(data_dir, path);
            let before = corpus.chunks.len();
            let outcome = match kind {
                SourceKind::Paged => self.load_paged(path, &source_id, &mut corpus),
                SourceKind::Plain => self.load_plain(path, &source_id, &mut corpus.chunks),
            };
            match outcome {
                Ok(()) => debug!(file = %source_id, chunks = corpus.chunks.len() - before, "loaded {}/{}", file_index + 1, files.len()),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable source");
                    corpus.failures.push(LoadFailure { file: path.clone(), page: None, error: e.to_string() });
                }
            }
        }
        info!(files = files.len(), chunks = corpus.chunks.len(), failures = corpus.failures.len(), "corpus loaded from {}", data_dir.display());
        corpus
    }

    fn load_paged(&self, path: &Path, source_id: &str, corpus: &mut Corpus) -> Result<()> {
        let pages = self
            .pages
            .extract_pages(path)
            .map_err(|e| Error::Pdf { path: path.to_path_buf(), message: format!("{e:#}") })?;
        for (i, text) in pages.into_iter().enumerate() {
            let page = u32::try_from(i + 1).unwrap_or(u32::MAX);
            let text = if text.trim().is_empty() {
                let Some(ocr) = &self.ocr else { continue };
                match ocr.recognize_page(path, page) {
                    Ok(recognized) => recognized,
                    Err(e) => {
                        let err = Error::Ocr { path: path.to_path_buf(), page, message: format!("{e:#}") };
                        warn!(error = %err, "OCR fallback failed");
                        corpus.failures.push(LoadFailure { file: path.to_path_buf(), page: Some(page), error: err.to_string() });
                        continue;
                    }
                }
            } else {
                text
            };
            push_paragraphs(&mut corpus.chunks, source_id, Location::Page(page), &text, self.options.page_min_chars);
        }
        Ok(())
    }

    fn load_plain(&self, path: &Path, source_id: &str, chunks: &mut Vec<Chunk>) -> Result<()> {
        let content = read_file_content(path)?;
        push_paragraphs(chunks, source_id, Location::NotApplicable, &content, self.options.text_min_chars);
        Ok(())
    }
}

/// Load `data_dir` with default thresholds, the `pdf-extract` backend and no OCR.
pub fn load_corpus(data_dir: &Path) -> Corpus { CorpusLoader::default().load(data_dir) }

fn push_paragraphs(chunks: &mut Vec<Chunk>, source_id: &str, location: Location, raw: &str, min_chars: usize) {
    let text = normalize_newlines(raw);
    chunks.extend(split_paragraphs(&text, min_chars).into_iter().filter_map(|p| Chunk::new(source_id, location, p)));
}

fn read_file_content(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
}

fn source_id(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().into_owned(),
        _ => path.file_name().map_or_else(|| path.to_string_lossy().into_owned(), |n| n.to_string_lossy().into_owned()),
    }
}

/// Eligible files in deterministic order: walk sorted by file name.
pub(crate) fn list_source_files(root: &Path, failures: &mut Vec<LoadFailure>) -> Vec<(PathBuf, SourceKind)> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let file = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                warn!(file = %file.display(), error = %e, "cannot list corpus entry");
                failures.push(LoadFailure { file, page: None, error: e.to_string() });
                continue;
            }
        };
        if !entry.file_type().is_file() { continue; }
        if let Some(kind) = SourceKind::of(entry.path()) { files.push((entry.into_path(), kind)); }
    }
    files
}
