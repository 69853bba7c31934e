//! Memoized corpus keyed by a fingerprint of the manuals directory.
//!
//! The fingerprint covers every eligible file's relative path, size and
//! modification time, so adding, removing or touching a manual triggers a
//! full reload on the next `get`. Nothing expires on a timer.
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::UNIX_EPOCH;

use tracing::debug;
use twox_hash::XxHash64;
use walkdir::WalkDir;

use elai_core::types::Corpus;

use crate::loader::{CorpusLoader, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

/// Hash of the eligible file listing under `dir`. A missing directory has a
/// stable fingerprint of its own.
pub fn fingerprint(dir: &Path) -> Fingerprint {
    let mut hasher = XxHash64::with_seed(0);
    dir.exists().hash(&mut hasher);
    let entries = WalkDir::new(dir).sort_by_file_name().into_iter().filter_map(Result::ok);
    for entry in entries.filter(|e| e.file_type().is_file() && SourceKind::of(e.path()).is_some()) {
        entry.path().strip_prefix(dir).unwrap_or(entry.path()).hash(&mut hasher);
        if let Ok(meta) = entry.metadata() {
            meta.len().hash(&mut hasher);
            if let Some(mtime) = meta.modified().ok().and_then(|t| t.duration_since(UNIX_EPOCH).ok()) {
                mtime.as_nanos().hash(&mut hasher);
            }
        }
    }
    Fingerprint(hasher.finish())
}

pub struct CachedCorpus {
    loader: CorpusLoader,
    dir: PathBuf,
    slot: Mutex<Option<(Fingerprint, Arc<Corpus>)>>,
}

impl CachedCorpus {
    pub fn new(loader: CorpusLoader, dir: impl Into<PathBuf>) -> Self {
        Self { loader, dir: dir.into(), slot: Mutex::new(None) }
    }

    pub fn dir(&self) -> &Path { &self.dir }

    /// The cached corpus if the directory is unchanged, otherwise a fresh load
    /// that replaces the cached one.
    pub fn get(&self) -> Arc<Corpus> {
        let current = fingerprint(&self.dir);
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached, corpus)) = slot.as_ref() {
            if *cached == current {
                debug!(dir = %self.dir.display(), "corpus cache hit");
                return Arc::clone(corpus);
            }
        }
        let corpus = Arc::new(self.loader.load(&self.dir));
        *slot = Some((current, Arc::clone(&corpus)));
        corpus
    }

    /// Drop the cached corpus; the next `get` reloads unconditionally.
    pub fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
