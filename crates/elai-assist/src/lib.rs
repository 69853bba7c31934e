//! elai-assist
//!
//! Answers a fault question: retrieve manual paragraphs and similar past
//! failures, hand them to the injected generator, optionally log the
//! interaction. Per-session state lives in the caller's `Conversation`.
use std::path::Path;

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use elai_core::config::{RetrievalSettings, Settings};
use elai_core::traits::Generator;
use elai_core::types::{Corpus, FailureRecord, Location, RetrievedContext};
use elai_core::{Error, Result};
use elai_corpus::{CachedCorpus, CorpusLoader, LoaderOptions};
use elai_history::{HistoryLog, HistoryStore};
use elai_lexical::{LexicalRetriever, RetrievalParams};

/// Provenance of a manual paragraph used for an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub source_id: String,
    pub location: Location,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    /// Neither the manuals nor the history matched; the generator was not called.
    NoContext,
    Generated {
        text: String,
        sources: Vec<SourceRef>,
        related_failures: Vec<FailureRecord>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub question: String,
    pub answer: Answer,
}

/// Question/answer history of one user session, owned by the caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self { Self::default() }

    pub fn turns(&self) -> &[Turn] { &self.turns }

    pub fn last(&self) -> Option<&Turn> { self.turns.last() }

    pub fn is_empty(&self) -> bool { self.turns.is_empty() }

    pub fn clear(&mut self) { self.turns.clear(); }
}

pub struct Assistant<G> where G: Generator {
    manuals: CachedCorpus,
    history: HistoryStore,
    log: Option<HistoryLog>,
    retriever: LexicalRetriever,
    limits: RetrievalSettings,
    instructions: String,
    generator: G,
}

impl<G> Assistant<G> where G: Generator {
    pub fn new(manuals: CachedCorpus, history: HistoryStore, generator: G) -> Self {
        let settings = Settings::default();
        Self {
            manuals,
            history,
            log: None,
            retriever: LexicalRetriever::default(),
            limits: settings.retrieval,
            instructions: settings.assistant.system_instructions,
            generator,
        }
    }

    /// Wire everything from configuration. Relative paths resolve against `base_dir`.
    pub fn from_settings(settings: &Settings, base_dir: &Path, generator: G) -> Result<Self> {
        let loader = CorpusLoader::new(LoaderOptions::from(&settings.corpus));
        let manuals = CachedCorpus::new(loader, settings.manuals_dir(base_dir));
        let history_path = settings.history_path(base_dir);
        let history = HistoryStore::open(&history_path)?;
        let mut assistant = Self::new(manuals, history, generator)
            .with_limits(settings.retrieval.clone())
            .with_instructions(settings.assistant.system_instructions.clone());
        if settings.history.log_interactions { assistant = assistant.with_log(HistoryLog::new(history_path)); }
        Ok(assistant)
    }

    #[must_use]
    pub fn with_limits(mut self, limits: RetrievalSettings) -> Self { self.limits = limits; self }

    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self { self.instructions = instructions.into(); self }

    #[must_use]
    pub fn with_retriever(mut self, retriever: LexicalRetriever) -> Self { self.retriever = retriever; self }

    /// Append every generated answer to `log`.
    #[must_use]
    pub fn with_log(mut self, log: HistoryLog) -> Self { self.log = Some(log); self }

    pub fn manuals(&self) -> &CachedCorpus { &self.manuals }

    pub fn history(&self) -> &HistoryStore { &self.history }

    /// Manual chunks and history entries for `question`, each ranked with
    /// its own limits.
    pub fn context<'a>(&'a self, question: &str, corpus: &'a Corpus) -> RetrievedContext<'a> {
        let manual_params = RetrievalParams::new(self.limits.manual_top_k).with_min_score(self.limits.manual_min_score);
        let history_params = RetrievalParams::new(self.limits.history_top_k).with_min_score(self.limits.history_min_score);
        RetrievedContext {
            manual: self.retriever.rank(question, &corpus.chunks, &manual_params),
            history: self.history.related(&self.retriever, question, &history_params),
        }
    }

    /// Answer `question` and record the turn in `conversation`.
    ///
    /// No matching context is a normal outcome (`Answer::NoContext`). A
    /// generator failure is returned as `Error::Generation` and leaves the
    /// conversation untouched. A failed interaction-log append is only logged.
    pub fn ask(&self, question: &str, conversation: &mut Conversation) -> Result<Answer> {
        let corpus = self.manuals.get();
        let context = self.context(question, &corpus);
        let answer = if context.is_empty() {
            info!(question, "no manual or history context matched");
            Answer::NoContext
        } else {
            let text = self
                .generator
                .generate(&self.instructions, &context, question)
                .map_err(|e| Error::Generation(format!("{e:#}")))?;
            info!(manual = context.manual.len(), history = context.history.len(), "answer generated");
            if let Some(log) = &self.log {
                let record = FailureRecord::interaction(Local::now().naive_local(), question, "", text.as_str());
                if let Err(e) = log.append(&record) {
                    warn!(path = %log.path().display(), error = %e, "interaction not logged");
                }
            }
            Answer::Generated {
                text,
                sources: context
                    .manual
                    .iter()
                    .map(|m| SourceRef { source_id: m.item.source_id().to_string(), location: m.item.location(), score: m.score })
                    .collect(),
                related_failures: context.history.iter().map(|m| m.item.clone()).collect(),
            }
        };
        conversation.turns.push(Turn { question: question.to_string(), answer: answer.clone() });
        Ok(answer)
    }
}
