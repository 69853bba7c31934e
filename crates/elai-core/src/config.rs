use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const DEFAULT_INSTRUCTIONS: &str = "You are a field support assistant for elevator technicians. \
Answer from the manual excerpts first, mark anything inferred from the failure history as a guess, \
and always end with a safety and responsibility notice.";

/// Where manuals live and how they are cut into chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    pub manuals_dir: String,
    /// Paragraphs from PDF pages must be longer than this many characters.
    pub page_min_chars: usize,
    /// Paragraphs from text/markdown files must be longer than this.
    pub text_min_chars: usize,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self { manuals_dir: "manuals".to_string(), page_min_chars: 40, text_min_chars: 30 }
    }
}

/// Ranking parameters. Manual chunks accept any positive overlap while
/// history entries need a stronger match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub manual_top_k: usize,
    pub manual_min_score: f64,
    pub history_top_k: usize,
    pub history_min_score: f64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { manual_top_k: 5, manual_min_score: 0.0, history_top_k: 3, history_min_score: 0.2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub path: String,
    /// Append every answered question to the log.
    pub log_interactions: bool,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { path: "failure_history.csv".to_string(), log_interactions: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub system_instructions: String,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self { system_instructions: DEFAULT_INSTRUCTIONS.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub corpus: CorpusSettings,
    pub retrieval: RetrievalSettings,
    pub history: HistorySettings,
    pub assistant: AssistantSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.corpus.manuals_dir.trim().is_empty() {
            return Err(Error::InvalidConfig("corpus.manuals_dir must not be empty".into()));
        }
        if self.history.path.trim().is_empty() {
            return Err(Error::InvalidConfig("history.path must not be empty".into()));
        }
        for (key, v) in [("retrieval.manual_min_score", self.retrieval.manual_min_score), ("retrieval.history_min_score", self.retrieval.history_min_score)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::InvalidConfig(format!("{key} must be within [0, 1], got {v}")));
            }
        }
        Ok(())
    }

    /// Manuals directory, expanded and resolved against `base`.
    pub fn manuals_dir(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.corpus.manuals_dir) }

    /// Failure-history CSV, expanded and resolved against `base`.
    pub fn history_path(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.history.path) }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Defaults, then `config.toml`, then `config.<env>.toml` for `RUST_ENV`
    /// (default `dev`), then `APP_*` variables with `__` as the section separator.
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// The whole typed configuration, validated.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string: leading `~` and `${VAR}` / `$VAR`.
/// Unknown variables leave the input untouched. The result is not canonicalized.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Expand `p` and join it onto `base` unless it is already absolute.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
