use std::env;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use elai_core::config::{expand_path, Config, Settings};
use elai_core::types::{Chunk, Corpus, ScoredMatch};
use elai_corpus::{CorpusLoader, LoaderOptions};
use elai_history::HistoryStore;
use elai_lexical::{LexicalRetriever, RetrievalParams};

#[derive(Parser)]
#[command(name = "elai", about = "Search equipment manuals and failure history", version)]
struct Cli {
    /// Manuals directory (overrides corpus.manuals_dir)
    #[arg(long, global = true)]
    manuals: Option<String>,

    /// Failure-history CSV (overrides history.path)
    #[arg(long, global = true)]
    history: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the manuals and list every chunk
    Chunks,

    /// Rank manual paragraphs against a query
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        min_score: Option<f64>,
    },

    /// Find past failures with a similar symptom
    History {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        min_score: Option<f64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "elai=debug,elai_corpus=debug,elai_history=debug" } else { "elai=info,elai_corpus=info,elai_history=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let settings = Config::load()?.settings().context("loading configuration")?;
    let base = env::current_dir()?;
    let manuals_dir = cli.manuals.as_deref().map_or_else(|| settings.manuals_dir(&base), expand_path);
    let history_path = cli.history.as_deref().map_or_else(|| settings.history_path(&base), expand_path);
    let retriever = LexicalRetriever::default();

    match cli.command {
        Command::Chunks => {
            let corpus = load(&settings, manuals_dir);
            if cli.json { println!("{}", serde_json::to_string_pretty(&corpus)?); } else {
                for chunk in &corpus.chunks { println!("[{} p.{}] {}", chunk.source_id(), chunk.location(), chunk.text()); }
                println!("{} chunks, {} skipped", corpus.len(), corpus.failures.len());
            }
        }
        Command::Search { query, top_k, min_score } => {
            let corpus = load(&settings, manuals_dir);
            let params = RetrievalParams::new(top_k.unwrap_or(settings.retrieval.manual_top_k))
                .with_min_score(min_score.unwrap_or(settings.retrieval.manual_min_score));
            let hits = retriever.rank(&query, &corpus.chunks, &params);
            if cli.json { println!("{}", serde_json::to_string_pretty(&hits)?); } else { print_chunks(&hits); }
        }
        Command::History { query, top_k, min_score } => {
            let store = HistoryStore::open(&history_path)?;
            let params = RetrievalParams::new(top_k.unwrap_or(settings.retrieval.history_top_k))
                .with_min_score(min_score.unwrap_or(settings.retrieval.history_min_score));
            let hits = store.related(&retriever, &query, &params);
            if cli.json { println!("{}", serde_json::to_string_pretty(&hits)?); } else {
                if hits.is_empty() { println!("No similar failures."); }
                for hit in &hits {
                    let r = hit.item;
                    println!("{:.3}  [{}] {} -> {}", hit.score, r.error_code, r.symptom, r.resolution);
                }
            }
        }
    }
    Ok(())
}

fn load(settings: &Settings, dir: PathBuf) -> Corpus {
    let corpus = CorpusLoader::new(LoaderOptions::from(&settings.corpus)).load(&dir);
    for failure in &corpus.failures {
        match failure.page {
            Some(page) => warn!(file = %failure.file.display(), page, error = %failure.error, "skipped page"),
            None => warn!(file = %failure.file.display(), error = %failure.error, "skipped file"),
        }
    }
    info!(dir = %dir.display(), chunks = corpus.len(), "manuals loaded");
    corpus
}

fn print_chunks(hits: &[ScoredMatch<'_, Chunk>]) {
    if hits.is_empty() { println!("No matching paragraphs."); }
    for (i, hit) in hits.iter().enumerate() {
        let chunk = hit.item;
        println!("{}. {:.3}  {} (page {})", i + 1, hit.score, chunk.source_id(), chunk.location());
        println!("   {}", chunk.text());
    }
}
