use tracing::debug;

use elai_core::traits::Searchable;
use elai_core::types::{Chunk, ScoredMatch};

use crate::tokenize::{TokenSet, Tokenizer};

/// `|a ∩ b| / sqrt(|a| · |b|)`: cosine similarity of binary membership
/// vectors. Zero when either set is empty, otherwise in `(0, 1]` for any overlap.
pub fn overlap(a: &TokenSet, b: &TokenSet) -> f64 {
    if a.is_empty() || b.is_empty() { return 0.0; }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let shared = small.iter().filter(|t| large.contains(*t)).count();
    shared as f64 / ((a.len() * b.len()) as f64).sqrt()
}

/// Similarity of two texts with the default tokenizer.
pub fn similarity(a: &str, b: &str) -> f64 {
    let t = Tokenizer::default();
    overlap(&t.token_set(a), &t.token_set(b))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalParams {
    /// Maximum number of results.
    pub top_k: usize,
    /// Scores below this are dropped. Zero scores are always dropped.
    pub min_score: f64,
}

impl Default for RetrievalParams {
    fn default() -> Self { Self { top_k: 5, min_score: 0.0 } }
}

impl RetrievalParams {
    pub fn new(top_k: usize) -> Self { Self { top_k, min_score: 0.0 } }

    #[must_use]
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct LexicalRetriever {
    tokenizer: Tokenizer,
}

impl LexicalRetriever {
    pub fn new(tokenizer: Tokenizer) -> Self { Self { tokenizer } }

    pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }

    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        overlap(&self.tokenizer.token_set(a), &self.tokenizer.token_set(b))
    }

    /// Score every item against `query` and return the best `top_k`, highest
    /// first. Equal scores keep the order of `items`.
    pub fn rank<'a, T: Searchable>(&self, query: &str, items: &'a [T], params: &RetrievalParams) -> Vec<ScoredMatch<'a, T>> {
        if params.top_k == 0 { return Vec::new(); }
        let query_tokens = self.tokenizer.token_set(query);
        if query_tokens.is_empty() { return Vec::new(); }

        let mut scored: Vec<ScoredMatch<'a, T>> = items
            .iter()
            .filter_map(|item| {
                let score = overlap(&query_tokens, &self.tokenizer.token_set(item.search_text()));
                (score > 0.0 && score >= params.min_score).then_some(ScoredMatch { score, item })
            })
            .collect();
        // stable: ties stay in load order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        debug!(candidates = items.len(), matched = scored.len(), top_k = params.top_k, "ranked");
        scored.truncate(params.top_k);
        scored
    }

    /// Like `rank`, without the scores.
    pub fn retrieve_chunks<'a>(&self, query: &str, chunks: &'a [Chunk], params: &RetrievalParams) -> Vec<&'a Chunk> {
        self.rank(query, chunks, params).into_iter().map(|m| m.item).collect()
    }
}

/// Rank `chunks` against `query` with the default tokenizer.
pub fn retrieve<'a>(query: &str, chunks: &'a [Chunk], top_k: usize, min_score: f64) -> Vec<ScoredMatch<'a, Chunk>> {
    LexicalRetriever::default().rank(query, chunks, &RetrievalParams { top_k, min_score })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> TokenSet { words.iter().map(|w| (*w).to_string()).collect() }

    #[test]
    fn overlap_matches_hand_computed_values() {
        assert!((overlap(&set(&["a", "b"]), &set(&["b", "c"])) - 0.5).abs() < 1e-12);
        let expected = 2.0 / 6.0_f64.sqrt();
        assert!((overlap(&set(&["a", "b"]), &set(&["a", "b", "c"])) - expected).abs() < 1e-12);
        assert!(overlap(&set(&["a"]), &set(&["b"])).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_side_scores_zero() {
        assert!(overlap(&set(&[]), &set(&["a"])).abs() < f64::EPSILON);
        assert!(similarity("", "door").abs() < f64::EPSILON);
        assert!(similarity("door", "!!!").abs() < f64::EPSILON);
    }

    #[test]
    fn zero_top_k_returns_nothing() {
        let chunks = vec![Chunk::new("a", elai_core::types::Location::NotApplicable, "door alarm").expect("chunk")];
        assert!(retrieve("door", &chunks, 0, 0.0).is_empty());
    }
}
