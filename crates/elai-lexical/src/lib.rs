//! elai-lexical
//!
//! Set-overlap retrieval over chunk text. Every query scans the whole
//! collection without an index: fine for the hundreds to low thousands of
//! paragraphs a shelf of manuals produces, not meant for larger corpora.
pub mod retriever;
pub mod tokenize;

pub use retriever::{overlap, retrieve, similarity, LexicalRetriever, RetrievalParams};
pub use tokenize::{TokenSet, Tokenizer, HANGUL_SYLLABLES};
