use std::collections::HashSet;
use std::ops::RangeInclusive;

pub type TokenSet = HashSet<String>;

/// Precomposed Hangul syllables, the script of the manuals this was built for.
pub const HANGUL_SYLLABLES: RangeInclusive<char> = '가'..='힣';

/// Lowercases text and extracts maximal runs of word characters: ASCII
/// letters and digits plus any configured script ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenizer {
    scripts: Vec<RangeInclusive<char>>,
}

impl Default for Tokenizer {
    fn default() -> Self { Self { scripts: vec![HANGUL_SYLLABLES] } }
}

impl Tokenizer {
    pub fn ascii_only() -> Self { Self { scripts: Vec::new() } }

    /// Also treat `range` as word characters.
    #[must_use]
    pub fn with_script(mut self, range: RangeInclusive<char>) -> Self {
        self.scripts.push(range);
        self
    }

    fn is_word_char(&self, c: char) -> bool {
        c.is_ascii_alphanumeric() || self.scripts.iter().any(|r| r.contains(&c))
    }

    /// Tokens in order of appearance, duplicates included.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !self.is_word_char(c))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn token_set(&self, text: &str) -> TokenSet { self.tokens(text).into_iter().collect() }
}
