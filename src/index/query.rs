//! Query keyword extraction.

/// Tokens shorter than this many characters are dropped by default.
pub const DEFAULT_MIN_KEYWORD_LEN: usize = 4;

/// Rules for turning a query string into keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordPolicy {
    /// Minimum keyword length in characters.
    pub min_len: usize,
}

impl Default for KeywordPolicy {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_MIN_KEYWORD_LEN,
        }
    }
}

impl KeywordPolicy {
    pub fn with_min_len(min_len: usize) -> Self {
        Self { min_len }
    }
}

/// Lower-cased keywords extracted from a query, in query order.
///
/// Duplicates are kept: a keyword given twice counts twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerms {
    terms: Vec<String>,
}

impl QueryTerms {
    /// Split on whitespace, lower-case, and drop short tokens.
    pub fn parse(query: &str, policy: &KeywordPolicy) -> Self {
        let terms = query
            .split_whitespace()
            .map(str::to_lowercase)
            .filter(|t| t.chars().count() >= policy.min_len.max(1))
            .collect();
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    /// Total non-overlapping occurrences of every term in `lowered_text`.
    ///
    /// `lowered_text` must already be lower-cased.
    pub fn score(&self, lowered_text: &str) -> u32 {
        self.terms
            .iter()
            .map(|term| lowered_text.matches(term.as_str()).count() as u32)
            .sum()
    }
}
