//! Lexical index over transcript chunks.
//!
//! Chunks are ranked by how often the query's keywords occur in them. This is
//! a plain term-frequency heuristic: no external model, fully deterministic.

mod lexical;
mod query;

pub use lexical::LexicalIndex;
pub use query::{KeywordPolicy, QueryTerms, DEFAULT_MIN_KEYWORD_LEN};

use crate::chunking::TranscriptChunk;
use serde::Serialize;

/// A chunk with its relevance to one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredChunk {
    /// The matched chunk.
    pub chunk: TranscriptChunk,
    /// Keyword occurrence count (higher is better).
    pub score: u32,
}

impl ScoredChunk {
    pub fn ordinal(&self) -> usize {
        self.chunk.ordinal
    }

    pub fn text(&self) -> &str {
        &self.chunk.text
    }
}
