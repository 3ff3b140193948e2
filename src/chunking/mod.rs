//! Transcript chunking.
//!
//! Splits a plain-text transcript into overlapping, fixed-size fragments that
//! serve as the unit of retrieval.

mod splitter;

pub use splitter::{split, TextSplitter};

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default number of characters shared by consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Default distance (in characters) the splitter looks back for a clean break.
pub const DEFAULT_BOUNDARY_LOOKBACK: usize = 100;

/// An ordered fragment of the source transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Position in the split sequence (0-based, no gaps).
    pub ordinal: usize,
    /// Fragment content. Never empty.
    pub text: String,
}

impl TranscriptChunk {
    /// Create a new chunk.
    pub fn new(ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            text: text.into(),
        }
    }

    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Configuration for splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// How far back from the window end to search for a sentence or word break.
    pub boundary_lookback: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            boundary_lookback: DEFAULT_BOUNDARY_LOOKBACK,
        }
    }
}

impl ChunkingConfig {
    /// Create a config with the given size and overlap and the default lookback.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        }
    }

    /// Check that `chunk_size > 0` and `chunk_overlap < chunk_size`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.chunk_size == 0 {
            return Err(PipelineError::InvalidParameter(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(PipelineError::InvalidParameter(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Lookback actually used, capped so every window advances past the overlap.
    pub(crate) fn effective_lookback(&self) -> usize {
        self.boundary_lookback
            .min(self.chunk_size - self.chunk_overlap - 1)
    }
}
