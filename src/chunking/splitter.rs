//! Overlapping character-window splitter.
//!
//! Walks the transcript in windows of `chunk_size` characters. A window ends
//! at a sentence break if one lies within the lookback distance, otherwise at
//! a word break, otherwise exactly at the size limit. The next window starts
//! `chunk_overlap` characters before the previous window's end, so removing
//! that many leading characters from every chunk after the first restores the
//! original text.

use super::{ChunkingConfig, TranscriptChunk};
use crate::error::PipelineError;
use tracing::debug;

/// Splits transcript text into overlapping chunks.
#[derive(Debug, Clone, Default)]
pub struct TextSplitter {
    config: ChunkingConfig,
}

impl TextSplitter {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split `text` into chunks with sequential ordinals starting at 0.
    pub fn split(&self, text: &str) -> Result<Vec<TranscriptChunk>, PipelineError> {
        self.config.validate()?;
        if text.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "cannot split empty text".to_string(),
            ));
        }

        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let lookback = self.config.effective_lookback();

        let mut chunks = Vec::with_capacity(total / self.step().max(1) + 1);
        let mut start = 0;

        loop {
            let hard_end = (start + self.config.chunk_size).min(total);
            let end = find_break(&chars, hard_end, lookback);

            chunks.push(TranscriptChunk::new(
                chunks.len(),
                chars[start..end].iter().collect::<String>(),
            ));

            if end == total {
                break;
            }
            // `find_break` never retreats more than `lookback`, which keeps
            // `end - overlap` strictly ahead of `start`.
            start = end - self.config.chunk_overlap;
        }

        debug!(
            "Split {} characters into {} chunks (size {}, overlap {})",
            total,
            chunks.len(),
            self.config.chunk_size,
            self.config.chunk_overlap
        );

        Ok(chunks)
    }

    fn step(&self) -> usize {
        self.config.chunk_size - self.config.chunk_overlap.min(self.config.chunk_size)
    }
}

/// Split `text` with the given size and overlap and the default lookback.
pub fn split(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<TranscriptChunk>, PipelineError> {
    TextSplitter::new(ChunkingConfig::new(chunk_size, overlap)).split(text)
}

/// Pick the end (exclusive) of a window whose hard limit is `hard_end`.
fn find_break(chars: &[char], hard_end: usize, lookback: usize) -> usize {
    if hard_end == chars.len() {
        return hard_end;
    }

    let floor = hard_end - lookback;

    // Sentence terminator followed by whitespace.
    for end in (floor..=hard_end).rev() {
        if end >= 2 && chars[end - 1].is_whitespace() && is_sentence_end(chars[end - 2]) {
            return end;
        }
    }

    // Any word boundary.
    for end in (floor..=hard_end).rev() {
        if (end >= 1 && chars[end - 1].is_whitespace()) || chars[end].is_whitespace() {
            return end;
        }
    }

    hard_end
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}
