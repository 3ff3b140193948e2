//! Context assembly for answer generation.

use crate::chunking::TranscriptChunk;
use crate::index::ScoredChunk;

/// Separator placed between chunks in the assembled context.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Default number of leading chunks used when nothing scored.
pub const DEFAULT_FALLBACK_COUNT: usize = 3;

/// Joins ranked chunks into the context string passed to the generator.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    fallback_count: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_COUNT)
    }
}

impl ContextAssembler {
    pub fn new(fallback_count: usize) -> Self {
        Self { fallback_count }
    }

    pub fn fallback_count(&self) -> usize {
        self.fallback_count
    }

    /// Assemble context from `scored`, or from the head of `fallback` if `scored` is empty.
    pub fn assemble(&self, scored: &[ScoredChunk], fallback: &[TranscriptChunk]) -> String {
        assemble(scored, fallback, self.fallback_count)
    }
}

/// Join `scored` in rank order; when empty, join the first `fallback_count`
/// chunks of `fallback` in ordinal order. Returns an empty string when both
/// are empty.
pub fn assemble(
    scored: &[ScoredChunk],
    fallback: &[TranscriptChunk],
    fallback_count: usize,
) -> String {
    if !scored.is_empty() {
        return scored
            .iter()
            .map(ScoredChunk::text)
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR);
    }

    fallback
        .iter()
        .take(fallback_count)
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}
