//! In-memory keyword index for one transcript.

use super::{KeywordPolicy, QueryTerms, ScoredChunk};
use crate::chunking::TranscriptChunk;
use tracing::debug;

/// Immutable index over the chunks of a single transcript.
///
/// Built once and never mutated; a new transcript gets a new index.
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    documents: Vec<TranscriptChunk>,
    lowered: Vec<String>,
    policy: KeywordPolicy,
}

impl LexicalIndex {
    /// Build an index with the default keyword policy.
    pub fn build(chunks: Vec<TranscriptChunk>) -> Self {
        Self::build_with_policy(chunks, KeywordPolicy::default())
    }

    /// Build an index with a custom keyword policy.
    pub fn build_with_policy(chunks: Vec<TranscriptChunk>, policy: KeywordPolicy) -> Self {
        let lowered = chunks.iter().map(|c| c.text.to_lowercase()).collect();
        debug!("Built lexical index with {} chunks", chunks.len());
        Self {
            documents: chunks,
            lowered,
            policy,
        }
    }

    /// All chunks in ordinal order.
    pub fn chunks(&self) -> &[TranscriptChunk] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn policy(&self) -> &KeywordPolicy {
        &self.policy
    }

    /// Rank chunks against `query` and return at most `top_k` of them.
    ///
    /// Results are ordered by score descending, then by ordinal ascending.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<ScoredChunk> {
        if top_k == 0 || self.documents.is_empty() {
            return Vec::new();
        }

        let terms = QueryTerms::parse(query, &self.policy);
        let mut scored: Vec<(u32, usize)> = self
            .lowered
            .iter()
            .enumerate()
            .map(|(i, text)| (terms.score(text), i))
            .collect();

        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| self.documents[a.1].ordinal.cmp(&self.documents[b.1].ordinal))
        });
        scored.truncate(top_k);

        debug!(
            "Searched {} chunks with {} keywords, best score {}",
            self.documents.len(),
            terms.len(),
            scored.first().map(|s| s.0).unwrap_or(0)
        );

        scored
            .into_iter()
            .map(|(score, i)| ScoredChunk {
                chunk: self.documents[i].clone(),
                score,
            })
            .collect()
    }
}
