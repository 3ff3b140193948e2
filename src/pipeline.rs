//! Retrieval pipeline for one transcript session.
//!
//! Coordinates chunking, ranking, context assembly and the answer generator.
//! The pipeline is either Uninitialized (no index) or Ready (an index is
//! installed). Queries take a snapshot of the current index and keep using it
//! even if a new transcript is installed while they wait for the generator.

use crate::chunking::{ChunkingConfig, TextSplitter};
use crate::error::{PipelineError, QueryStage};
use crate::generation::{AnswerGenerator, GenerationRequest};
use crate::index::{KeywordPolicy, LexicalIndex, ScoredChunk, DEFAULT_MIN_KEYWORD_LEN};
use crate::rag::{ContextAssembler, DEFAULT_FALLBACK_COUNT};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 3;

/// Default generation timeout in seconds.
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 30;

/// Minimum number of non-whitespace characters in a usable transcript.
pub const MIN_TRANSCRIPT_CHARS: usize = 10;

/// Per-instance pipeline parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
    pub top_k: usize,
    pub fallback_count: usize,
    pub min_keyword_len: usize,
    pub generation_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            top_k: DEFAULT_TOP_K,
            fallback_count: DEFAULT_FALLBACK_COUNT,
            min_keyword_len: DEFAULT_MIN_KEYWORD_LEN,
            generation_timeout: Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
        }
    }
}

/// Outcome of a successful [`RetrievalPipeline::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializeSummary {
    /// Number of chunks in the new index.
    pub chunk_count: usize,
    /// Transcript length in characters.
    pub character_count: usize,
}

/// Question answering over a single loaded transcript.
pub struct RetrievalPipeline {
    config: PipelineConfig,
    generator: Arc<dyn AnswerGenerator>,
    index: RwLock<Option<Arc<LexicalIndex>>>,
}

impl RetrievalPipeline {
    /// Create an uninitialized pipeline with default parameters.
    pub fn new(generator: Arc<dyn AnswerGenerator>) -> Self {
        Self::with_config(PipelineConfig::default(), generator)
    }

    /// Create an uninitialized pipeline with custom parameters.
    pub fn with_config(config: PipelineConfig, generator: Arc<dyn AnswerGenerator>) -> Self {
        Self {
            config,
            generator,
            index: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Whether a transcript is loaded.
    pub fn is_ready(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Number of chunks in the current index (0 when uninitialized).
    pub fn chunk_count(&self) -> usize {
        self.snapshot().map(|index| index.len()).unwrap_or(0)
    }

    /// The current index, shared read-only.
    pub fn snapshot(&self) -> Option<Arc<LexicalIndex>> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drop the current index and return to the uninitialized state.
    pub fn reset(&self) {
        self.install(None);
    }

    fn install(&self, index: Option<Arc<LexicalIndex>>) {
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = index;
    }

    /// Load a transcript, replacing any previous one.
    ///
    /// A transcript with fewer than [`MIN_TRANSCRIPT_CHARS`] non-whitespace
    /// characters is rejected and the pipeline returns to the uninitialized
    /// state. An invalid chunking configuration leaves the state untouched.
    #[instrument(skip(self, transcript), fields(len = transcript.len()))]
    pub fn initialize(&self, transcript: &str) -> Result<InitializeSummary, PipelineError> {
        let meaningful = transcript.chars().filter(|c| !c.is_whitespace()).count();
        if meaningful < MIN_TRANSCRIPT_CHARS {
            self.reset();
            return Err(PipelineError::InvalidTranscript(format!(
                "transcript has {} non-whitespace characters, at least {} are required",
                meaningful, MIN_TRANSCRIPT_CHARS
            )));
        }

        let chunks = TextSplitter::new(self.config.chunking).split(transcript)?;
        let index = LexicalIndex::build_with_policy(
            chunks,
            KeywordPolicy::with_min_len(self.config.min_keyword_len),
        );

        let summary = InitializeSummary {
            chunk_count: index.len(),
            character_count: transcript.chars().count(),
        };

        self.install(Some(Arc::new(index)));
        info!(
            "Loaded transcript: {} characters in {} chunks",
            summary.character_count, summary.chunk_count
        );

        Ok(summary)
    }

    /// Rank the current transcript's chunks against `question` without generating an answer.
    pub fn search(&self, question: &str) -> Result<Vec<ScoredChunk>, PipelineError> {
        let index = self.snapshot().ok_or(PipelineError::NotInitialized)?;
        validate_question(question)?;
        Ok(index.search(question, self.config.top_k))
    }

    /// Answer `question` from the current transcript using `model_id`.
    pub async fn query(&self, question: &str, model_id: &str) -> Result<String, PipelineError> {
        let request = self.prepare(question, model_id)?;
        self.generate(&request).await
    }

    /// Like [`RetrievalPipeline::query`], but gives up as soon as `cancel` fires.
    pub async fn query_with_cancel(
        &self,
        question: &str,
        model_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let request = self.prepare(question, model_id)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Query cancelled while waiting for {}", self.generator.name());
                Err(PipelineError::Cancelled)
            }
            result = self.generate(&request) => result,
        }
    }

    /// Retrieve and assemble context against a snapshot of the index.
    #[instrument(skip(self), fields(question = %question, model = %model_id))]
    fn prepare(&self, question: &str, model_id: &str) -> Result<GenerationRequest, PipelineError> {
        let index = self.snapshot().ok_or(PipelineError::NotInitialized)?;
        validate_question(question)?;

        let ranked: Vec<ScoredChunk> = index.search(question, self.config.top_k);
        debug!(
            "{} of {} ranked chunks matched the question",
            ranked.iter().filter(|c| c.score > 0).count(),
            ranked.len()
        );

        let assembler = ContextAssembler::new(self.config.fallback_count);
        let context = assembler.assemble(&ranked, index.chunks());
        if context.is_empty() {
            return Err(PipelineError::NoContextAvailable);
        }

        Ok(GenerationRequest {
            model_id: model_id.to_string(),
            question: question.to_string(),
            context,
            timeout: self.config.generation_timeout,
        })
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, PipelineError> {
        info!(
            "Generating answer with {} (model: {})",
            self.generator.name(),
            request.model_id
        );

        match tokio::time::timeout(request.timeout, self.generator.generate(request)).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(e)) => {
                warn!("Answer generation failed: {}", e);
                Err(PipelineError::from_generation(QueryStage::Generation, e))
            }
            Err(_) => {
                warn!("Answer generation timed out after {:?}", request.timeout);
                Err(PipelineError::GenerationTimeout {
                    stage: QueryStage::Generation,
                    timeout: request.timeout,
                })
            }
        }
    }
}

fn validate_question(question: &str) -> Result<(), PipelineError> {
    if question.trim().is_empty() {
        return Err(PipelineError::InvalidQuery(
            "question must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::generation::stub::StubGenerator;
    use tokio_test::{assert_err, assert_ok};

    fn pipeline_with(stub: &StubGenerator, config: PipelineConfig) -> RetrievalPipeline {
        RetrievalPipeline::with_config(config, Arc::new(stub.clone()))
    }

    fn small_chunks() -> PipelineConfig {
        PipelineConfig {
            chunking: ChunkingConfig::new(60, 10),
            ..PipelineConfig::default()
        }
    }

    fn quantum_transcript() -> String {
        let filler = "the speaker talks about ordinary physics topics. ";
        let mut transcript = filler.repeat(15);
        transcript.push_str("quantum entanglement ");
        transcript.push_str(&filler.repeat(16));
        transcript.truncate(1500);
        transcript
    }

    #[tokio::test]
    async fn test_rejects_short_transcripts() {
        let stub = StubGenerator::default();
        let pipeline = pipeline_with(&stub, PipelineConfig::default());

        assert!(matches!(pipeline.initialize(""), Err(PipelineError::InvalidTranscript(_))));
        assert!(matches!(pipeline.initialize("hello"), Err(PipelineError::InvalidTranscript(_))));
        assert!(matches!(
            pipeline.initialize("a b c d e f g h i"),
            Err(PipelineError::InvalidTranscript(_))
        ));
        assert!(!pipeline.is_ready());

        let err = pipeline.query("anything useful", "model-x").await.unwrap_err();
        assert!(matches!(err, PipelineError::NotInitialized));
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_transcript_reverts_to_uninitialized() {
        let stub = StubGenerator::default();
        let pipeline = pipeline_with(&stub, PipelineConfig::default());

        assert_ok!(pipeline.initialize("a perfectly reasonable transcript"));
        assert!(pipeline.is_ready());

        assert_err!(pipeline.initialize("   tiny   "));
        assert!(!pipeline.is_ready());
        assert!(matches!(
            pipeline.query("reasonable", "model-x").await,
            Err(PipelineError::NotInitialized)
        ));
    }

    #[test]
    fn test_reset_drops_index() {
        let stub = StubGenerator::default();
        let pipeline = pipeline_with(&stub, small_chunks());

        let summary = pipeline
            .initialize(&"a sentence about nothing much. ".repeat(10))
            .unwrap();
        assert!(summary.chunk_count > 1);
        assert_eq!(pipeline.chunk_count(), summary.chunk_count);

        pipeline.reset();
        assert!(!pipeline.is_ready());
        assert_eq!(pipeline.chunk_count(), 0);
        assert!(pipeline.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_invalid_chunking_parameters() {
        let stub = StubGenerator::default();
        let config = PipelineConfig {
            chunking: ChunkingConfig::new(100, 100),
            ..PipelineConfig::default()
        };
        let pipeline = pipeline_with(&stub, config);

        assert!(matches!(
            pipeline.initialize("the first transcript is about volcanoes"),
            Err(PipelineError::InvalidParameter(_))
        ));
        assert!(!pipeline.is_ready());
        assert!(matches!(
            pipeline.query("volcanoes", "model-x").await,
            Err(PipelineError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let stub = StubGenerator::default();
        let pipeline = pipeline_with(&stub, PipelineConfig::default());
        assert_ok!(pipeline.initialize("a transcript about distant galaxies"));

        for question in ["", "   ", "\n\t"] {
            assert!(matches!(
                pipeline.query(question, "model-x").await,
                Err(PipelineError::InvalidQuery(_))
            ));
        }
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_passes_matching_chunk() {
        let stub = StubGenerator::default();
        let pipeline = pipeline_with(&stub, PipelineConfig::default());

        let transcript = quantum_transcript();
        assert_eq!(transcript.len(), 1500);
        let summary = pipeline.initialize(&transcript).unwrap();
        assert!(summary.chunk_count >= 2);

        let question = "What is quantum entanglement?";
        let ranked = pipeline.search(question).unwrap();
        assert!(ranked[0].text().contains("quantum entanglement"));
        assert!(ranked[0].score >= 1);

        let answer = pipeline.query(question, "model-x").await.unwrap();
        assert_eq!(answer, "stub answer");

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model_id, "model-x");
        assert_eq!(requests[0].question, question);
        assert!(requests[0].context.contains(ranked[0].text()));
        assert_eq!(requests[0].timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_unmatched_question_uses_leading_chunks() {
        let stub = StubGenerator::default();
        let pipeline = pipeline_with(&stub, small_chunks());

        let transcript = "Opening remarks set the scene. ".repeat(12);
        pipeline.initialize(&transcript).unwrap();
        let index = pipeline.snapshot().unwrap();
        assert!(index.len() > 3);

        pipeline.query("zebras", "model-x").await.unwrap();

        let expected: Vec<&str> = index.chunks()[..3].iter().map(|c| c.text.as_str()).collect();
        assert_eq!(stub.requests()[0].context, expected.join("\n\n"));
    }

    #[tokio::test]
    async fn test_context_is_never_empty_when_chunks_exist() {
        let stub = StubGenerator::default();
        let pipeline = pipeline_with(&stub, small_chunks());
        pipeline
            .initialize(&"Every sentence here is filler text. ".repeat(8))
            .unwrap();

        for question in ["why", "filler", "completely unrelated words"] {
            pipeline.query(question, "model-x").await.unwrap();
        }
        assert!(stub.requests().iter().all(|r| !r.context.is_empty()));
    }

    #[tokio::test]
    async fn test_context_keeps_all_ranked_chunks() {
        let stub = StubGenerator::default();
        let config = PipelineConfig {
            chunking: ChunkingConfig::new(30, 0),
            ..PipelineConfig::default()
        };
        let pipeline = pipeline_with(&stub, config);
        pipeline
            .initialize(
                "Rivers carve deep valleys. Deserts stay dry all year. \
                 Glaciers melt in summer. Forests cover the hills.",
            )
            .unwrap();
        assert!(pipeline.chunk_count() >= 4);

        let ranked = pipeline.search("glaciers").unwrap();
        assert_eq!(ranked.len(), 3);
        assert!(ranked[0].text().contains("Glaciers"));
        assert!(ranked[0].score > 0);
        assert!(ranked[1..].iter().all(|r| r.score == 0));

        pipeline.query("glaciers", "model-x").await.unwrap();

        let expected: Vec<&str> = ranked.iter().map(|r| r.text()).collect();
        assert_eq!(stub.requests()[0].context, expected.join("\n\n"));
    }

    #[tokio::test]
    async fn test_no_context_without_fallback() {
        let stub = StubGenerator::default();
        let config = PipelineConfig {
            top_k: 0,
            fallback_count: 0,
            ..PipelineConfig::default()
        };
        let pipeline = pipeline_with(&stub, config);
        pipeline.initialize("a transcript about mountain weather").unwrap();

        assert!(matches!(
            pipeline.query("oceans", "model-x").await,
            Err(PipelineError::NoContextAvailable)
        ));
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_reinitialize_replaces_chunks() {
        let stub = StubGenerator::default();
        let pipeline = pipeline_with(&stub, small_chunks());

        pipeline.initialize(&"apples grow on trees. ".repeat(10)).unwrap();
        pipeline.initialize(&"bananas ripen slowly. ".repeat(10)).unwrap();

        let results = pipeline.search("apples").unwrap();
        assert!(results.iter().all(|r| r.score == 0));
        let index = pipeline.snapshot().unwrap();
        assert!(index.chunks().iter().all(|c| !c.text.contains("apples")));
        assert!(pipeline.search("bananas").unwrap()[0].score > 0);
    }

    #[tokio::test]
    async fn test_generation_timeout() {
        let stub = StubGenerator::default().with_delay(Duration::from_millis(500));
        let config = PipelineConfig {
            generation_timeout: Duration::from_millis(20),
            ..PipelineConfig::default()
        };
        let pipeline = pipeline_with(&stub, config);
        pipeline.initialize("a transcript about slow networks").unwrap();

        let err = pipeline.query("networks", "model-x").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::GenerationTimeout { stage: QueryStage::Generation, .. }
        ));
        assert!(pipeline.is_ready());
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_cause() {
        let stub = StubGenerator::rate_limited();
        let pipeline = pipeline_with(&stub, PipelineConfig::default());
        pipeline.initialize("a transcript about busy servers").unwrap();

        match pipeline.query("servers", "model-x").await {
            Err(PipelineError::GenerationFailure { stage, source }) => {
                assert_eq!(stage, QueryStage::Generation);
                assert!(matches!(source, GenerationError::RateLimited(_)));
            }
            other => panic!("expected GenerationFailure, got {other:?}"),
        }
        assert!(pipeline.is_ready());
    }

    #[tokio::test]
    async fn test_cancellation_aborts_generation() {
        let stub = StubGenerator::default().with_delay(Duration::from_secs(5));
        let pipeline = pipeline_with(&stub, PipelineConfig::default());
        pipeline.initialize("a transcript about patience").unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = pipeline
            .query_with_cancel("patience", "model-x", &token)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[tokio::test]
    async fn test_in_flight_query_keeps_its_snapshot() {
        let stub = StubGenerator::default().with_delay(Duration::from_millis(100));
        let pipeline = Arc::new(pipeline_with(&stub, PipelineConfig::default()));
        pipeline.initialize("first video discusses glaciers and glaciers").unwrap();

        let in_flight = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.query("glaciers", "model-x").await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        pipeline.initialize("second video discusses deserts instead").unwrap();

        assert_ok!(in_flight.await.unwrap());
        assert!(stub.requests()[0].context.contains("glaciers"));

        pipeline.query("deserts", "model-x").await.unwrap();
        let requests = stub.requests();
        assert!(requests[1].context.contains("deserts"));
        assert!(!requests[1].context.contains("glaciers"));
    }
}
