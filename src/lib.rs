//! VideoMind - Ask questions about video transcripts
//!
//! Loads a plain-text video transcript, finds the passages most relevant to a
//! question and asks a text-generation model to answer from those passages.
//!
//! # Architecture
//!
//! - `chunking` - Overlapping fixed-size transcript chunks
//! - `index` - Keyword ranking over the chunks of one transcript
//! - `rag` - Context assembly from ranked chunks
//! - `generation` - Answer generator trait and the Groq implementation
//! - `pipeline` - Per-session orchestration with timeout and cancellation
//! - `config` - Settings and prompt templates
//! - `cli` - Command-line interface and HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use videomind::config::Settings;
//! use videomind::generation::GroqGenerator;
//! use videomind::pipeline::RetrievalPipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let generator = Arc::new(GroqGenerator::from_settings(&settings.generation)?);
//!     let pipeline = RetrievalPipeline::with_config(settings.pipeline_config(), generator);
//!
//!     let transcript = std::fs::read_to_string("transcript.txt")?;
//!     pipeline.initialize(&transcript)?;
//!
//!     let answer = pipeline.query("What is the video about?", "llama3-8b-8192").await?;
//!     println!("{}", answer);
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod index;
pub mod openai;
pub mod pipeline;
pub mod rag;

pub use error::{GenerationError, PipelineError, Result, VideomindError};
