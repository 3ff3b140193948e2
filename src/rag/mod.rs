//! Retrieval-augmented answering support.
//!
//! Turns ranked transcript chunks into the bounded context handed to the
//! answer generator.

pub mod context;

pub use context::{assemble, ContextAssembler, CHUNK_SEPARATOR, DEFAULT_FALLBACK_COUNT};
