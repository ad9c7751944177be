//! RAG orchestration: context assembly plus the ingest/respond pipelines.

mod context;
mod engine;

pub use context::ContextAssembler;
pub use engine::{IngestSource, IngestSummary, RagEngine, RespondOutcome};
