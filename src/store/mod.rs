//! Vector storage: per-owner persistence and similarity search.

mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::Chunk;
use crate::errors::RagError;

pub use sqlite::SqliteVectorStore;

/// Metadata persisted alongside every stored chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    pub chunk_index: usize,
    pub title: String,
    pub document_id: String,
    pub token_count: usize,
}

/// One ranked result of a similarity search. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalHit {
    pub id: String,
    pub content: String,
    pub metadata: DocumentMetadata,
    pub similarity: f32,
}

/// Aggregate counts over one owner's stored chunks.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerStats {
    pub total_chunks: usize,
    /// Distinct ingested documents (by `document_id`).
    pub total_documents: usize,
    /// Distinct source kinds seen for this owner.
    pub sources: Vec<String>,
}

/// Capability contract for the vector index.
///
/// Any engine satisfying "cosine-ranked query filterable by an opaque owner
/// key" is substitutable. The owner filter and similarity threshold are part
/// of the ranking query itself, applied before the result-count limit and
/// never as a post-filter.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and insert a chunk batch, returning record ids in input order.
    ///
    /// Atomic per call: either every chunk is stored or none are.
    async fn add(&self, owner_id: &str, chunks: &[Chunk]) -> Result<Vec<String>, RagError>;

    /// Similarity search scoped to one owner, ordered by descending
    /// similarity with ties broken by insertion recency. Returns fewer than
    /// `n_results` hits when the threshold filters candidates out.
    async fn search(
        &self,
        owner_id: &str,
        query: &str,
        n_results: usize,
        similarity_threshold: f32,
    ) -> Result<Vec<RetrievalHit>, RagError>;

    /// Irreversible owner-scoped bulk delete. Idempotent; the bool reports
    /// whether any rows were removed.
    async fn delete_owner(&self, owner_id: &str) -> Result<bool, RagError>;

    async fn stats(&self, owner_id: &str) -> Result<OwnerStats, RagError>;
}
