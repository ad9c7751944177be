//! Document processing: normalization, chunking, extraction and statistics.

mod chunker;
mod tokens;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::RagError;

pub use chunker::{chunk_text, clean_text, split_sentences};
pub use tokens::{ApproxTokenCounter, HfTokenCounter, TokenCounter};

/// What kind of source a chunk was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Text,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Text => "text",
        }
    }
}

/// One retrievable unit produced from a source document.
///
/// Immutable once produced. All chunks from a single ingestion call share
/// one `document_id`, with dense zero-based `chunk_index` values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub owner_id: String,
    pub source_kind: SourceKind,
    pub title: String,
    pub chunk_index: usize,
    pub document_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub token_count: usize,
}

/// Aggregate token statistics for one ingestion batch.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkStats {
    pub total_chunks: usize,
    pub total_tokens: usize,
    pub avg_tokens_per_chunk: f64,
    pub min_tokens: usize,
    pub max_tokens: usize,
}

pub fn chunk_stats(chunks: &[Chunk]) -> ChunkStats {
    let total_tokens: usize = chunks.iter().map(|chunk| chunk.token_count).sum();
    let avg = if chunks.is_empty() {
        0.0
    } else {
        total_tokens as f64 / chunks.len() as f64
    };

    ChunkStats {
        total_chunks: chunks.len(),
        total_tokens,
        avg_tokens_per_chunk: (avg * 100.0).round() / 100.0,
        min_tokens: chunks.iter().map(|chunk| chunk.token_count).min().unwrap_or(0),
        max_tokens: chunks.iter().map(|chunk| chunk.token_count).max().unwrap_or(0),
    }
}

/// Turns raw sources into chunk batches ready for the vector store.
pub struct DocumentProcessor {
    chunk_size: usize,
    chunk_overlap: usize,
    counter: Arc<dyn TokenCounter>,
}

impl DocumentProcessor {
    pub fn new(chunk_size: usize, chunk_overlap: usize, counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            counter,
        }
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Extract text from PDF bytes and chunk it.
    pub fn process_pdf(
        &self,
        bytes: &[u8],
        owner_id: &str,
        title: &str,
    ) -> Result<Vec<Chunk>, RagError> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|err| RagError::Chunking(format!("pdf extraction failed: {err}")))?;
        Ok(self.build_chunks(&text, owner_id, SourceKind::Pdf, title))
    }

    /// Chunk plain text.
    pub fn process_text(
        &self,
        text: &str,
        owner_id: &str,
        title: &str,
    ) -> Result<Vec<Chunk>, RagError> {
        Ok(self.build_chunks(text, owner_id, SourceKind::Text, title))
    }

    fn build_chunks(
        &self,
        raw: &str,
        owner_id: &str,
        source_kind: SourceKind,
        title: &str,
    ) -> Vec<Chunk> {
        let cleaned = clean_text(raw);
        let pieces = chunk_text(
            &cleaned,
            self.chunk_size,
            self.chunk_overlap,
            self.counter.as_ref(),
        );

        let document_id = Uuid::new_v4();
        let created_at = Utc::now();

        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| {
                let token_count = self.counter.count(&content);
                Chunk {
                    content,
                    owner_id: owner_id.to_string(),
                    source_kind,
                    title: title.to_string(),
                    chunk_index,
                    document_id,
                    created_at,
                    token_count,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> DocumentProcessor {
        DocumentProcessor::new(100, 10, Arc::new(ApproxTokenCounter))
    }

    #[test]
    fn process_text_assigns_shared_document_id_and_dense_indexes() {
        let chunks = processor()
            .process_text("One fact here. Another fact there.", "owner-1", "notes")
            .unwrap();

        assert!(!chunks.is_empty());
        let document_id = chunks[0].document_id;
        for (idx, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.document_id, document_id);
            assert_eq!(chunk.chunk_index, idx);
            assert_eq!(chunk.owner_id, "owner-1");
            assert_eq!(chunk.title, "notes");
            assert_eq!(chunk.source_kind, SourceKind::Text);
            assert!(chunk.token_count > 0);
        }
    }

    #[test]
    fn process_text_on_empty_input_yields_no_chunks() {
        let chunks = processor().process_text("", "owner-1", "empty").unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn token_counts_respect_budget_for_regular_chunks() {
        let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota. Kappa lambda mu.";
        let chunks = DocumentProcessor::new(6, 0, Arc::new(ApproxTokenCounter))
            .process_text(text, "owner-1", "doc")
            .unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.token_count <= 6, "chunk too large: {:?}", chunk.content);
        }
    }

    #[test]
    fn stats_summarize_token_counts() {
        let chunks = processor()
            .process_text("Short. A slightly longer sentence here.", "owner-1", "doc")
            .unwrap();
        let stats = chunk_stats(&chunks);
        assert_eq!(stats.total_chunks, chunks.len());
        assert!(stats.total_tokens >= stats.max_tokens);
        assert!(stats.min_tokens <= stats.max_tokens);
    }

    #[test]
    fn stats_on_empty_batch_are_zero() {
        let stats = chunk_stats(&[]);
        assert_eq!(stats.total_chunks, 0);
        assert_eq!(stats.total_tokens, 0);
        assert_eq!(stats.avg_tokens_per_chunk, 0.0);
    }

    #[test]
    fn pdf_extraction_rejects_garbage_bytes() {
        let err = processor().process_pdf(b"not a pdf", "owner-1", "bad.pdf");
        assert!(matches!(err, Err(RagError::Chunking(_))));
    }
}
