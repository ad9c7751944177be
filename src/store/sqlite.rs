//! SQLite-backed vector store.
//!
//! Metadata lives in SQLite; embeddings are stored as little-endian f32
//! blobs and ranked with brute-force cosine similarity. The owner predicate
//! is part of every query, so cross-owner rows never reach the ranking
//! stage.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{DocumentMetadata, OwnerStats, RetrievalHit, VectorStore};
use crate::document::Chunk;
use crate::embedding::{cosine_similarity, Embedder};
use crate::errors::RagError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl SqliteVectorStore {
    pub async fn new(db_path: PathBuf, embedder: Arc<dyn Embedder>) -> Result<Self, RagError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(RagError::store)?;

        let store = Self { pool, embedder };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::store)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner_id)")
            .execute(&self.pool)
            .await
            .map_err(RagError::store)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn add(&self, owner_id: &str, chunks: &[Chunk]) -> Result<Vec<String>, RagError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        if chunks.iter().any(|chunk| chunk.owner_id != owner_id) {
            return Err(RagError::IsolationViolation(owner_id.to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        // single transaction: the whole batch commits or rolls back together
        let mut tx = self.pool.begin().await.map_err(RagError::store)?;
        let mut ids = Vec::with_capacity(chunks.len());

        for (chunk, embedding) in chunks.iter().zip(&embeddings) {
            let id = Uuid::new_v4().to_string();
            let metadata = DocumentMetadata {
                source: chunk.source_kind.as_str().to_string(),
                chunk_index: chunk.chunk_index,
                title: chunk.title.clone(),
                document_id: chunk.document_id.to_string(),
                token_count: chunk.token_count,
            };
            let metadata_json = serde_json::to_string(&metadata).map_err(RagError::store)?;

            sqlx::query(
                "INSERT INTO documents (id, owner_id, content, embedding, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&id)
            .bind(owner_id)
            .bind(&chunk.content)
            .bind(Self::serialize_embedding(embedding))
            .bind(&metadata_json)
            .bind(chunk.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(RagError::store)?;

            ids.push(id);
        }

        tx.commit().await.map_err(RagError::store)?;
        Ok(ids)
    }

    async fn search(
        &self,
        owner_id: &str,
        query: &str,
        n_results: usize,
        similarity_threshold: f32,
    ) -> Result<Vec<RetrievalHit>, RagError> {
        let query_embedding = self.embedder.embed(query).await?;

        let rows = sqlx::query(
            "SELECT rowid AS recency, id, owner_id, content, metadata, embedding
             FROM documents
             WHERE owner_id = ?1",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::store)?;

        let mut scored: Vec<(i64, RetrievalHit)> = Vec::new();
        for row in &rows {
            let row_owner: String = row.get("owner_id");
            if row_owner != owner_id {
                return Err(RagError::IsolationViolation(owner_id.to_string()));
            }

            let embedding_bytes: Vec<u8> = row.get("embedding");
            let similarity =
                cosine_similarity(&query_embedding, &Self::deserialize_embedding(&embedding_bytes));
            // threshold before the result-count limit
            if similarity <= similarity_threshold {
                continue;
            }

            let metadata_str: String = row.get("metadata");
            let metadata: DocumentMetadata =
                serde_json::from_str(&metadata_str).map_err(RagError::store)?;

            scored.push((
                row.get("recency"),
                RetrievalHit {
                    id: row.get("id"),
                    content: row.get("content"),
                    metadata,
                    similarity,
                },
            ));
        }

        scored.sort_by(|a, b| {
            b.1.similarity
                .partial_cmp(&a.1.similarity)
                .unwrap_or(Ordering::Equal)
                .then(b.0.cmp(&a.0))
        });
        scored.truncate(n_results);

        Ok(scored.into_iter().map(|(_, hit)| hit).collect())
    }

    async fn delete_owner(&self, owner_id: &str) -> Result<bool, RagError> {
        let result = sqlx::query("DELETE FROM documents WHERE owner_id = ?1")
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(RagError::store)?;

        let removed = result.rows_affected();
        tracing::info!(owner_id, removed, "deleted owner documents");
        Ok(removed > 0)
    }

    async fn stats(&self, owner_id: &str) -> Result<OwnerStats, RagError> {
        let total_chunks: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE owner_id = ?1")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await
                .map_err(RagError::store)?;

        let total_documents: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT json_extract(metadata, '$.document_id'))
             FROM documents WHERE owner_id = ?1",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(RagError::store)?;

        let sources: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT json_extract(metadata, '$.source')
             FROM documents WHERE owner_id = ?1",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::store)?;

        Ok(OwnerStats {
            total_chunks: total_chunks as usize,
            total_documents: total_documents as usize,
            sources,
        })
    }
}
