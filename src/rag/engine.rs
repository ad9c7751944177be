use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::context::ContextAssembler;
use crate::config::RagConfig;
use crate::document::{chunk_stats, ChunkStats, DocumentProcessor};
use crate::errors::RagError;
use crate::history::MessageStore;
use crate::llm::{ChatMessage, GenerationOptions, ProviderRegistry};
use crate::store::{OwnerStats, VectorStore};

const SYSTEM_PROMPT_TEMPLATE: &str = "\
You are a helpful AI assistant for a study guide application. You have access to relevant documents to help answer questions accurately.

When answering questions:
1. Use the provided context when it's relevant to the question
2. Cite the source when using information from the context
3. If the context doesn't contain relevant information, rely on your general knowledge
4. Be clear, educational, and helpful
5. If you're unsure about something, say so rather than making up information

Context from relevant documents:
{context}

Please provide clear, educational responses based on the context above and your general knowledge.";

const NO_CONTEXT_MARKER: &str = "No relevant documents found.";

/// A source document handed to the ingest pipeline.
pub enum IngestSource {
    Pdf { bytes: Vec<u8>, title: String },
    Text { content: String, title: String },
}

/// What one successful ingest produced.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub document_id: Uuid,
    pub title: String,
    pub chunk_count: usize,
    pub chunk_ids: Vec<String>,
    pub stats: ChunkStats,
}

/// Terminal result of one respond() call.
///
/// `success = false` means the reply is the apology text and `error` holds
/// the cause; both messages were persisted either way.
#[derive(Debug, Clone, Serialize)]
pub struct RespondOutcome {
    pub user_message_id: String,
    pub assistant_message_id: String,
    pub reply: String,
    pub retrieved: usize,
    pub context_used: bool,
    pub success: bool,
    pub error: Option<String>,
}

/// Composes the ingest and respond pipelines.
///
/// The engine is the only component aware of both pipelines and of the
/// message-persistence collaborator. All dependencies are injected at
/// construction; there is no global state.
pub struct RagEngine {
    processor: DocumentProcessor,
    store: Arc<dyn VectorStore>,
    messages: Arc<dyn MessageStore>,
    providers: Arc<ProviderRegistry>,
    assembler: ContextAssembler,
    max_retrieved_chunks: usize,
    similarity_threshold: f32,
    history_limit: usize,
}

impl RagEngine {
    pub fn new(
        processor: DocumentProcessor,
        store: Arc<dyn VectorStore>,
        messages: Arc<dyn MessageStore>,
        providers: Arc<ProviderRegistry>,
        config: &RagConfig,
    ) -> Self {
        Self {
            processor,
            store,
            messages,
            providers,
            assembler: ContextAssembler::new(config.max_context_length),
            max_retrieved_chunks: config.max_retrieved_chunks,
            similarity_threshold: config.similarity_threshold,
            history_limit: config.history_limit,
        }
    }

    /// Ingest pipeline: extract, chunk, embed, store.
    ///
    /// The whole chunk batch is stored atomically; a failure at any step
    /// surfaces as the error for this call and leaves nothing behind.
    pub async fn ingest(
        &self,
        owner_id: &str,
        source: IngestSource,
    ) -> Result<IngestSummary, RagError> {
        let (chunks, title) = match source {
            IngestSource::Pdf { bytes, title } => {
                (self.processor.process_pdf(&bytes, owner_id, &title)?, title)
            }
            IngestSource::Text { content, title } => {
                (self.processor.process_text(&content, owner_id, &title)?, title)
            }
        };

        let Some(first) = chunks.first() else {
            return Err(RagError::Chunking(
                "document produced no chunks".to_string(),
            ));
        };
        let document_id = first.document_id;

        let stats = chunk_stats(&chunks);
        let chunk_ids = self.store.add(owner_id, &chunks).await?;

        tracing::info!(
            owner_id,
            %document_id,
            chunks = chunk_ids.len(),
            total_tokens = stats.total_tokens,
            "ingested document"
        );

        Ok(IngestSummary {
            document_id,
            title,
            chunk_count: chunk_ids.len(),
            chunk_ids,
            stats,
        })
    }

    /// Respond pipeline: retrieve, assemble, generate, persist.
    ///
    /// The user message is persisted up front and an assistant message is
    /// always persisted afterwards, the apology text when retrieval or
    /// generation failed. Only a message-store fault can make this return
    /// `Err`, since then nothing can be persisted at all.
    pub async fn respond(
        &self,
        owner_id: &str,
        chat_id: &str,
        user_message: &str,
        provider_name: Option<&str>,
    ) -> Result<RespondOutcome, RagError> {
        let user_message_id = self
            .messages
            .create_message(owner_id, chat_id, "user", user_message)
            .await?;

        let generated = self
            .generate_reply(owner_id, chat_id, user_message, provider_name)
            .await;

        let (reply, retrieved, context_used, error) = match generated {
            Ok((reply, retrieved, context_used)) => (reply, retrieved, context_used, None),
            Err(err) => {
                tracing::warn!(owner_id, chat_id, error = %err, "degrading to apology reply");
                (apology(&err), 0, false, Some(err.to_string()))
            }
        };

        let assistant_message_id = self
            .messages
            .create_message(owner_id, chat_id, "assistant", &reply)
            .await?;

        Ok(RespondOutcome {
            user_message_id,
            assistant_message_id,
            reply,
            retrieved,
            context_used,
            success: error.is_none(),
            error,
        })
    }

    async fn generate_reply(
        &self,
        owner_id: &str,
        chat_id: &str,
        user_message: &str,
        provider_name: Option<&str>,
    ) -> Result<(String, usize, bool), RagError> {
        let hits = self
            .store
            .search(
                owner_id,
                user_message,
                self.max_retrieved_chunks,
                self.similarity_threshold,
            )
            .await?;

        let context = self.assembler.assemble(&hits);
        let system_prompt = render_system_prompt(&context);

        // the history tail already ends with the user turn persisted above
        let history = self
            .messages
            .recent_history(chat_id, self.history_limit)
            .await?;

        let mut messages = vec![ChatMessage::system(system_prompt)];
        messages.extend(history);

        let reply = self
            .providers
            .generate(&messages, provider_name, &GenerationOptions::default())
            .await?;

        Ok((reply, hits.len(), !context.is_empty()))
    }

    pub async fn owner_stats(&self, owner_id: &str) -> Result<OwnerStats, RagError> {
        self.store.stats(owner_id).await
    }

    /// Irreversibly drop every stored document of one owner.
    pub async fn delete_owner_documents(&self, owner_id: &str) -> Result<bool, RagError> {
        self.store.delete_owner(owner_id).await
    }
}

fn render_system_prompt(context: &str) -> String {
    let rendered = if context.is_empty() {
        NO_CONTEXT_MARKER
    } else {
        context
    };
    SYSTEM_PROMPT_TEMPLATE.replace("{context}", rendered)
}

fn apology(err: &RagError) -> String {
    format!(
        "Sorry, I'm having trouble generating a response right now. \
         Please try again later. Error: {err}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_renders_explicit_marker() {
        let prompt = render_system_prompt("");
        assert!(prompt.contains(NO_CONTEXT_MARKER));
        assert!(!prompt.contains("{context}"));
    }

    #[test]
    fn context_is_embedded_verbatim() {
        let prompt = render_system_prompt("Source: notes\nContent: facts\n");
        assert!(prompt.contains("Source: notes\nContent: facts"));
        assert!(!prompt.contains(NO_CONTEXT_MARKER));
    }

    #[test]
    fn apology_carries_the_error_description() {
        let text = apology(&RagError::ProviderUnavailable("ollama".to_string()));
        assert!(text.starts_with("Sorry, I'm having trouble"));
        assert!(text.contains("ollama"));
    }
}
