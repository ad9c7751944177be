use thiserror::Error;

/// Error taxonomy for the RAG pipelines.
///
/// Components return these as values; nothing here is expected to escape
/// past the `RagEngine`, which decides fatal-vs-degraded per call.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("chunking failed: {0}")]
    Chunking(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("vector store failure: {0}")]
    VectorStore(String),
    #[error("message store failure: {0}")]
    MessageStore(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider '{0}' is not available")]
    ProviderUnavailable(String),
    #[error("no generation provider is available")]
    NoProviderAvailable,
    #[error("generation failed via '{provider}': {message}")]
    Generation { provider: String, message: String },
    /// Structurally impossible given the owner predicate in every store
    /// query; observing it means a query-construction bug. Always fatal.
    #[error("owner isolation violated for owner '{0}'")]
    IsolationViolation(String),
}

impl RagError {
    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        RagError::Embedding(err.to_string())
    }

    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        RagError::VectorStore(err.to_string())
    }

    pub fn messages<E: std::fmt::Display>(err: E) -> Self {
        RagError::MessageStore(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(provider: &str, err: E) -> Self {
        RagError::Generation {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}
