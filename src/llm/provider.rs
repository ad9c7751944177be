use async_trait::async_trait;

use super::types::{ChatMessage, GenerationOptions};
use crate::errors::RagError;

/// One interchangeable generation backend.
///
/// Availability can change between calls (keys rotated, local runtime gone),
/// so callers probe `is_available` per request and never cache the answer.
#[async_trait]
pub trait GenerationProvider: Send + Sync + std::fmt::Debug {
    /// Registry key, e.g. "ollama", "openai".
    fn name(&self) -> &str;

    /// Probe the backend: credential presence or a lightweight liveness
    /// check against a local runtime.
    async fn is_available(&self) -> bool;

    /// Translate the role-tagged messages into the backend's wire format
    /// and return the generated text.
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String, RagError>;
}
