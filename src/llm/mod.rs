//! Generation backends and the provider registry.

mod anthropic;
mod huggingface;
mod ollama;
mod openai;
mod provider;
mod registry;
mod types;

pub use anthropic::AnthropicProvider;
pub use huggingface::HuggingFaceProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::GenerationProvider;
pub use registry::ProviderRegistry;
pub use types::{ChatMessage, GenerationOptions};
