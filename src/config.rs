use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings for the RAG pipelines, read once at process start.
///
/// Every value has a deployment default; malformed environment values fall
/// back to the default rather than aborting startup.
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Token budget per chunk.
    pub chunk_size: usize,
    /// Overlap budget in tokens; zero disables overlap seeding.
    pub chunk_overlap: usize,
    /// Context budget in characters of raw retrieved content.
    pub max_context_length: usize,
    pub max_retrieved_chunks: usize,
    pub similarity_threshold: f32,
    /// How many recent messages feed the generation prompt.
    pub history_limit: usize,
    pub default_provider: String,
    /// Ceiling on a single generation backend call.
    pub generation_timeout: Duration,

    pub embedding_base_url: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    /// Optional HuggingFace tokenizer.json for exact token counts.
    pub tokenizer_path: Option<PathBuf>,

    pub ollama_base_url: String,
    pub ollama_model: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    pub huggingface_api_key: String,
    pub huggingface_model: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            max_context_length: 4000,
            max_retrieved_chunks: 5,
            similarity_threshold: 0.5,
            history_limit: 10,
            default_provider: "ollama".to_string(),
            generation_timeout: Duration::from_secs(60),
            embedding_base_url: "http://localhost:11434".to_string(),
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            embedding_dimension: 384,
            tokenizer_path: None,
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama2:latest".to_string(),
            openai_api_key: String::new(),
            openai_model: "gpt-3.5-turbo".to_string(),
            anthropic_api_key: String::new(),
            anthropic_model: "claude-3-sonnet-20240229".to_string(),
            huggingface_api_key: String::new(),
            huggingface_model: "meta-llama/Llama-2-7b-chat-hf".to_string(),
        }
    }
}

impl RagConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chunk_size: env_parse("CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: env_parse("CHUNK_OVERLAP", defaults.chunk_overlap),
            max_context_length: env_parse("MAX_CONTEXT_LENGTH", defaults.max_context_length),
            max_retrieved_chunks: env_parse("MAX_RETRIEVED_CHUNKS", defaults.max_retrieved_chunks),
            similarity_threshold: env_parse("SIMILARITY_THRESHOLD", defaults.similarity_threshold),
            history_limit: env_parse("HISTORY_LIMIT", defaults.history_limit),
            default_provider: env_string("DEFAULT_LLM_PROVIDER", &defaults.default_provider),
            generation_timeout: Duration::from_secs(env_parse("GENERATION_TIMEOUT_SECS", 60)),
            embedding_base_url: env_string("EMBEDDING_BASE_URL", &defaults.embedding_base_url),
            embedding_model: env_string("EMBEDDING_MODEL", &defaults.embedding_model),
            embedding_dimension: env_parse("EMBEDDING_DIMENSION", defaults.embedding_dimension),
            tokenizer_path: env::var("TOKENIZER_PATH").ok().map(PathBuf::from),
            ollama_base_url: env_string("OLLAMA_BASE_URL", &defaults.ollama_base_url),
            ollama_model: env_string("OLLAMA_MODEL", &defaults.ollama_model),
            openai_api_key: env_string("OPENAI_API_KEY", ""),
            openai_model: env_string("OPENAI_MODEL", &defaults.openai_model),
            anthropic_api_key: env_string("ANTHROPIC_API_KEY", ""),
            anthropic_model: env_string("ANTHROPIC_MODEL", &defaults.anthropic_model),
            huggingface_api_key: env_string("HUGGINGFACE_API_KEY", ""),
            huggingface_model: env_string("HF_MODEL", &defaults.huggingface_model),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_values() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.max_context_length, 4000);
        assert_eq!(config.max_retrieved_chunks, 5);
        assert!((config.similarity_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.default_provider, "ollama");
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        env::set_var("STUDYRAG_TEST_BAD_USIZE", "not-a-number");
        assert_eq!(env_parse("STUDYRAG_TEST_BAD_USIZE", 7usize), 7);
        env::remove_var("STUDYRAG_TEST_BAD_USIZE");
    }
}
