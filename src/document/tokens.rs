use std::path::Path;

use tokenizers::Tokenizer;

use crate::errors::RagError;

/// Counting measure used by the chunker. The same counter must be used for
/// chunking and for the per-chunk `token_count` it records.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Exact token counts from a HuggingFace `tokenizer.json`.
pub struct HfTokenCounter {
    inner: Tokenizer,
}

impl HfTokenCounter {
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        let inner = Tokenizer::from_file(path)
            .map_err(|err| RagError::Chunking(format!("failed to load tokenizer: {err}")))?;
        Ok(Self { inner })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        self.inner
            .encode(text, false)
            .map(|encoding| encoding.get_ids().len())
            .unwrap_or(0)
    }
}

/// Whitespace-word approximation, used when no tokenizer file is configured.
///
/// Counts are coarse but monotone in text length, which is all the greedy
/// chunker needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxTokenCounter;

impl TokenCounter for ApproxTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}
