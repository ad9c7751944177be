use crate::store::RetrievalHit;

/// Builds the bounded context block fed into the system prompt.
pub struct ContextAssembler {
    max_length: usize,
}

impl ContextAssembler {
    /// `max_length` is measured in characters of raw hit content; the label
    /// boilerplate around each block does not count against it.
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Format hits, in their given ranked order, into labeled blocks until
    /// the next block would exceed the budget. Truncation is block-granular,
    /// never mid-block. No hits yields an empty string; the prompt template
    /// renders that case as an explicit marker.
    pub fn assemble(&self, hits: &[RetrievalHit]) -> String {
        let mut blocks = Vec::new();
        let mut used = 0usize;

        for hit in hits {
            let content_len = hit.content.chars().count();
            if used + content_len > self.max_length {
                break;
            }
            blocks.push(format!(
                "Source: {}\nContent: {}\n",
                hit.metadata.title, hit.content
            ));
            used += content_len;
        }

        blocks.join("\n")
    }
}
