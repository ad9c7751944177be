//! Token-aware sentence chunking.
//!
//! Text is normalized once, split into sentences on terminal punctuation,
//! then accumulated greedily under a token budget. Sentences are never split
//! mid-way: a single sentence longer than the budget is emitted as its own
//! oversized chunk.

use std::sync::OnceLock;

use regex::Regex;

use super::tokens::TokenCounter;

/// Sentences carried over from a closed chunk into the next one.
const OVERLAP_SENTENCES: usize = 2;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn charset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s.,!?;:\-()\[\]]").expect("static regex"))
}

fn sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("static regex"))
}

/// Normalize raw document text before sentence splitting.
///
/// Collapses whitespace runs, drops characters outside the alphanumeric +
/// basic punctuation set, and folds all line-break variants into spaces.
pub fn clean_text(text: &str) -> String {
    let unbroken = text.replace(['\n', '\r'], " ");
    let stripped = charset_re().replace_all(&unbroken, "");
    let collapsed = whitespace_re().replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

/// Split normalized text into sentences on terminal punctuation.
///
/// The delimiters are consumed, so sentences carry no trailing punctuation;
/// empty and whitespace-only fragments are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    sentence_re()
        .split(text)
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(str::to_string)
        .collect()
}

/// Greedily accumulate sentences into chunks of at most `chunk_size` tokens.
///
/// When a chunk closes and `chunk_overlap > 0`, the next chunk is seeded
/// with the trailing two sentences of the closed chunk. A seeded chunk may
/// exceed the budget by up to one sentence beyond its overlap portion; this
/// tolerance is deliberate and favors semantic continuity over a strict
/// size guarantee.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    counter: &dyn TokenCounter,
) -> Vec<String> {
    let sentences = split_sentences(text);
    let mut chunks: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for sentence in sentences {
        let candidate = if current.is_empty() {
            sentence.clone()
        } else {
            format!("{} {}", current.join(" "), sentence)
        };

        if counter.count(&candidate) <= chunk_size {
            current.push(sentence);
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if chunk_overlap > 0 {
            if let Some(prev) = chunks.last() {
                let tail = prev.len().saturating_sub(OVERLAP_SENTENCES);
                current.extend_from_slice(&prev[tail..]);
            }
        }
        current.push(sentence);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks.into_iter().map(|parts| parts.join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tokens::ApproxTokenCounter;

    #[test]
    fn clean_text_normalizes_whitespace_and_charset() {
        let cleaned = clean_text("Hello\r\n  world\t—with «noise»!  ");
        assert_eq!(cleaned, "Hello world with noise!");
    }

    #[test]
    fn split_sentences_drops_empty_fragments() {
        let sentences = split_sentences("First one. Second!?  . Third?");
        assert_eq!(sentences, vec!["First one", "Second", "Third"]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunks = chunk_text("", 100, 10, &ApproxTokenCounter);
        assert!(chunks.is_empty());

        let chunks = chunk_text("   \n\t ", 100, 10, &ApproxTokenCounter);
        assert!(chunks.is_empty());
    }

    #[test]
    fn small_document_fits_one_chunk() {
        let chunks = chunk_text(
            "Sentence one. Sentence two. Sentence three.",
            100,
            10,
            &ApproxTokenCounter,
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Sentence one Sentence two Sentence three");
    }

    #[test]
    fn tiny_budget_forces_one_sentence_per_chunk_with_overlap() {
        let chunks = chunk_text(
            "Sentence one. Sentence two. Sentence three.",
            2,
            1,
            &ApproxTokenCounter,
        );
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "Sentence one");
        // each chunk starts with the tail of the previous one
        assert!(chunks[1].starts_with("Sentence one"));
        assert!(chunks[1].contains("Sentence two"));
        assert!(chunks[2].contains("Sentence three"));
    }

    #[test]
    fn overlap_zero_disables_seeding() {
        let chunks = chunk_text(
            "Sentence one. Sentence two. Sentence three.",
            2,
            0,
            &ApproxTokenCounter,
        );
        assert_eq!(
            chunks,
            vec!["Sentence one", "Sentence two", "Sentence three"]
        );
    }

    #[test]
    fn oversized_sentence_is_emitted_whole() {
        let long = "this single sentence has far more words than the budget allows";
        let text = format!("{long}. Short one.");
        let chunks = chunk_text(&text, 3, 0, &ApproxTokenCounter);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], long);
        assert_eq!(chunks[1], "Short one");
    }

    #[test]
    fn overlap_continuity_holds_across_chunks() {
        // two-word sentences, so the two-sentence overlap is four words
        let text = "Alpha beta. Gamma delta. Epsilon zeta. Eta theta. Iota kappa.";
        let chunks = chunk_text(text, 4, 1, &ApproxTokenCounter);
        assert!(chunks.len() >= 2);
        for window in chunks.windows(2) {
            let prev_words: Vec<&str> = window[0].split_whitespace().collect();
            let tail = prev_words[prev_words.len().saturating_sub(4)..].join(" ");
            assert!(
                window[1].starts_with(&tail),
                "chunk {:?} should start with the tail of {:?}",
                window[1],
                window[0]
            );
        }
    }
}
