//! Prompt context and user-facing source references.

use crate::chunk::Chunk;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum snippet length for source references, in characters.
pub const MAX_SNIPPET_CHARS: usize = 500;

/// A chunk an answer was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub chunk_id: String,
    pub parent_id: String,
    /// Original URL or path of the document
    pub source: String,
    pub page: u32,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl SourceRef {
    /// Location shown next to the snippet, pages counted from 1.
    pub fn location(&self) -> String {
        format!("{} (page {})", self.source, self.page + 1)
    }
}

/// Number the chunks and separate them for the prompt.
pub fn build_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Document {}]\n{}", i + 1, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// One reference per distinct chunk id, in retrieval order.
pub fn source_refs(chunks: &[Chunk]) -> Vec<SourceRef> {
    let mut seen = HashSet::new();

    chunks
        .iter()
        .filter(|chunk| seen.insert(chunk.chunk_id.as_str()))
        .map(|chunk| SourceRef {
            chunk_id: chunk.chunk_id.clone(),
            parent_id: chunk.parent_id.clone(),
            source: chunk.parent_source.clone(),
            page: chunk.page,
            snippet: truncate_snippet(&chunk.text, MAX_SNIPPET_CHARS),
            rerank_score: chunk.rerank_score,
        })
        .collect()
}

/// Cut `text` to at most `max_chars` characters, marking the cut with "...".
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_end, _)) => format!("{}...", &text[..byte_end]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(parent: &str, index: u32, text: &str) -> Chunk {
        Chunk::new(parent, "https://x.org/a.pdf", 2, index, text, (0, text.len()), "t")
    }

    #[test]
    fn test_build_context() {
        let context = build_context(&[chunk("a", 0, "one"), chunk("a", 1, "two")]);
        assert_eq!(context, "[Document 1]\none\n\n---\n\n[Document 2]\ntwo");
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn test_source_refs_dedup_by_chunk_id() {
        let refs = source_refs(&[chunk("a", 0, "one"), chunk("b", 0, "x"), chunk("a", 0, "one")]);
        let ids: Vec<&str> = refs.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a_p2_c0", "b_p2_c0"]);
        assert_eq!(refs[0].location(), "https://x.org/a.pdf (page 3)");
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("short", 500), "short");
        assert_eq!(truncate_snippet("abcdef", 3), "abc...");
        assert_eq!(truncate_snippet("ééééé", 2), "éé...");

        let long = "x".repeat(600);
        let snippet = truncate_snippet(&long, MAX_SNIPPET_CHARS);
        assert_eq!(snippet.chars().count(), MAX_SNIPPET_CHARS + 3);
    }
}
