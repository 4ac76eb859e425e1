//! Boundary-preferring text splitter backed by the text-splitter crate.

use super::ChunkConfig;
use ragchat_core::{AppError, AppResult};
use text_splitter::{Characters, ChunkConfig as SplitterConfig, TextSplitter};

/// A piece of page text and its byte offset in that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'t> {
    pub offset: usize,
    pub text: &'t str,
}

impl Span<'_> {
    pub fn byte_range(&self) -> (usize, usize) {
        (self.offset, self.offset + self.text.len())
    }
}

/// Trait for page splitters.
pub trait ChunkSplitter: Send + Sync {
    /// Identifier recorded in chunk metadata.
    fn name(&self) -> &'static str;

    /// Split text into non-empty spans in document order.
    fn split<'t>(&self, text: &'t str) -> Vec<Span<'t>>;
}

/// Recursive splitter: paragraphs, then sentences, then words, then graphemes.
///
/// Chunks hold at most `chunk_size` characters and consecutive chunks share up
/// to `chunk_overlap` characters.
pub struct RecursiveSplitter {
    inner: TextSplitter<Characters>,
}

impl RecursiveSplitter {
    pub fn new(config: &ChunkConfig) -> AppResult<Self> {
        config.validate()?;

        let splitter_config = SplitterConfig::new(config.chunk_size)
            .with_overlap(config.chunk_overlap)
            .map_err(|e| AppError::Config(format!("Invalid chunk configuration: {}", e)))?;

        Ok(Self {
            inner: TextSplitter::new(splitter_config),
        })
    }
}

impl ChunkSplitter for RecursiveSplitter {
    fn name(&self) -> &'static str {
        "text-splitter"
    }

    fn split<'t>(&self, text: &'t str) -> Vec<Span<'t>> {
        self.inner
            .chunk_indices(text)
            .filter(|(_, chunk)| !chunk.trim().is_empty())
            .map(|(offset, text)| Span { offset, text })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(size: usize, overlap: usize) -> RecursiveSplitter {
        RecursiveSplitter::new(&ChunkConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
        .unwrap()
    }

    #[test]
    fn test_spans_within_size() {
        let text = "This is a test sentence. ".repeat(200);
        let spans = splitter(100, 20).split(&text);

        assert!(spans.len() > 1);
        for span in &spans {
            assert!(span.text.chars().count() <= 100);
            assert_eq!(&text[span.offset..span.offset + span.text.len()], span.text);
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let para_a = "Setup. Each player takes seven cards.";
        let para_b = "Play. The youngest player goes first.";
        let text = format!("{}\n\n{}", para_a, para_b);

        let spans = splitter(45, 0).split(&text);
        let texts: Vec<&str> = spans.iter().map(|s| s.text).collect();
        assert_eq!(texts, vec![para_a, para_b]);
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let text = "a".repeat(250);
        let spans = splitter(100, 0).split(&text);
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[2].byte_range(), (200, 250));
    }

    #[test]
    fn test_overlap_shares_text() {
        let text = (0..60)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let spans = splitter(80, 30).split(&text);

        assert!(spans.len() > 1);
        for pair in spans.windows(2) {
            let (_, prev_end) = pair[0].byte_range();
            assert!(pair[1].offset < prev_end, "consecutive chunks should overlap");
        }
    }

    #[test]
    fn test_whitespace_only() {
        assert!(splitter(100, 10).split("   \n\n\t ").is_empty());
    }

    #[test]
    fn test_utf8_safety() {
        let text = "Acentuação: ã, õ, ç. Emoji: 🎮 🚀. ".repeat(40);
        for span in splitter(50, 10).split(&text) {
            assert!(text.is_char_boundary(span.offset));
            assert!(span.text.chars().count() <= 50);
        }
    }

    #[test]
    fn test_invalid_overlap() {
        let result = RecursiveSplitter::new(&ChunkConfig {
            chunk_size: 50,
            chunk_overlap: 50,
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
