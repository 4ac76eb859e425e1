//! Chunking pipeline: group pages by document, order them, split and number.

use super::splitter::{ChunkSplitter, RecursiveSplitter};
use super::{parent_id_for, Chunk};
use crate::types::{Page, ParsedDocument};
use ragchat_core::config::ChunkingSettings;
use ragchat_core::{AppError, AppResult};
use std::collections::HashMap;

/// Chunk size and overlap, in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 80,
        }
    }
}

impl From<&ChunkingSettings> for ChunkConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}

impl ChunkConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be greater than 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Splits documents into chunks with stable identifiers.
pub struct Chunker {
    config: ChunkConfig,
    splitter: Box<dyn ChunkSplitter>,
}

impl Chunker {
    /// Create a chunker using the recursive text splitter.
    pub fn new(config: ChunkConfig) -> AppResult<Self> {
        let splitter = RecursiveSplitter::new(&config)?;
        Ok(Self {
            config,
            splitter: Box::new(splitter),
        })
    }

    /// Create a chunker with a custom splitter.
    pub fn with_splitter(config: ChunkConfig, splitter: Box<dyn ChunkSplitter>) -> Self {
        Self { config, splitter }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Chunk every document, in first-seen source order.
    pub fn chunk_documents(&self, documents: &[ParsedDocument]) -> Vec<Chunk> {
        let mut seen_parents: HashMap<String, &str> = HashMap::new();
        let mut chunks = Vec::new();

        for (source, pages) in group_by_source(documents) {
            let parent_id = parent_id_for(source);
            if let Some(previous) = seen_parents.insert(parent_id.clone(), source) {
                tracing::warn!(
                    parent_id = %parent_id,
                    previous,
                    source,
                    "Two sources share a parent id; only the first one will be indexed"
                );
            }

            let document_chunks = self.chunk_document(&parent_id, source, &pages);
            tracing::debug!(
                parent_id = %parent_id,
                pages = pages.len(),
                chunks = document_chunks.len(),
                "Chunked document"
            );
            chunks.extend(document_chunks);
        }

        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            chunk_size = self.config.chunk_size,
            chunk_overlap = self.config.chunk_overlap,
            "Chunking complete"
        );

        chunks
    }

    /// Chunk one document whose pages are already in reading order.
    fn chunk_document(&self, parent_id: &str, source: &str, pages: &[&Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in pages {
            for span in self.splitter.split(&page.text) {
                chunks.push(Chunk::new(
                    parent_id,
                    source,
                    page.number,
                    chunks.len() as u32,
                    span.text,
                    span.byte_range(),
                    self.splitter.name(),
                ));
            }
        }

        let total = chunks.len() as u32;
        for chunk in &mut chunks {
            chunk.total_chunks = total;
        }

        chunks
    }
}

/// Group pages by document source, keeping first-seen order, pages ascending.
pub fn group_by_source(documents: &[ParsedDocument]) -> Vec<(&str, Vec<&Page>)> {
    let mut groups: Vec<(&str, Vec<&Page>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for document in documents {
        let slot = *index.entry(document.source.as_str()).or_insert_with(|| {
            groups.push((document.source.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.extend(document.pages.iter());
    }

    for (_, pages) in &mut groups {
        pages.sort_by_key(|page| page.number);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn rules_document() -> ParsedDocument {
        let page = |n: u32| {
            Page::new(
                n,
                format!(
                    "Page {} rules. Each player draws two cards at the start of a turn. \
                     A player who cannot play must pass. Rounds end when every player passed.\n\n",
                    n
                )
                .repeat(12),
            )
        };
        // pages deliberately out of order
        ParsedDocument::new("https://example.com/Rules.pdf", vec![page(2), page(0), page(1)])
    }

    #[test]
    fn test_rules_scenario() {
        let chunker = Chunker::new(ChunkConfig::default()).unwrap();
        let chunks = chunker.chunk_documents(&[rules_document()]);

        assert!(chunks.len() > 3);
        let total = chunks.len() as u32;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.parent_id, "Rules");
            assert_eq!(chunk.parent_source, "https://example.com/Rules.pdf");
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(chunk.total_chunks, total);
            assert_eq!(chunk.chunk_id, format!("Rules_p{}_c{}", chunk.page, i));
            assert!(chunk.text.chars().count() <= 800);
        }

        let pages: Vec<u32> = chunks.iter().map(|c| c.page).collect();
        let mut sorted = pages.clone();
        sorted.sort();
        assert_eq!(pages, sorted, "chunks must follow page order");
    }

    #[test]
    fn test_chunk_ids_unique_and_stable() {
        let chunker = Chunker::new(ChunkConfig::default()).unwrap();
        let first = chunker.chunk_documents(&[rules_document()]);
        let second = chunker.chunk_documents(&[rules_document()]);

        let ids: HashSet<&str> = first.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids.len(), first.len());

        let first_ids: Vec<&str> = first.iter().map(|c| c.chunk_id.as_str()).collect();
        let second_ids: Vec<&str> = second.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_non_overlapping_portions_reconstruct_pages() {
        let config = ChunkConfig {
            chunk_size: 120,
            chunk_overlap: 30,
        };
        let chunker = Chunker::new(config).unwrap();
        let document = rules_document();
        let chunks = chunker.chunk_documents(std::slice::from_ref(&document));

        for page in &document.pages {
            let mut page_chunks: Vec<&Chunk> =
                chunks.iter().filter(|c| c.page == page.number).collect();
            page_chunks.sort_by_key(|c| c.reading_order());

            let mut rebuilt = String::new();
            let mut covered = 0usize;
            for chunk in page_chunks {
                let (start, end) = chunk.metadata.byte_range;
                assert_eq!(&page.text[start..end], chunk.text);
                if end > covered {
                    rebuilt.push_str(&page.text[start.max(covered)..end]);
                    covered = end;
                }
            }

            let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
            assert_eq!(strip(&rebuilt), strip(&page.text));
        }
    }

    #[test]
    fn test_groups_by_source_in_insertion_order() {
        let docs = vec![
            ParsedDocument::new("b.pdf", vec![Page::new(1, "b one")]),
            ParsedDocument::new("a.pdf", vec![Page::new(0, "a zero")]),
            ParsedDocument::new("b.pdf", vec![Page::new(0, "b zero")]),
        ];

        let groups = group_by_source(&docs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "b.pdf");
        assert_eq!(groups[1].0, "a.pdf");
        let numbers: Vec<u32> = groups[0].1.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![0, 1]);

        let chunker = Chunker::new(ChunkConfig::default()).unwrap();
        let chunks = chunker.chunk_documents(&docs);
        let ids: Vec<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["b_p0_c0", "b_p1_c1", "a_p0_c0"]);
        assert_eq!(chunks[0].total_chunks, 2);
        assert_eq!(chunks[2].total_chunks, 1);
    }

    #[test]
    fn test_empty_pages_produce_no_chunks() {
        let chunker = Chunker::new(ChunkConfig::default()).unwrap();
        let docs = vec![ParsedDocument::new(
            "blank.pdf",
            vec![Page::new(0, "  \n "), Page::new(1, "Only text.")],
        )];
        let chunks = chunker.chunk_documents(&docs);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, "blank_p1_c0");
    }

    #[test]
    fn test_invalid_config() {
        let result = Chunker::new(ChunkConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
