//! Chunking of paged documents into addressable, overlapping text spans.
//!
//! Each chunk carries a deterministic id derived from its parent document,
//! page and position, so re-running ingestion with the same parameters yields
//! the same ids.

mod metadata;
mod pipeline;
mod splitter;

pub use metadata::{calculate_hash, chunk_id_for, parent_id_for, UNKNOWN_PARENT};
pub use pipeline::{group_by_source, ChunkConfig, Chunker};
pub use splitter::{ChunkSplitter, RecursiveSplitter, Span};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bounded span of document text, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{parent_id}_p{page}_c{chunk_index}`
    pub chunk_id: String,

    /// Source document identifier (filename stem), shared by all its chunks
    pub parent_id: String,

    /// Original URL or path of the document
    pub parent_source: String,

    pub page: u32,

    /// Position within the parent's chunk sequence
    pub chunk_index: u32,

    /// Number of chunks the parent produced
    pub total_chunks: u32,

    pub text: String,

    pub metadata: ChunkMetadata,

    /// Set during a single reranking pass; never persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

/// Metadata about a chunk's origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Byte range within the page text
    pub byte_range: (usize, usize),

    pub char_count: usize,

    /// SHA-256 hash of chunk text
    pub hash: String,

    pub created_at: DateTime<Utc>,

    pub splitter_used: String,
}

impl Chunk {
    /// Create a chunk; `total_chunks` is filled in once the parent is fully split.
    pub fn new(
        parent_id: &str,
        parent_source: &str,
        page: u32,
        chunk_index: u32,
        text: &str,
        byte_range: (usize, usize),
        splitter_used: &str,
    ) -> Self {
        Self {
            chunk_id: chunk_id_for(parent_id, page, chunk_index),
            parent_id: parent_id.to_string(),
            parent_source: parent_source.to_string(),
            page,
            chunk_index,
            total_chunks: 0,
            text: text.to_string(),
            metadata: ChunkMetadata {
                byte_range,
                char_count: text.chars().count(),
                hash: calculate_hash(text),
                created_at: Utc::now(),
                splitter_used: splitter_used.to_string(),
            },
            rerank_score: None,
        }
    }

    /// Ordering key used to rebuild a parent in reading order.
    pub fn reading_order(&self) -> (u32, u32) {
        (self.page, self.chunk_index)
    }
}
