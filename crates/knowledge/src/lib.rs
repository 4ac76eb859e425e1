//! Document knowledge for ragchat.
//!
//! Turns PDFs (local or downloaded) into page-aware chunks, embeds them into a
//! persistent SQLite-backed index and answers questions over it through
//! [`RagPipeline`], optionally reranking whole parent documents first.

pub mod chunk;
pub mod document;
pub mod embeddings;
pub mod pipeline;
pub mod rerank;
pub mod retriever;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use chunk::{Chunk, ChunkConfig, Chunker};
pub use document::DocumentSource;
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use pipeline::{
    ChainAnswer, PipelineOptions, PipelineParts, RagChain, RagPipeline, SourceRef,
};
pub use rerank::{create_scorer, ParentReranker, RelevanceScorer};
pub use retriever::Retriever;
pub use store::VectorStore;
pub use types::{DocumentInput, IngestReport, Page, ParsedDocument, SkippedSource, StoreStats};
