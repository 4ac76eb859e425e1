//! Retrieval strategies over a loaded vector index.

use crate::chunk::Chunk;
use crate::embeddings::EmbeddingProvider;
use crate::rerank::ParentReranker;
use crate::store::VectorStore;
use ragchat_core::AppResult;
use std::sync::Arc;

/// Returns the chunks that should ground an answer to `query`.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;

    async fn retrieve(&self, query: &str) -> AppResult<Vec<Chunk>>;
}

/// Flat top-k by raw similarity.
pub struct SimilarityRetriever {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    k: usize,
}

impl SimilarityRetriever {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn EmbeddingProvider>, k: usize) -> Self {
        Self { store, embedder, k }
    }

    /// Top-k chunks with their similarity scores.
    pub async fn retrieve_scored(&self, query: &str) -> AppResult<Vec<(Chunk, f32)>> {
        let query_embedding = self.embedder.embed(query).await?;
        Ok(self.store.search(&query_embedding, self.k))
    }
}

#[async_trait::async_trait]
impl Retriever for SimilarityRetriever {
    fn name(&self) -> &str {
        "similarity"
    }

    async fn retrieve(&self, query: &str) -> AppResult<Vec<Chunk>> {
        let results = self.retrieve_scored(query).await?;
        tracing::debug!(k = self.k, returned = results.len(), "Similarity retrieval");
        Ok(results.into_iter().map(|(chunk, _)| chunk).collect())
    }
}

/// Top parents by aggregate relevance.
pub struct RerankingRetriever {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: ParentReranker,
}

impl RerankingRetriever {
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: ParentReranker,
    ) -> Self {
        Self {
            store,
            embedder,
            reranker,
        }
    }
}

#[async_trait::async_trait]
impl Retriever for RerankingRetriever {
    fn name(&self) -> &str {
        "reranking"
    }

    async fn retrieve(&self, query: &str) -> AppResult<Vec<Chunk>> {
        let chunks = self
            .reranker
            .rerank(&self.store, self.embedder.as_ref(), query)
            .await?;
        tracing::debug!(
            top_k_chunks = self.reranker.top_k_chunks(),
            top_k_parents = self.reranker.top_k_parents(),
            returned = chunks.len(),
            "Reranking retrieval"
        );
        Ok(chunks)
    }
}
