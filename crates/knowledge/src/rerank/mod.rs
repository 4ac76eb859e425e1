//! Parent-grouping reranker.
//!
//! Candidate chunks from a similarity search are grouped by the document they
//! came from, each document's retrieved text is scored against the query as a
//! whole, and the chunks of the best-scoring documents are returned.

pub mod scorers;

pub use scorers::{create_scorer, CrossEncoderScorer, LlmScorer, TermOverlapScorer};

use crate::chunk::Chunk;
use crate::embeddings::EmbeddingProvider;
use crate::store::VectorStore;
use ragchat_core::AppResult;
use std::collections::HashMap;
use std::sync::Arc;

/// Scores how relevant a passage is to a query; higher is more relevant.
#[async_trait::async_trait]
pub trait RelevanceScorer: Send + Sync {
    fn name(&self) -> &str;

    async fn score(&self, query: &str, text: &str) -> AppResult<f32>;
}

/// Groups candidates by parent document and keeps the top documents.
#[derive(Clone)]
pub struct ParentReranker {
    scorer: Arc<dyn RelevanceScorer>,
    top_k_chunks: usize,
    top_k_parents: usize,
}

impl ParentReranker {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, top_k_chunks: usize, top_k_parents: usize) -> Self {
        Self {
            scorer,
            top_k_chunks,
            top_k_parents,
        }
    }

    pub fn top_k_chunks(&self) -> usize {
        self.top_k_chunks
    }

    pub fn top_k_parents(&self) -> usize {
        self.top_k_parents
    }

    /// Over-fetch `top_k_chunks` candidates and rerank them by parent.
    pub async fn rerank(
        &self,
        store: &VectorStore,
        embedder: &dyn EmbeddingProvider,
        query: &str,
    ) -> AppResult<Vec<Chunk>> {
        let query_embedding = embedder.embed(query).await?;
        let candidates = store.search(&query_embedding, self.top_k_chunks);
        Ok(self.rerank_candidates(query, candidates).await)
    }

    /// Rerank already-retrieved candidates.
    ///
    /// Within a selected parent, chunks are emitted in reading order and carry
    /// the parent's score in `rerank_score`. A parent whose scoring fails gets
    /// 0.0 and stays in the ranking.
    pub async fn rerank_candidates(&self, query: &str, candidates: Vec<(Chunk, f32)>) -> Vec<Chunk> {
        let groups = group_by_parent(candidates.into_iter().map(|(chunk, _)| chunk));

        let mut ranked: Vec<(f32, String, Vec<Chunk>)> = Vec::with_capacity(groups.len());
        for (parent_id, chunks) in groups {
            let full_text = chunks
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");

            let score = match self.scorer.score(query, &full_text).await {
                Ok(score) if score.is_finite() => score,
                Ok(score) => {
                    tracing::warn!(parent_id = %parent_id, score, "Non-finite rerank score, using 0.0");
                    0.0
                }
                Err(e) => {
                    tracing::warn!(
                        parent_id = %parent_id,
                        scorer = self.scorer.name(),
                        error = %e,
                        "Failed to score parent, using 0.0"
                    );
                    0.0
                }
            };
            tracing::info!(parent_id = %parent_id, "Rerank score for parent: {:.4}", score);

            ranked.push((score, parent_id, chunks));
        }

        // stable: equal scores keep first-seen order
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut selected = Vec::new();
        for (rank, (score, parent_id, chunks)) in
            ranked.into_iter().take(self.top_k_parents).enumerate()
        {
            tracing::info!(
                parent_id = %parent_id,
                chunks = chunks.len(),
                "Selected parent {}: {} (Score: {:.4})",
                rank + 1,
                parent_id,
                score
            );
            selected.extend(chunks.into_iter().map(|mut chunk| {
                chunk.rerank_score = Some(score);
                chunk
            }));
        }

        selected
    }
}

/// Group chunks by parent in first-seen order, each group in reading order.
///
/// A chunk without a parent id starts a group named `doc_{n}`, `n` being the
/// number of groups so far.
fn group_by_parent(chunks: impl Iterator<Item = Chunk>) -> Vec<(String, Vec<Chunk>)> {
    let mut groups: Vec<(String, Vec<Chunk>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for chunk in chunks {
        // each orphan is its own group and is never looked up by label
        if chunk.parent_id.is_empty() {
            groups.push((format!("doc_{}", groups.len()), vec![chunk]));
            continue;
        }

        match index.get(&chunk.parent_id) {
            Some(&slot) => groups[slot].1.push(chunk),
            None => {
                index.insert(chunk.parent_id.clone(), groups.len());
                groups.push((chunk.parent_id.clone(), vec![chunk]));
            }
        }
    }

    for (_, chunks) in &mut groups {
        chunks.sort_by_key(|c| c.reading_order());
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_core::AppError;
    use std::sync::Mutex;

    /// Scores by looking up a keyword in the text; records every call.
    struct ScriptedScorer {
        scores: Vec<(&'static str, f32)>,
        fail_on: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedScorer {
        fn new(scores: Vec<(&'static str, f32)>) -> Self {
            Self {
                scores,
                fail_on: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl RelevanceScorer for ScriptedScorer {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn score(&self, _query: &str, text: &str) -> AppResult<f32> {
            self.calls.lock().unwrap().push(text.to_string());
            if let Some(marker) = self.fail_on {
                if text.contains(marker) {
                    return Err(AppError::Other("scorer unavailable".to_string()));
                }
            }
            Ok(self
                .scores
                .iter()
                .find(|(marker, _)| text.contains(marker))
                .map(|(_, s)| *s)
                .unwrap_or(0.5))
        }
    }

    fn chunk(parent: &str, page: u32, index: u32, text: &str) -> (Chunk, f32) {
        (
            Chunk::new(parent, &format!("{}.pdf", parent), page, index, text, (0, text.len()), "test"),
            0.9,
        )
    }

    #[tokio::test]
    async fn test_groups_joined_in_reading_order() {
        let scorer = Arc::new(ScriptedScorer::new(vec![]));
        let reranker = ParentReranker::new(scorer.clone(), 20, 4);

        let candidates = vec![
            chunk("a", 2, 5, "third"),
            chunk("b", 0, 0, "other"),
            chunk("a", 0, 0, "first"),
            chunk("a", 1, 3, "second"),
        ];
        let result = reranker.rerank_candidates("q", candidates).await;

        let calls = scorer.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["first\nsecond\nthird".to_string(), "other".to_string()]);

        let order: Vec<&str> = result.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third", "other"]);
    }

    #[tokio::test]
    async fn test_top_parents_selected_and_annotated() {
        let scorer = Arc::new(ScriptedScorer::new(vec![("high", 3.0), ("low", -2.0)]));
        let reranker = ParentReranker::new(scorer, 20, 1);

        let candidates = vec![
            chunk("x", 0, 0, "low relevance"),
            chunk("y", 0, 0, "high relevance"),
            chunk("y", 0, 1, "continued"),
        ];
        let result = reranker.rerank_candidates("q", candidates).await;

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|c| c.parent_id == "y"));
        assert!(result.iter().all(|c| c.rerank_score == Some(3.0)));
    }

    #[tokio::test]
    async fn test_failed_scoring_counts_as_zero() {
        let mut scripted = ScriptedScorer::new(vec![("neg", -1.0), ("pos", 1.0)]);
        scripted.fail_on = Some("broken");
        let reranker = ParentReranker::new(Arc::new(scripted), 20, 3);

        let candidates = vec![
            chunk("neg", 0, 0, "neg"),
            chunk("broken", 0, 0, "broken"),
            chunk("pos", 0, 0, "pos"),
        ];
        let result = reranker.rerank_candidates("q", candidates).await;

        let parents: Vec<&str> = result.iter().map(|c| c.parent_id.as_str()).collect();
        assert_eq!(parents, vec!["pos", "broken", "neg"]);
        assert_eq!(result[1].rerank_score, Some(0.0));
    }

    #[tokio::test]
    async fn test_ties_keep_first_seen_order() {
        let reranker = ParentReranker::new(Arc::new(ScriptedScorer::new(vec![])), 20, 2);
        let candidates = vec![
            chunk("p1", 0, 0, "a"),
            chunk("p2", 0, 0, "b"),
            chunk("p3", 0, 0, "c"),
        ];

        let result = reranker.rerank_candidates("q", candidates).await;
        let parents: Vec<&str> = result.iter().map(|c| c.parent_id.as_str()).collect();
        assert_eq!(parents, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let reranker = ParentReranker::new(Arc::new(ScriptedScorer::new(vec![])), 20, 4);
        assert!(reranker.rerank_candidates("q", Vec::new()).await.is_empty());
    }

    #[test]
    fn test_missing_parent_gets_positional_key() {
        let mut orphan = Chunk::new("", "x.pdf", 0, 0, "orphan", (0, 6), "test");
        orphan.parent_id = String::new();
        let groups = group_by_parent(
            vec![chunk("a", 0, 0, "one").0, orphan, chunk("a", 0, 1, "two").0].into_iter(),
        );

        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "doc_1"]);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn test_orphan_does_not_absorb_real_parent() {
        let mut orphan = Chunk::new("", "x.pdf", 0, 0, "orphan", (0, 6), "test");
        orphan.parent_id = String::new();
        let groups = group_by_parent(
            vec![orphan, chunk("doc_0", 0, 0, "real").0, chunk("doc_0", 0, 1, "more").0]
                .into_iter(),
        );

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1.len(), 1);
        assert_eq!(groups[0].1[0].text, "orphan");
        assert_eq!(groups[1].0, "doc_0");
        assert_eq!(groups[1].1.len(), 2);
    }
}
