//! Persistent vector index.
//!
//! An index directory holds `index.sqlite` (chunks and f32 vectors) and
//! `manifest.json` (which embedder produced them). Vectors are loaded into
//! memory on open and searched with a cosine full scan.

pub mod sqlite;

pub use sqlite::{cosine_similarity, StoredChunk};

use crate::chunk::Chunk;
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use crate::types::StoreStats;
use chrono::{DateTime, Utc};
use ragchat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.sqlite";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Records which embedder built an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
}

impl Manifest {
    fn for_embedder(embedder: &dyn EmbeddingProvider) -> Self {
        Self {
            provider: embedder.provider_name().to_string(),
            model: embedder.model_name().to_string(),
            dimensions: embedder.dimensions(),
            created_at: Utc::now(),
        }
    }

    fn identity(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: self.provider.clone(),
            model: self.model.clone(),
            dimensions: self.dimensions,
            batch_size: 100,
        }
    }
}

/// A loaded vector index.
#[derive(Debug)]
pub struct VectorStore {
    dir: PathBuf,
    manifest: Manifest,
    entries: Vec<StoredChunk>,
    last_added: usize,
}

impl VectorStore {
    /// Load the index in `dir`.
    ///
    /// Returns `Ok(None)` when there is no index. An unreadable index, or one
    /// built by a different embedder, is moved aside and also yields `None`.
    pub fn open(dir: &Path, embedder: &dyn EmbeddingProvider) -> AppResult<Option<Self>> {
        if !dir.join(INDEX_FILE).exists() {
            return Ok(None);
        }

        match Self::load(dir, embedder) {
            Ok(store) => {
                tracing::info!(
                    path = %dir.display(),
                    chunks = store.len(),
                    "Loaded vector index"
                );
                Ok(Some(store))
            }
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Discarding unusable vector index");
                quarantine(dir)?;
                Ok(None)
            }
        }
    }

    fn load(dir: &Path, embedder: &dyn EmbeddingProvider) -> AppResult<Self> {
        let manifest_text = std::fs::read_to_string(dir.join(MANIFEST_FILE))
            .map_err(|e| AppError::Index(format!("Missing or unreadable manifest: {}", e)))?;
        let manifest: Manifest = serde_json::from_str(&manifest_text)
            .map_err(|e| AppError::Index(format!("Invalid manifest: {}", e)))?;

        manifest.identity().validate_consistency(&embedder.identity())?;

        let conn = sqlite::open_index(&dir.join(INDEX_FILE))?;
        let entries = sqlite::load_chunks(&conn)?;

        if let Some(bad) = entries
            .iter()
            .find(|e| e.embedding.len() != manifest.dimensions)
        {
            return Err(AppError::Index(format!(
                "Chunk {} has {} dimensions, manifest says {}",
                bad.chunk.chunk_id,
                bad.embedding.len(),
                manifest.dimensions
            )));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            entries,
            last_added: 0,
        })
    }

    fn create(dir: &Path, embedder: &dyn EmbeddingProvider) -> AppResult<Self> {
        std::fs::create_dir_all(dir)?;
        sqlite::open_index(&dir.join(INDEX_FILE))?;

        let manifest = Manifest::for_embedder(embedder);
        let manifest_text = serde_json::to_string_pretty(&manifest)
            .map_err(|e| AppError::Serialization(e.to_string()))?;
        std::fs::write(dir.join(MANIFEST_FILE), manifest_text)?;

        tracing::info!(
            path = %dir.display(),
            provider = %manifest.provider,
            model = %manifest.model,
            "Created vector index"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            entries: Vec::new(),
            last_added: 0,
        })
    }

    /// Add `chunks` to the index in `dir`, creating it if needed.
    ///
    /// Chunks whose parent is already indexed are dropped, so re-ingesting a
    /// document is a no-op and makes no embedding calls.
    pub async fn store(
        dir: &Path,
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
    ) -> AppResult<Self> {
        let mut store = match Self::open(dir, embedder)? {
            Some(store) => store,
            None => Self::create(dir, embedder)?,
        };
        store.last_added = 0;

        let existing = store.parent_ids();
        let incoming = chunks.len();
        let fresh = select_new_chunks(chunks, &existing);

        if fresh.is_empty() {
            tracing::info!(incoming, "No new documents to add to the index");
            return Ok(store);
        }

        let texts: Vec<String> = fresh.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != fresh.len() {
            return Err(AppError::Knowledge(format!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                fresh.len()
            )));
        }

        let rows: Vec<StoredChunk> = fresh
            .into_iter()
            .zip(vectors)
            .map(|(chunk, embedding)| StoredChunk { chunk, embedding })
            .collect();

        let mut conn = sqlite::open_index(&dir.join(INDEX_FILE))?;
        sqlite::insert_chunks(&mut conn, &rows)?;

        store.last_added = rows.len();
        store.entries.extend(rows);

        tracing::info!(
            incoming,
            added = store.last_added,
            total = store.len(),
            "Stored chunks in vector index"
        );

        Ok(store)
    }

    /// Top `k` chunks by cosine similarity, highest first.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Vec<(Chunk, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query_embedding, &e.embedding)))
            .collect();

        // stable: ties keep insertion order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        tracing::debug!(requested = k, returned = scored.len(), "Similarity search");

        scored
            .into_iter()
            .map(|(i, score)| (self.entries[i].chunk.clone(), score))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of chunks added by the last `store` call.
    pub fn last_added(&self) -> usize {
        self.last_added
    }

    pub fn parent_ids(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .map(|e| e.chunk.parent_id.clone())
            .collect()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stats(&self) -> AppResult<StoreStats> {
        let mut size_bytes = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let metadata = entry?.metadata()?;
            if metadata.is_file() {
                size_bytes += metadata.len();
            }
        }

        Ok(StoreStats {
            chunks: self.len(),
            parents: self.parent_ids().len(),
            provider: self.manifest.provider.clone(),
            model: self.manifest.model.clone(),
            dimensions: self.manifest.dimensions,
            size_bytes,
            path: self.dir.clone(),
        })
    }
}

/// Drop chunks of already-indexed parents, and of a parent id claimed by an
/// earlier source in the same batch.
fn select_new_chunks(chunks: Vec<Chunk>, existing: &BTreeSet<String>) -> Vec<Chunk> {
    let mut owner: HashMap<String, String> = HashMap::new();

    chunks
        .into_iter()
        .filter(|chunk| {
            if existing.contains(&chunk.parent_id) {
                return false;
            }
            let claimed = owner
                .entry(chunk.parent_id.clone())
                .or_insert_with(|| chunk.parent_source.clone());
            *claimed == chunk.parent_source
        })
        .collect()
}

/// Move an unusable index out of the way, deleting it if renaming fails.
fn quarantine(dir: &Path) -> AppResult<()> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "index".to_string());
    let target = dir.with_file_name(format!(
        "{}.corrupt-{}",
        name,
        Utc::now().format("%Y%m%d%H%M%S%3f")
    ));

    match std::fs::rename(dir, &target) {
        Ok(()) => {
            tracing::warn!(moved_to = %target.display(), "Quarantined vector index");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not rename vector index, removing it");
            std::fs::remove_dir_all(dir)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::TrigramEmbeddings;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Trigram embedder that counts embedded texts.
    #[derive(Debug)]
    struct CountingEmbedder {
        inner: TrigramEmbeddings,
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: TrigramEmbeddings::new(64),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn provider_name(&self) -> &str {
            self.inner.provider_name()
        }

        fn model_name(&self) -> &str {
            self.inner.model_name()
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed_batch(texts).await
        }
    }

    fn chunk(parent: &str, source: &str, index: u32, text: &str) -> Chunk {
        let mut c = Chunk::new(parent, source, 0, index, text, (0, text.len()), "test");
        c.total_chunks = 2;
        c
    }

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            chunk("rules", "rules.pdf", 0, "Each player draws two cards at the start of a turn."),
            chunk("rules", "rules.pdf", 1, "A player who cannot play must pass."),
            chunk("recipes", "recipes.pdf", 0, "Whisk the eggs with sugar until pale."),
        ]
    }

    #[test]
    fn test_open_missing_index() {
        let temp = TempDir::new().unwrap();
        let embedder = TrigramEmbeddings::new(64);
        assert!(VectorStore::open(&temp.path().join("index"), &embedder)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_store_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");
        let embedder = CountingEmbedder::new();

        let first = VectorStore::store(&dir, sample_chunks(), &embedder).await.unwrap();
        assert_eq!(first.last_added(), 3);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

        let second = VectorStore::store(&dir, sample_chunks(), &embedder).await.unwrap();
        assert_eq!(second.last_added(), 0);
        assert_eq!(second.len(), 3);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reopen_and_search() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");
        let embedder = TrigramEmbeddings::new(256);

        VectorStore::store(&dir, sample_chunks(), &embedder).await.unwrap();
        let store = VectorStore::open(&dir, &embedder).unwrap().unwrap();
        assert_eq!(store.len(), 3);

        let query = embedder.embed("How many cards does a player draw?").await.unwrap();
        let results = store.search(&query, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.parent_id, "rules");
        assert!(results[0].1 >= results[1].1);

        assert_eq!(store.search(&query, 10).len(), 3);

        let stats = store.stats().unwrap();
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.parents, 2);
        assert_eq!(stats.provider, "trigram");
        assert!(stats.size_bytes > 0);
    }

    #[tokio::test]
    async fn test_embedder_mismatch_quarantines() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");

        VectorStore::store(&dir, sample_chunks(), &TrigramEmbeddings::new(64))
            .await
            .unwrap();

        let other = TrigramEmbeddings::new(32);
        assert!(VectorStore::open(&dir, &other).unwrap().is_none());
        assert!(!dir.exists());

        let quarantined = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().starts_with("index.corrupt-"));
        assert!(quarantined);
    }

    #[tokio::test]
    async fn test_corrupt_index_is_discarded() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(INDEX_FILE), b"garbage").unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), b"{}").unwrap();

        let embedder = TrigramEmbeddings::new(64);
        assert!(VectorStore::open(&dir, &embedder).unwrap().is_none());

        let rebuilt = VectorStore::store(&dir, sample_chunks(), &embedder).await.unwrap();
        assert_eq!(rebuilt.len(), 3);
    }

    #[test]
    fn test_shared_parent_id_keeps_first_source() {
        let chunks = vec![
            chunk("guide", "a/guide.pdf", 0, "first"),
            chunk("guide", "b/guide.pdf", 0, "second"),
            chunk("other", "other.pdf", 0, "third"),
        ];
        let existing = BTreeSet::from(["other".to_string()]);

        let kept = select_new_chunks(chunks, &existing);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].parent_source, "a/guide.pdf");
    }
}
