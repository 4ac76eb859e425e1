//! Pipeline controller.
//!
//! [`RagPipeline`] owns the long-lived pieces (generation client, embedder,
//! scorer, prompts, the loaded index) and the user-adjustable answering
//! options. [`RagPipeline::get_chain`] binds a snapshot of them into a
//! [`RagChain`].

pub mod chain;
pub mod memory;
pub mod sources;

pub use chain::{ChainAnswer, RagChain};
pub use memory::{ConversationMemory, Turn};
pub use sources::{build_context, source_refs, truncate_snippet, SourceRef};

use crate::chunk::{ChunkConfig, Chunker};
use crate::document::DocumentSource;
use crate::embeddings::EmbeddingProvider;
use crate::rerank::{ParentReranker, RelevanceScorer};
use crate::retriever::{RerankingRetriever, Retriever, SimilarityRetriever};
use crate::store::VectorStore;
use crate::types::{DocumentInput, IngestReport, StoreStats};
use ragchat_core::config::{AppConfig, RetrievalSettings};
use ragchat_core::logging::mark_run_start;
use ragchat_core::{AppError, AppResult};
use ragchat_llm::LlmClient;
use ragchat_prompt::PromptStore;
use std::path::PathBuf;
use std::sync::Arc;

/// User-adjustable answering options.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub prompt_type: String,
    pub additional_instruction: Option<String>,
    pub role: Option<String>,
    pub use_reranking: bool,
    pub retriever_k: usize,
    pub top_k_chunks: usize,
    pub rewrite_enabled: bool,
    pub memory_enabled: bool,
}

impl From<&RetrievalSettings> for PipelineOptions {
    fn from(settings: &RetrievalSettings) -> Self {
        Self {
            prompt_type: settings.prompt_type.clone(),
            additional_instruction: settings.instruction.clone(),
            role: None,
            use_reranking: settings.use_reranking,
            retriever_k: settings.retriever_k,
            top_k_chunks: settings.top_k_chunks,
            rewrite_enabled: settings.rewrite,
            memory_enabled: settings.memory,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&RetrievalSettings::default())
    }
}

/// Collaborators the pipeline is built from.
pub struct PipelineParts {
    pub llm: Arc<dyn LlmClient>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub scorer: Arc<dyn RelevanceScorer>,
    pub prompts: PromptStore,
}

pub struct RagPipeline {
    run_id: String,
    index_dir: PathBuf,
    documents: DocumentSource,
    chunker: Chunker,
    llm: Arc<dyn LlmClient>,
    embedder: Arc<dyn EmbeddingProvider>,
    scorer: Arc<dyn RelevanceScorer>,
    prompts: Arc<PromptStore>,
    options: PipelineOptions,
    memory: Arc<ConversationMemory>,
    store: Option<Arc<VectorStore>>,
    retriever: Option<Arc<dyn Retriever>>,
}

impl RagPipeline {
    /// Build a pipeline and load the existing index, if any.
    pub fn new(config: &AppConfig, parts: PipelineParts) -> AppResult<Self> {
        let run_id = uuid::Uuid::new_v4().to_string();
        mark_run_start(&run_id);

        let options = PipelineOptions::from(&config.retrieval);
        parts.prompts.get(&options.prompt_type)?;

        let chunker = Chunker::new(ChunkConfig::from(&config.chunking))?;
        let documents = DocumentSource::new(config.documents_path())?;
        let index_dir = config.index_path();

        tracing::info!(
            llm = parts.llm.provider_name(),
            model = parts.llm.model(),
            embedder = parts.embedder.provider_name(),
            scorer = parts.scorer.name(),
            prompt_type = %options.prompt_type,
            "Pipeline configured"
        );

        let mut pipeline = Self {
            run_id,
            index_dir,
            documents,
            chunker,
            llm: parts.llm,
            embedder: parts.embedder,
            scorer: parts.scorer,
            prompts: Arc::new(parts.prompts),
            options,
            memory: Arc::new(ConversationMemory::new()),
            store: None,
            retriever: None,
        };

        if let Some(store) = VectorStore::open(&pipeline.index_dir, pipeline.embedder.as_ref())? {
            pipeline.store = Some(Arc::new(store));
            pipeline.rebuild_retriever();
        }

        Ok(pipeline)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn prompts(&self) -> &PromptStore {
        &self.prompts
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn is_initialized(&self) -> bool {
        self.retriever.is_some()
    }

    /// Statistics of the loaded index, if any.
    pub fn stats(&self) -> AppResult<Option<StoreStats>> {
        self.store.as_ref().map(|s| s.stats()).transpose()
    }

    /// Acquire, chunk and index `inputs`. Already indexed documents are skipped.
    pub async fn load_documents(&mut self, inputs: Vec<DocumentInput>) -> AppResult<IngestReport> {
        tracing::info!(inputs = inputs.len(), "Loading documents");

        let (documents, skipped) = self.documents.load_all(inputs).await;
        let chunks = self.chunker.chunk_documents(&documents);

        let mut report = IngestReport {
            documents: documents.len(),
            chunks: chunks.len(),
            added: 0,
            skipped,
        };

        if chunks.is_empty() {
            tracing::warn!(
                skipped = report.skipped.len(),
                "No chunks produced; index left unchanged"
            );
            return Ok(report);
        }

        let store =
            VectorStore::store(&self.index_dir, chunks, self.embedder.as_ref()).await?;
        report.added = store.last_added();
        self.store = Some(Arc::new(store));
        self.rebuild_retriever();

        tracing::info!(
            documents = report.documents,
            chunks = report.chunks,
            added = report.added,
            skipped = report.skipped.len(),
            "Documents loaded"
        );

        Ok(report)
    }

    /// Select the answer strategy and the extra instruction appended to it.
    pub fn set_prompt_type(&mut self, name: &str, instruction: Option<String>) -> AppResult<()> {
        self.prompts.get(name)?;
        self.options.prompt_type = name.to_string();
        self.options.additional_instruction = instruction.filter(|i| !i.trim().is_empty());
        tracing::info!(prompt_type = name, "Prompt type set");
        Ok(())
    }

    pub fn set_role(&mut self, role: Option<String>) {
        self.options.role = role;
    }

    /// Switch between flat and parent-reranked retrieval.
    ///
    /// Takes effect immediately when an index is loaded, otherwise on load.
    pub fn set_use_reranker(&mut self, enabled: bool) {
        self.options.use_reranking = enabled;
        tracing::info!(enabled, "Reranking toggled");
        if self.store.is_some() {
            self.rebuild_retriever();
        }
    }

    pub fn set_retrieval_depth(&mut self, retriever_k: usize, top_k_chunks: usize) -> AppResult<()> {
        if retriever_k == 0 || top_k_chunks == 0 {
            return Err(AppError::Config(
                "retriever_k and top_k_chunks must be greater than 0".to_string(),
            ));
        }
        self.options.retriever_k = retriever_k;
        self.options.top_k_chunks = top_k_chunks;
        if self.store.is_some() {
            self.rebuild_retriever();
        }
        Ok(())
    }

    /// Enable or disable conversation memory. Disabling forgets the history.
    pub async fn set_memory(&mut self, enabled: bool) {
        if !enabled {
            self.memory.clear().await;
        }
        self.options.memory_enabled = enabled;
        tracing::info!(enabled, "Memory toggled");
    }

    pub fn set_query_rewriting(&mut self, enabled: bool) {
        self.options.rewrite_enabled = enabled;
        tracing::info!(enabled, "Query rewriting toggled");
    }

    /// Bind the current configuration into a chain.
    pub fn get_chain(&self) -> AppResult<RagChain> {
        let retriever = self.retriever.clone().ok_or_else(AppError::not_initialized)?;

        Ok(RagChain {
            llm: Arc::clone(&self.llm),
            retriever,
            prompts: Arc::clone(&self.prompts),
            prompt_type: self.options.prompt_type.clone(),
            instruction: self.options.additional_instruction.clone(),
            role: self.options.role.clone(),
            rewrite: self.options.rewrite_enabled,
            memory: self
                .options
                .memory_enabled
                .then(|| Arc::clone(&self.memory)),
        })
    }

    /// Retrieve chunks for `query` with the active strategy, without generating.
    pub async fn retrieve(&self, query: &str) -> AppResult<Vec<crate::chunk::Chunk>> {
        let retriever = self.retriever.as_ref().ok_or_else(AppError::not_initialized)?;
        retriever.retrieve(query).await
    }

    fn rebuild_retriever(&mut self) {
        let Some(store) = self.store.clone() else {
            self.retriever = None;
            return;
        };

        let retriever: Arc<dyn Retriever> = if self.options.use_reranking {
            let reranker = ParentReranker::new(
                Arc::clone(&self.scorer),
                self.options.top_k_chunks,
                self.options.retriever_k,
            );
            Arc::new(RerankingRetriever::new(store, Arc::clone(&self.embedder), reranker))
        } else {
            Arc::new(SimilarityRetriever::new(
                store,
                Arc::clone(&self.embedder),
                self.options.retriever_k,
            ))
        };

        tracing::debug!(retriever = retriever.name(), "Retriever rebuilt");
        self.retriever = Some(retriever);
    }
}
