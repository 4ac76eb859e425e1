//! Configuration management for ragchat.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (.ragchat/config.yaml)
//!
//! The configuration is workspace-centric: documents, the vector index and the
//! run log all live under the workspace unless configured otherwise.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".ragchat";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .ragchat/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Folder downloaded PDFs are written to
    pub documents_dir: PathBuf,

    /// Folder holding the persisted vector index
    pub index_dir: PathBuf,

    /// Prompt template file; the builtin set is used when absent
    pub prompts_file: Option<PathBuf>,

    /// Append-only run log
    pub log_file: PathBuf,

    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub reranker: RerankerSettings,
}

/// Chunk size and overlap, in characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 80,
        }
    }
}

/// Retrieval and answering defaults applied to a fresh pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Chunks returned by the flat retriever; parents kept by the reranker
    pub retriever_k: usize,

    /// Candidates over-fetched before parent reranking
    pub top_k_chunks: usize,

    pub use_reranking: bool,
    pub rewrite: bool,
    pub memory: bool,
    pub prompt_type: String,

    /// Extra instruction appended to answer prompts; the builtin one when absent
    pub instruction: Option<String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            retriever_k: 4,
            top_k_chunks: 20,
            use_reranking: false,
            rewrite: false,
            memory: false,
            prompt_type: "zero_shot".to_string(),
            instruction: None,
        }
    }
}

/// Embedding provider selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// "openai" or "trigram"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    /// Base URL override for OpenAI-compatible endpoints
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            batch_size: 100,
            endpoint: None,
        }
    }
}

/// Relevance scorer used by the parent-grouping reranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RerankerSettings {
    /// "cross-encoder", "llm" or "term-overlap"
    pub scorer: String,
    /// Cross-encoder service base URL
    pub endpoint: String,
    pub model: String,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            scorer: "cross-encoder".to_string(),
            endpoint: "http://localhost:8080".to_string(),
            model: "cross-encoder/ms-marco-MiniLM-L-12-v2".to_string(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    documents_dir: Option<PathBuf>,
    index_dir: Option<PathBuf>,
    prompts_file: Option<PathBuf>,
    chunking: Option<ChunkingSettings>,
    retrieval: Option<RetrievalSettings>,
    embedding: Option<EmbeddingSettings>,
    reranker: Option<RerankerSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            documents_dir: PathBuf::from("documents"),
            index_dir: PathBuf::from(STATE_DIR).join("index"),
            prompts_file: None,
            log_file: PathBuf::from("logs").join("app.log"),
            chunking: ChunkingSettings::default(),
            retrieval: RetrievalSettings::default(),
            embedding: EmbeddingSettings::default(),
            reranker: RerankerSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `RAGCHAT_WORKSPACE`: Override workspace path
    /// - `RAGCHAT_CONFIG`: Path to config file
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use ragchat_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration, letting explicit paths win over the environment.
    ///
    /// The workspace must be known before the YAML file is read, so CLI flags
    /// for the workspace and config file are applied here rather than in
    /// [`AppConfig::with_overrides`].
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("RAGCHAT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        if let Ok(config_file) = std::env::var("RAGCHAT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }
        if let Some(config_file) = config_file {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.workspace.join(STATE_DIR).join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(dir) = config_file.documents_dir {
            result.documents_dir = dir;
        }
        if let Some(dir) = config_file.index_dir {
            result.index_dir = dir;
        }
        if let Some(file) = config_file.prompts_file {
            result.prompts_file = Some(file);
        }
        if let Some(chunking) = config_file.chunking {
            result.chunking = chunking;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(reranker) = config_file.reranker {
            result.reranker = reranker;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(file) = logging.file {
                result.log_file = file;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and
    /// the config file.
    pub fn with_overrides(mut self, log_level: Option<String>, verbose: bool, no_color: bool) -> Self {
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Resolve a possibly relative path against the workspace.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Get the path to the .ragchat directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .ragchat directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    pub fn documents_path(&self) -> PathBuf {
        self.resolve(&self.documents_dir)
    }

    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.index_dir)
    }

    pub fn log_path(&self) -> PathBuf {
        self.resolve(&self.log_file)
    }

    pub fn prompts_path(&self) -> Option<PathBuf> {
        self.prompts_file.as_deref().map(|p| self.resolve(p))
    }

    /// Validate numeric settings and provider names.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunking.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be greater than 0".to_string()));
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }

        if self.retrieval.retriever_k == 0 || self.retrieval.top_k_chunks == 0 {
            return Err(AppError::Config(
                "retrieverK and topKChunks must be greater than 0".to_string(),
            ));
        }

        let known_embedders = ["openai", "trigram"];
        if !known_embedders.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                known_embedders.join(", ")
            )));
        }

        let known_scorers = ["cross-encoder", "llm", "term-overlap"];
        if !known_scorers.contains(&self.reranker.scorer.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown reranker scorer: {}. Supported: {}",
                self.reranker.scorer,
                known_scorers.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 80);
        assert_eq!(config.retrieval.retriever_k, 4);
        assert_eq!(config.retrieval.top_k_chunks, 20);
        assert_eq!(config.retrieval.prompt_type, "zero_shot");
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_state_dir() {
        let config = AppConfig::default();
        assert!(config.state_dir().ends_with(".ragchat"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(None, true, true);
        assert!(config.verbose);
        assert!(config.no_color);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_overlap() {
        let mut config = AppConfig::default();
        config.chunking.chunk_overlap = 800;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_scorer() {
        let mut config = AppConfig::default();
        config.reranker.scorer = "magic".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let state = temp.path().join(STATE_DIR);
        std::fs::create_dir_all(&state).unwrap();
        std::fs::write(
            state.join("config.yaml"),
            "documentsDir: pdfs\nchunking:\n  chunkSize: 500\nretrieval:\n  useReranking: true\nembedding:\n  provider: trigram\n  model: trigram-v1\n  dimensions: 384\nlogging:\n  file: run.log\n",
        )
        .unwrap();

        let config = AppConfig::load_with(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.documents_path(), temp.path().join("pdfs"));
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 80);
        assert!(config.retrieval.use_reranking);
        assert_eq!(config.retrieval.retriever_k, 4);
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.log_path(), temp.path().join("run.log"));
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_with(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("nope.yaml")),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_resolve_absolute_path() {
        let config = AppConfig::default();
        let abs = std::env::temp_dir();
        assert_eq!(config.resolve(&abs), abs);
    }
}
