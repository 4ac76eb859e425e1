//! Embedding providers.
//!
//! The vector index records which provider and model produced its vectors, so
//! queries are always embedded the same way the stored chunks were.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
pub use providers::openai::OpenAiEmbeddings;
pub use providers::trigram::TrigramEmbeddings;
