//! Cross-module tests for ingestion, reranking and answering.

pub mod support;
