//! Document and report types shared across the knowledge crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One page of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based page number for PDFs
    pub number: u32,
    pub text: String,
}

impl Page {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// A document already split into pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Original location: URL or local path
    pub source: String,
    pub pages: Vec<Page>,
}

impl ParsedDocument {
    pub fn new(source: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            source: source.into(),
            pages,
        }
    }
}

/// Input accepted by document loading, resolved once at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentInput {
    /// URL or local path (file or directory)
    Raw(String),
    /// Pages supplied by the caller
    Parsed(ParsedDocument),
}

impl DocumentInput {
    /// Human-readable identity for logging.
    pub fn label(&self) -> &str {
        match self {
            DocumentInput::Raw(location) => location,
            DocumentInput::Parsed(doc) => &doc.source,
        }
    }
}

impl From<&str> for DocumentInput {
    fn from(location: &str) -> Self {
        DocumentInput::Raw(location.to_string())
    }
}

impl From<String> for DocumentInput {
    fn from(location: String) -> Self {
        DocumentInput::Raw(location)
    }
}

impl From<PathBuf> for DocumentInput {
    fn from(path: PathBuf) -> Self {
        DocumentInput::Raw(path.to_string_lossy().to_string())
    }
}

impl From<ParsedDocument> for DocumentInput {
    fn from(doc: ParsedDocument) -> Self {
        DocumentInput::Parsed(doc)
    }
}

/// An input that could not be loaded.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSource {
    pub source: String,
    pub reason: String,
}

/// Outcome of one `load_documents` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Documents successfully parsed
    pub documents: usize,
    /// Chunks produced by the chunker
    pub chunks: usize,
    /// Chunks appended to the index
    pub added: usize,
    /// Inputs skipped because they failed to load
    pub skipped: Vec<SkippedSource>,
}

/// Summary of the persisted index.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub chunks: usize,
    pub parents: usize,
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub size_bytes: u64,
    pub path: PathBuf,
}
