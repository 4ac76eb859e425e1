//! Document acquisition: download, locate and parse inputs into pages.

use crate::types::{DocumentInput, Page, ParsedDocument, SkippedSource};
use ragchat_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Download timeout per document
const DOWNLOAD_TIMEOUT_SECS: u64 = 10;

/// Resolves [`DocumentInput`]s into parsed, paged documents.
pub struct DocumentSource {
    documents_dir: PathBuf,
    client: reqwest::Client,
}

impl DocumentSource {
    /// Create a source that stores downloads under `documents_dir`.
    pub fn new(documents_dir: impl Into<PathBuf>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            documents_dir: documents_dir.into(),
            client,
        })
    }

    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    /// Resolve every input, skipping the ones that fail.
    pub async fn load_all(
        &self,
        inputs: Vec<DocumentInput>,
    ) -> (Vec<ParsedDocument>, Vec<SkippedSource>) {
        let mut documents = Vec::new();
        let mut skipped = Vec::new();

        for input in inputs {
            let label = input.label().to_string();
            match self.resolve(input).await {
                Ok(mut resolved) => documents.append(&mut resolved),
                Err(e) => {
                    tracing::warn!(source = %label, error = %e, "Skipping document due to error");
                    skipped.push(SkippedSource {
                        source: label,
                        reason: e.to_string(),
                    });
                }
            }
        }

        (documents, skipped)
    }

    /// Resolve one input. A directory yields one document per PDF inside it.
    pub async fn resolve(&self, input: DocumentInput) -> AppResult<Vec<ParsedDocument>> {
        match input {
            DocumentInput::Parsed(document) => Ok(vec![document]),
            DocumentInput::Raw(location) if is_url(&location) => {
                let path = self.download(&location).await?;
                let pages = parse_file(&path).await?;
                Ok(vec![ParsedDocument::new(location, pages)])
            }
            DocumentInput::Raw(location) => {
                let path = PathBuf::from(&location);
                if path.is_dir() {
                    let mut documents = Vec::new();
                    for file in pdf_files_in(&path) {
                        let pages = parse_file(&file).await?;
                        documents.push(ParsedDocument::new(file.to_string_lossy(), pages));
                    }
                    Ok(documents)
                } else if path.is_file() {
                    let pages = parse_file(&path).await?;
                    Ok(vec![ParsedDocument::new(location, pages)])
                } else {
                    Err(AppError::Knowledge(format!(
                        "Document not found: {}",
                        location
                    )))
                }
            }
        }
    }

    /// Download `url` into the documents folder unless already present.
    pub async fn download(&self, url: &str) -> AppResult<PathBuf> {
        let filename = filename_from_url(url)?;
        let target = self.documents_dir.join(&filename);

        if target.exists() {
            tracing::info!(path = %target.display(), "File already exists, skipping download");
            return Ok(target);
        }

        tokio::fs::create_dir_all(&self.documents_dir).await?;

        tracing::info!(url, "Downloading document");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Http(format!("Failed to download {}: {}", url, e)))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Http(format!("Failed to read body of {}: {}", url, e)))?;

        tokio::fs::write(&target, &bytes).await?;
        tracing::info!(path = %target.display(), bytes = bytes.len(), "Downloaded document");

        Ok(target)
    }
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Basename of the URL path, query string removed.
pub fn filename_from_url(url: &str) -> AppResult<String> {
    let without_query = url.split(|c: char| c == '?' || c == '#').next().unwrap_or(url);
    let name = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");

    if name.is_empty() || name.contains(':') {
        return Err(AppError::Http(format!(
            "Cannot derive a filename from URL: {}",
            url
        )));
    }
    Ok(name.to_string())
}

/// PDF files under `dir`, sorted by path.
fn pdf_files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && has_extension(p, "pdf"))
        .collect();
    files.sort();
    files
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Parse a local file into pages numbered from 0.
///
/// PDFs are split per page; plain text and markdown become a single page.
pub async fn parse_file(path: &Path) -> AppResult<Vec<Page>> {
    if has_extension(path, "txt") || has_extension(path, "md") {
        let text = tokio::fs::read_to_string(path).await?;
        return Ok(vec![Page::new(0, text)]);
    }

    if !has_extension(path, "pdf") {
        return Err(AppError::Knowledge(format!(
            "Unsupported document type: {}",
            path.display()
        )));
    }

    let owned = path.to_path_buf();
    let texts = tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&owned))
        .await
        .map_err(|e| AppError::Knowledge(format!("PDF extraction task failed: {}", e)))?
        .map_err(|e| {
            AppError::Knowledge(format!("Failed to extract text from {}: {}", path.display(), e))
        })?;

    tracing::debug!(path = %path.display(), pages = texts.len(), "Parsed PDF");

    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page::new(i as u32, text))
        .collect())
}
