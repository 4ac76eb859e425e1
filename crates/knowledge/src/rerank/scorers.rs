//! Relevance scorers for the parent reranker.

use super::RelevanceScorer;
use ragchat_core::config::RerankerSettings;
use ragchat_core::{AppError, AppResult};
use ragchat_llm::{LlmClient, LlmRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const CROSS_ENCODER_TIMEOUT_SECS: u64 = 60;

/// Build the scorer named in the reranker settings.
pub fn create_scorer(
    settings: &RerankerSettings,
    llm: Arc<dyn LlmClient>,
) -> AppResult<Arc<dyn RelevanceScorer>> {
    match settings.scorer.as_str() {
        "cross-encoder" => Ok(Arc::new(CrossEncoderScorer::new(
            &settings.endpoint,
            &settings.model,
        )?)),
        "llm" => Ok(Arc::new(LlmScorer::new(llm))),
        "term-overlap" => Ok(Arc::new(TermOverlapScorer)),
        other => Err(AppError::Config(format!(
            "Unknown reranker scorer: '{}'. Supported scorers: cross-encoder, llm, term-overlap",
            other
        ))),
    }
}

/// Cross-encoder served over HTTP (text-embeddings-inference `/rerank`).
pub struct CrossEncoderScorer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    /// Omitted for single-model servers
    #[serde(skip_serializing_if = "str::is_empty")]
    model: &'a str,
    query: &'a str,
    texts: [&'a str; 1],
    raw_scores: bool,
}

#[derive(Debug, Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

impl CrossEncoderScorer {
    pub fn new(endpoint: &str, model: &str) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(CROSS_ENCODER_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Knowledge(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn first_score(hits: Vec<RerankHit>) -> AppResult<f32> {
        hits.into_iter()
            .find(|hit| hit.index == 0)
            .map(|hit| hit.score)
            .ok_or_else(|| AppError::Knowledge("Cross-encoder returned no score".to_string()))
    }
}

#[async_trait::async_trait]
impl RelevanceScorer for CrossEncoderScorer {
    fn name(&self) -> &str {
        "cross-encoder"
    }

    async fn score(&self, query: &str, text: &str) -> AppResult<f32> {
        let url = format!("{}/rerank", self.endpoint);
        let body = RerankRequest {
            model: &self.model,
            query,
            texts: [text],
            raw_scores: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Knowledge(format!("Cross-encoder request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Knowledge(format!(
                "Cross-encoder error ({}): {}",
                status, text
            )));
        }

        let hits: Vec<RerankHit> = response.json().await.map_err(|e| {
            AppError::Knowledge(format!("Failed to parse cross-encoder response: {}", e))
        })?;
        Self::first_score(hits)
    }
}

/// Asks the generation model for a 0-10 rating.
pub struct LlmScorer {
    llm: Arc<dyn LlmClient>,
}

impl LlmScorer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    fn prompt(query: &str, text: &str) -> String {
        format!(
            "Rate how relevant the document is to the question on a scale from 0 to 10.\n\
             Respond with only the number.\n\n\
             Question: {}\n\nDocument:\n{}",
            query, text
        )
    }
}

/// First number in `text`, clamped to 0..=10.
fn parse_rating(text: &str) -> Option<f32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let number: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    number
        .trim_end_matches('.')
        .parse::<f32>()
        .ok()
        .map(|v| v.clamp(0.0, 10.0))
}

#[async_trait::async_trait]
impl RelevanceScorer for LlmScorer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn score(&self, query: &str, text: &str) -> AppResult<f32> {
        let request = LlmRequest::new(Self::prompt(query, text))
            .with_temperature(0.0)
            .with_max_tokens(8);
        let response = self.llm.complete(&request).await?;

        parse_rating(&response.content).ok_or_else(|| {
            AppError::Llm(format!(
                "Could not parse relevance rating from '{}'",
                response.content.trim()
            ))
        })
    }
}

/// Offline lexical scorer: share of distinct query terms found in the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermOverlapScorer;

fn terms(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

#[async_trait::async_trait]
impl RelevanceScorer for TermOverlapScorer {
    fn name(&self) -> &str {
        "term-overlap"
    }

    async fn score(&self, query: &str, text: &str) -> AppResult<f32> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(0.0);
        }
        let text_terms = terms(text);
        let hits = query_terms.iter().filter(|t| text_terms.contains(*t)).count();
        Ok(hits as f32 / query_terms.len() as f32)
    }
}
