//! Test doubles shared by the knowledge tests.

use crate::chunk::Chunk;
use crate::embeddings::TrigramEmbeddings;
use crate::pipeline::{PipelineParts, RagPipeline};
use crate::rerank::{RelevanceScorer, TermOverlapScorer};
use crate::types::{DocumentInput, Page, ParsedDocument};
use ragchat_core::config::AppConfig;
use ragchat_core::{AppError, AppResult};
use ragchat_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use ragchat_prompt::PromptStore;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// LLM double: replies from a queue (then a fixed default) and records prompts.
pub struct MockLlm {
    replies: Mutex<VecDeque<AppResult<String>>>,
    default_reply: String,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new(default_reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: default_reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(AppError::Llm(message.to_string())));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlm {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let next = self.replies.lock().unwrap().pop_front();
        let content = match next {
            Some(reply) => reply?,
            None => self.default_reply.clone(),
        };
        Ok(LlmResponse {
            content,
            model: "mock-model".to_string(),
            usage: LlmUsage::default(),
        })
    }
}

/// Scorer returning a fixed score per marker found in the text; `None` fails.
pub struct TableScorer {
    table: Vec<(String, Option<f32>)>,
    calls: Mutex<usize>,
}

impl TableScorer {
    pub fn new(table: &[(&str, Option<f32>)]) -> Self {
        Self {
            table: table.iter().map(|(m, s)| (m.to_string(), *s)).collect(),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl RelevanceScorer for TableScorer {
    fn name(&self) -> &str {
        "table"
    }

    async fn score(&self, _query: &str, text: &str) -> AppResult<f32> {
        *self.calls.lock().unwrap() += 1;
        match self.table.iter().find(|(marker, _)| text.contains(marker.as_str())) {
            Some((_, Some(score))) => Ok(*score),
            Some((marker, None)) => Err(AppError::Other(format!("scoring failed for {}", marker))),
            None => Ok(0.0),
        }
    }
}

/// Workspace config with offline embeddings rooted at `root`.
pub fn offline_config(root: &Path) -> AppConfig {
    let mut config = AppConfig {
        workspace: root.to_path_buf(),
        ..AppConfig::default()
    };
    config.embedding.provider = "trigram".to_string();
    config.embedding.model = "trigram-v1".to_string();
    config.embedding.dimensions = 256;
    config.reranker.scorer = "term-overlap".to_string();
    config
}

pub fn pipeline_with(
    config: &AppConfig,
    llm: Arc<MockLlm>,
    scorer: Arc<dyn RelevanceScorer>,
) -> RagPipeline {
    let parts = PipelineParts {
        llm,
        embedder: Arc::new(TrigramEmbeddings::new(config.embedding.dimensions)),
        scorer,
        prompts: PromptStore::builtin().unwrap(),
    };
    RagPipeline::new(config, parts).unwrap()
}

pub fn offline_pipeline(config: &AppConfig, llm: Arc<MockLlm>) -> RagPipeline {
    pipeline_with(config, llm, Arc::new(TermOverlapScorer))
}

/// A small rules booklet and an unrelated recipe.
pub fn sample_documents() -> Vec<DocumentInput> {
    vec![
        ParsedDocument::new(
            "https://example.com/docs/Rules.pdf",
            vec![
                Page::new(0, "Setup. Each player draws seven cards at the start of the game."),
                Page::new(1, "Turns. On a turn a player plays one card or draws from the deck."),
                Page::new(2, "Winning. The first player without cards wins the round."),
            ],
        )
        .into(),
        ParsedDocument::new(
            "https://example.com/docs/Cake.pdf?download=1",
            vec![Page::new(0, "Whisk eggs and sugar, fold in flour, bake forty minutes.")],
        )
        .into(),
    ]
}

/// One candidate chunk per `(parent, text)` with a constant similarity.
pub fn candidates(items: &[(&str, u32, &str)]) -> Vec<(Chunk, f32)> {
    items
        .iter()
        .map(|(parent, index, text)| {
            (
                Chunk::new(parent, &format!("{}.pdf", parent), 0, *index, text, (0, text.len()), "t"),
                0.5,
            )
        })
        .collect()
}
