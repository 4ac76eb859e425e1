//! Answer chain: optional query rewrite, retrieval, prompt, generation.

use super::memory::ConversationMemory;
use super::sources::{build_context, source_refs, SourceRef};
use crate::chunk::Chunk;
use crate::retriever::Retriever;
use ragchat_core::AppResult;
use ragchat_llm::{LlmClient, LlmRequest};
use ragchat_prompt::{
    build_prompt, render_template, PromptStore, PromptVars, CONDENSE_PROMPT, REWRITE_PROMPT,
};
use serde::Serialize;
use std::sync::Arc;

/// Chunks from the rewrite pre-retrieval shown to the model.
const REWRITE_CONTEXT_CHUNKS: usize = 3;

/// Result of one question.
#[derive(Debug, Clone, Serialize)]
pub struct ChainAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    /// Set when query rewriting replaced the user's question
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_query: Option<String>,
}

/// A snapshot of the pipeline configuration, ready to answer questions.
///
/// Later pipeline changes do not affect an existing chain, except that the
/// conversation memory is shared.
pub struct RagChain {
    pub(crate) llm: Arc<dyn LlmClient>,
    pub(crate) retriever: Arc<dyn Retriever>,
    pub(crate) prompts: Arc<PromptStore>,
    pub(crate) prompt_type: String,
    pub(crate) instruction: Option<String>,
    pub(crate) role: Option<String>,
    pub(crate) rewrite: bool,
    pub(crate) memory: Option<Arc<ConversationMemory>>,
}

impl RagChain {
    pub fn prompt_type(&self) -> &str {
        &self.prompt_type
    }

    pub fn retriever_name(&self) -> &str {
        self.retriever.name()
    }

    /// Rewrite `query` with the help of a first retrieval, when enabled.
    pub async fn maybe_rewrite(&self, query: &str) -> AppResult<String> {
        if !self.rewrite {
            return Ok(query.to_string());
        }

        let preview = self.retriever.retrieve(query).await?;
        let context = preview
            .iter()
            .take(REWRITE_CONTEXT_CHUNKS)
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n");

        let template = self.prompts.get(REWRITE_PROMPT)?;
        let prompt = render_template(&template, &self.vars(query).with_context(context))?;
        let response = self.llm.complete(&LlmRequest::new(prompt)).await?;

        let rewritten = response.content.trim();
        if rewritten.is_empty() {
            tracing::warn!("Query rewrite returned nothing, keeping the original question");
            return Ok(query.to_string());
        }

        tracing::info!(original = query, rewritten, "Rewrote query");
        Ok(rewritten.to_string())
    }

    /// Retrieve, prompt and generate an answer to `question`.
    pub async fn answer(&self, question: &str) -> AppResult<ChainAnswer> {
        let history = match &self.memory {
            Some(memory) => memory.render().await,
            None => String::new(),
        };

        let standalone = if history.is_empty() {
            question.to_string()
        } else {
            self.condense(question, &history).await?
        };

        let chunks = self.retriever.retrieve(&standalone).await?;
        tracing::info!(
            retriever = self.retriever.name(),
            chunks = chunks.len(),
            "Retrieved context"
        );

        let answer = self.generate(&standalone, &history, &chunks).await?;

        if let Some(memory) = &self.memory {
            memory.record(question, answer.as_str()).await;
        }

        Ok(ChainAnswer {
            answer,
            sources: source_refs(&chunks),
            rewritten_query: None,
        })
    }

    /// `maybe_rewrite` then `answer`.
    pub async fn invoke(&self, query: &str) -> AppResult<ChainAnswer> {
        let effective = self.maybe_rewrite(query).await?;
        let mut result = self.answer(&effective).await?;
        if effective != query {
            result.rewritten_query = Some(effective);
        }
        Ok(result)
    }

    async fn condense(&self, question: &str, history: &str) -> AppResult<String> {
        let template = self.prompts.get(CONDENSE_PROMPT)?;
        let prompt = render_template(&template, &self.vars(question).with_chat_history(history))?;
        let response = self.llm.complete(&LlmRequest::new(prompt)).await?;

        let condensed = response.content.trim();
        if condensed.is_empty() {
            return Ok(question.to_string());
        }
        tracing::debug!(question, condensed, "Condensed follow-up question");
        Ok(condensed.to_string())
    }

    async fn generate(&self, question: &str, history: &str, chunks: &[Chunk]) -> AppResult<String> {
        let template = self.prompts.get(&self.prompt_type)?;
        let vars = self
            .vars(question)
            .with_context(build_context(chunks))
            .with_chat_history(history);
        let prompt = build_prompt(&template, self.instruction.as_deref(), &vars)?;

        tracing::debug!(
            prompt_type = %self.prompt_type,
            prompt_chars = prompt.chars().count(),
            "Generating answer"
        );

        let response = self.llm.complete(&LlmRequest::new(prompt)).await?;
        Ok(response.content)
    }

    fn vars(&self, question: &str) -> PromptVars {
        let vars = PromptVars::new(question);
        match &self.role {
            Some(role) => vars.with_role(role.as_str()),
            None => vars,
        }
    }
}
