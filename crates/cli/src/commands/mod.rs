//! Command handlers for the ragchat CLI.
//!
//! Every command that touches the index builds a [`RagPipeline`] through
//! [`build_pipeline`], so the CLI and the library share one wiring.

pub mod ask;
pub mod chat;
pub mod ingest;
pub mod logs;
pub mod prompts;
pub mod search;
pub mod stats;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use ingest::IngestCommand;
pub use logs::LogsCommand;
pub use prompts::PromptsCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;

use clap::Args;
use ragchat_core::{config::AppConfig, AppError, AppResult};
use ragchat_knowledge::{
    create_provider, create_scorer, ChainAnswer, EmbeddingConfig, EmbeddingProvider,
    PipelineParts, RagPipeline,
};
use ragchat_llm::client_from_env;
use ragchat_prompt::{PromptStore, DEFAULT_INSTRUCTION};
use std::sync::Arc;

/// Answering options shared by `ask`, `chat` and `search`.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Prompt strategy (zero_shot, cot, react, explain_like_5, elaborate, meta)
    #[arg(long)]
    pub prompt_type: Option<String>,

    /// Instruction appended to the answer prompt
    #[arg(long, conflicts_with = "no_instruction")]
    pub instruction: Option<String>,

    /// Do not append any instruction
    #[arg(long)]
    pub no_instruction: bool,

    /// Role the assistant plays in the prompt
    #[arg(long)]
    pub role: Option<String>,

    /// Rerank whole parent documents before answering
    #[arg(long)]
    pub rerank: bool,

    /// Rewrite the question before retrieval
    #[arg(long)]
    pub rewrite: bool,

    /// Chunks (or parents, when reranking) passed to the model
    #[arg(short = 'k', long)]
    pub retriever_k: Option<usize>,

    /// Candidates fetched before parent reranking
    #[arg(long)]
    pub top_k_chunks: Option<usize>,
}

impl PipelineArgs {
    /// Instruction to use: explicit flag, then config, then the builtin one.
    pub fn instruction(&self, config: &AppConfig) -> Option<String> {
        if self.no_instruction {
            return None;
        }
        self.instruction
            .clone()
            .or_else(|| config.retrieval.instruction.clone())
            .or_else(|| Some(DEFAULT_INSTRUCTION.to_string()))
    }

    /// Apply the flags on top of the configured defaults.
    pub fn apply(&self, config: &AppConfig, pipeline: &mut RagPipeline) -> AppResult<()> {
        let prompt_type = self
            .prompt_type
            .clone()
            .unwrap_or_else(|| pipeline.options().prompt_type.clone());
        pipeline.set_prompt_type(&prompt_type, self.instruction(config))?;

        if self.role.is_some() {
            pipeline.set_role(self.role.clone());
        }

        if self.retriever_k.is_some() || self.top_k_chunks.is_some() {
            let options = pipeline.options();
            let k = self.retriever_k.unwrap_or(options.retriever_k);
            let top = self.top_k_chunks.unwrap_or(options.top_k_chunks);
            pipeline.set_retrieval_depth(k, top)?;
        }

        if self.rerank {
            pipeline.set_use_reranker(true);
        }
        if self.rewrite {
            pipeline.set_query_rewriting(true);
        }
        Ok(())
    }
}

/// Embedding provider described by the config, keyed from the environment.
pub fn build_embedder(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let api_key = std::env::var("OPENAI_API_KEY").ok();
    create_provider(
        &EmbeddingConfig::from(&config.embedding),
        config.embedding.endpoint.as_deref(),
        api_key.as_deref(),
    )
}

/// Wire the generation client, embedder, scorer and prompts into a pipeline.
pub fn build_pipeline(config: &AppConfig) -> AppResult<RagPipeline> {
    let llm = client_from_env()?;
    let embedder = build_embedder(config)?;
    let scorer = create_scorer(&config.reranker, Arc::clone(&llm))?;
    let prompts_path = config.prompts_path();
    let prompts = PromptStore::load_or_builtin(prompts_path.as_deref())?;

    RagPipeline::new(
        config,
        PipelineParts {
            llm,
            embedder,
            scorer,
            prompts,
        },
    )
}

/// Print an answer with its sources.
pub fn print_answer(answer: &ChainAnswer, json: bool) -> AppResult<()> {
    if json {
        let output = serde_json::to_string_pretty(answer)
            .map_err(|e| AppError::Serialization(e.to_string()))?;
        println!("{}", output);
        return Ok(());
    }

    if let Some(rewritten) = &answer.rewritten_query {
        println!("(searched for: {})", rewritten);
    }
    println!("{}", answer.answer);
    println!();

    if answer.sources.is_empty() {
        println!("Sources: (no sources available)");
    } else {
        println!("Sources:");
        for source in &answer.sources {
            match source.rerank_score {
                Some(score) => println!("- {} [{}] score {:.3}", source.location(), source.chunk_id, score),
                None => println!("- {} [{}]", source.location(), source.chunk_id),
            }
        }
    }
    Ok(())
}
