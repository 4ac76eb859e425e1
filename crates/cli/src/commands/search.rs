//! Search command handler.
//!
//! Runs retrieval only, which is handy to inspect what the model would see.

use super::{build_pipeline, PipelineArgs};
use clap::Args;
use ragchat_core::{config::AppConfig, AppResult};
use ragchat_knowledge::pipeline::truncate_snippet;

/// Show the chunks retrieved for a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");

        let mut pipeline = build_pipeline(config)?;
        self.pipeline.apply(config, &mut pipeline)?;

        let chunks = pipeline.retrieve(&self.query).await?;
        if chunks.is_empty() {
            println!("No chunks found");
            return Ok(());
        }

        for (i, chunk) in chunks.iter().enumerate() {
            let score = chunk
                .rerank_score
                .map(|s| format!(" score {:.3}", s))
                .unwrap_or_default();
            println!(
                "{}. {} (page {}){}",
                i + 1,
                chunk.chunk_id,
                chunk.page + 1,
                score
            );
            println!("   {}", truncate_snippet(&chunk.text, 200).replace('\n', " "));
        }

        Ok(())
    }
}
