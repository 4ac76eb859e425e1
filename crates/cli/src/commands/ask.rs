//! Ask command handler.
//!
//! Answers one question over the indexed documents.

use super::{build_pipeline, print_answer, PipelineArgs};
use clap::Args;
use ragchat_core::{config::AppConfig, AppError, AppResult};
use ragchat_knowledge::DocumentInput;

/// Ask one question about the loaded documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Documents (paths or URLs) to load before answering
    #[arg(long = "load")]
    pub load: Vec<String>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        if self.question.trim().is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        let mut pipeline = build_pipeline(config)?;
        if !self.load.is_empty() {
            let inputs = self.load.iter().cloned().map(DocumentInput::from).collect();
            pipeline.load_documents(inputs).await?;
        }
        self.pipeline.apply(config, &mut pipeline)?;

        let chain = pipeline.get_chain()?;
        let answer = chain.invoke(&self.question).await?;

        tracing::debug!(sources = answer.sources.len(), "Answer ready");
        print_answer(&answer, self.json)
    }
}
