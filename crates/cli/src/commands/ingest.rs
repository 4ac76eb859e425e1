//! Ingest command handler.

use super::build_pipeline;
use clap::Args;
use ragchat_core::{config::AppConfig, AppError, AppResult};
use ragchat_knowledge::DocumentInput;

/// Load documents (PDF paths, directories or URLs) into the index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Sources to load; the documents directory when omitted
    pub sources: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");

        let inputs: Vec<DocumentInput> = if self.sources.is_empty() {
            vec![DocumentInput::from(config.documents_path())]
        } else {
            self.sources.iter().cloned().map(DocumentInput::from).collect()
        };

        let mut pipeline = build_pipeline(config)?;
        let report = pipeline.load_documents(inputs).await?;

        if self.json {
            let output = serde_json::to_string_pretty(&report)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", output);
            return Ok(());
        }

        println!(
            "Loaded {} documents ({} chunks, {} new)",
            report.documents, report.chunks, report.added
        );
        for skipped in &report.skipped {
            println!("Skipped {}: {}", skipped.source, skipped.reason);
        }

        Ok(())
    }
}
