//! Stats command handler.
//!
//! Shows what the persisted index holds without loading a generation model.

use super::build_embedder;
use clap::Args;
use ragchat_core::{config::AppConfig, AppError, AppResult};
use ragchat_knowledge::VectorStore;

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let embedder = build_embedder(config)?;
        let Some(store) = VectorStore::open(&config.index_path(), embedder.as_ref())? else {
            println!("No index at {}. Run 'ragchat ingest' first.", config.index_path().display());
            return Ok(());
        };
        let stats = store.stats()?;

        if self.json {
            let output = serde_json::to_string_pretty(&stats)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", output);
        } else {
            println!("Index:      {}", stats.path.display());
            println!("Documents:  {}", stats.parents);
            println!("Chunks:     {}", stats.chunks);
            println!(
                "Embeddings: {} / {} ({} dims)",
                stats.provider, stats.model, stats.dimensions
            );
            println!("Size:       {} bytes", stats.size_bytes);
        }

        Ok(())
    }
}
