//! Logs command handler.

use clap::Args;
use ragchat_core::{config::AppConfig, logging::read_latest_run, AppResult};

/// Print the run log of the most recent pipeline run
#[derive(Args, Debug)]
pub struct LogsCommand {
    /// Print the whole log instead of the latest run
    #[arg(long)]
    pub all: bool,
}

impl LogsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let text = read_latest_run(&config.log_path(), self.all)?;
        print!("{}", text);
        if !text.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}
