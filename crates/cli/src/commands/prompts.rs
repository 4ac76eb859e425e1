//! Prompts command handler.

use clap::Args;
use ragchat_core::{config::AppConfig, AppResult};
use ragchat_prompt::PromptStore;

/// List prompt strategies or print one template
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Template to print
    pub name: Option<String>,
}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let prompts_path = config.prompts_path();
        let store = PromptStore::load_or_builtin(prompts_path.as_deref())?;

        if let Some(name) = &self.name {
            println!("{}", store.get(name)?);
            return Ok(());
        }

        match store.source() {
            Some(path) => println!("Prompt strategies ({}):", path.display()),
            None => println!("Prompt strategies (builtin):"),
        }
        for name in store.strategies() {
            let marker = if name == config.retrieval.prompt_type { " (default)" } else { "" };
            println!("- {}{}", name, marker);
        }

        Ok(())
    }
}
