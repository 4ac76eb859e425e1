//! Chat command handler.
//!
//! An interactive loop over the pipeline. Lines starting with `/` change the
//! pipeline settings; anything else is a question. A failed question is
//! reported and the loop continues.

use super::{build_pipeline, print_answer, PipelineArgs};
use clap::Args;
use ragchat_core::{config::AppConfig, AppError, AppResult};
use ragchat_knowledge::{DocumentInput, RagPipeline};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  /load <path or url>      load more documents
  /prompt <name>           switch prompt strategy
  /instruction <text|off>  set or clear the appended instruction
  /role <text>             set the assistant role
  /rerank on|off           parent reranking
  /rewrite on|off          query rewriting
  /memory on|off           conversation memory (off forgets the history)
  /stats                   index statistics
  /help                    this text
  /quit                    leave";

/// Chat with the loaded documents
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Documents (paths or URLs) to load before chatting
    #[arg(long = "load")]
    pub load: Vec<String>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Remember previous turns and condense follow-up questions
    #[arg(long)]
    pub memory: bool,
}

enum Step {
    Continue,
    Quit,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let mut pipeline = build_pipeline(config)?;
        if !self.load.is_empty() {
            let inputs = self.load.iter().cloned().map(DocumentInput::from).collect();
            let report = pipeline.load_documents(inputs).await?;
            println!("Loaded {} documents ({} new chunks)", report.documents, report.added);
        }
        self.pipeline.apply(config, &mut pipeline)?;
        if self.memory {
            pipeline.set_memory(true).await;
        }

        println!("Ask a question, or /help for commands.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let outcome = if let Some(command) = line.strip_prefix('/') {
                handle_command(&mut pipeline, command).await
            } else {
                ask(&pipeline, line).await.map(|_| Step::Continue)
            };

            match outcome {
                Ok(Step::Continue) => {}
                Ok(Step::Quit) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Chat turn failed");
                    eprintln!("Error: {}", e);
                }
            }
        }

        Ok(())
    }
}

async fn ask(pipeline: &RagPipeline, question: &str) -> AppResult<()> {
    let chain = pipeline.get_chain()?;
    let answer = chain.invoke(question).await?;
    print_answer(&answer, false)
}

fn parse_switch(value: &str) -> AppResult<bool> {
    match value {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(AppError::Config(format!("Expected on or off, got '{}'", other))),
    }
}

async fn handle_command(pipeline: &mut RagPipeline, command: &str) -> AppResult<Step> {
    let (name, arg) = match command.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "exit" => return Ok(Step::Quit),
        "help" => println!("{}", HELP),
        "load" => {
            let report = pipeline.load_documents(vec![DocumentInput::from(arg)]).await?;
            println!("Loaded {} documents ({} new chunks)", report.documents, report.added);
            for skipped in &report.skipped {
                println!("Skipped {}: {}", skipped.source, skipped.reason);
            }
        }
        "prompt" => {
            let instruction = pipeline.options().additional_instruction.clone();
            pipeline.set_prompt_type(arg, instruction)?;
            println!("Prompt type: {}", arg);
        }
        "instruction" => {
            let prompt_type = pipeline.options().prompt_type.clone();
            let instruction = (arg != "off").then(|| arg.to_string());
            pipeline.set_prompt_type(&prompt_type, instruction)?;
        }
        "role" => pipeline.set_role((!arg.is_empty()).then(|| arg.to_string())),
        "rerank" => pipeline.set_use_reranker(parse_switch(arg)?),
        "rewrite" => pipeline.set_query_rewriting(parse_switch(arg)?),
        "memory" => pipeline.set_memory(parse_switch(arg)?).await,
        "stats" => match pipeline.stats()? {
            Some(stats) => println!(
                "{} documents, {} chunks ({} / {})",
                stats.parents, stats.chunks, stats.provider, stats.model
            ),
            None => println!("No documents loaded"),
        },
        other => {
            return Err(AppError::Config(format!(
                "Unknown command '/{}'. Type /help for the list.",
                other
            )))
        }
    }

    Ok(Step::Continue)
}
