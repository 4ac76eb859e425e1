//! ragchat CLI
//!
//! Main entry point for the ragchat command-line tool.
//! Chat with PDF documents through retrieval-augmented generation.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, ChatCommand, IngestCommand, LogsCommand, PromptsCommand, SearchCommand,
    StatsCommand,
};
use ragchat_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// ragchat - chat with your PDF documents
#[derive(Parser, Debug)]
#[command(name = "ragchat")]
#[command(about = "Chat with PDF documents using retrieval-augmented generation", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RAGCHAT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RAGCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load documents into the index
    Ingest(IngestCommand),

    /// Ask one question
    Ask(AskCommand),

    /// Interactive chat over the documents
    Chat(ChatCommand),

    /// Show retrieved chunks for a query
    Search(SearchCommand),

    /// Show index statistics
    Stats(StatsCommand),

    /// List prompt strategies
    Prompts(PromptsCommand),

    /// Show the latest run log
    Logs(LogsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // .env provides the API keys
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load_with(cli.workspace, cli.config)?
        .with_overrides(cli.log_level, cli.verbose, cli.no_color);
    config.validate()?;

    let log_path = config.log_path();
    let _guard = logging::init_logging(
        config.log_level.as_deref(),
        config.no_color,
        Some(log_path.as_path()),
    )?;

    tracing::debug!("Workspace: {:?}", config.workspace);

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Search(_) => "search",
        Commands::Stats(_) => "stats",
        Commands::Prompts(_) => "prompts",
        Commands::Logs(_) => "logs",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config).await,
        Commands::Logs(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
