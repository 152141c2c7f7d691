// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Copilot CLI - chat, search and retrieval against the Microsoft 365 Copilot APIs.
//!
//! # Examples
//!
//! ```bash
//! # Sign in (browser, with device-code fallback)
//! copilot sign-in
//!
//! # Ask a question, streaming the answer
//! copilot chat "What changed in the Q3 plan?" --stream
//!
//! # Search and follow the continuation link
//! copilot search "quarterly report" --page-size 25
//! copilot search-next 'https://graph.microsoft.com/beta/copilot/search?$skiptoken=...'
//!
//! # Retrieval with raw JSON output
//! copilot retrieve --query "travel policy" --data-source sharePoint --format json --pretty
//!
//! # Several operations in one request
//! copilot batch --chat "Summarize" --search "roadmap"
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use copilot_services::ServiceError;
use copilot_store::ConfigError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{account, chat, config, interactions, query};

// ============================================================================
// CLI Definition
// ============================================================================

/// Copilot CLI - Microsoft 365 Copilot chat, search and retrieval.
#[derive(Parser)]
#[command(name = "copilot")]
#[command(about = "Microsoft 365 Copilot API client")]
#[command(long_about = r#"
Talks to the Microsoft 365 Copilot chat, search and retrieval APIs with a
delegated Entra ID sign-in.

Configuration comes from COPILOT_* environment variables, or a .env file
($COPILOT_ENV_FILE, ./.env, or next to the executable). Required:
  COPILOT_TENANT_ID, COPILOT_CLIENT_ID, COPILOT_SCOPES

Examples:
  copilot sign-in                       # Sign in
  copilot chat "Hello" --stream         # Streaming chat
  copilot search "roadmap"              # Search
  copilot batch --chat "Hi" --search x  # Batched operations
  copilot config                        # Show effective settings
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show who is signed in.
    #[command(visible_alias = "st")]
    Status,

    /// Sign in, reusing a cached account when possible.
    SignIn,

    /// Forget cached accounts and erase the token cache.
    SignOut,

    /// Send a chat message.
    #[command(visible_alias = "c")]
    Chat(chat::ChatArgs),

    /// Search organizational content.
    #[command(visible_alias = "s")]
    Search(query::SearchArgs),

    /// Fetch the next page of a search.
    SearchNext(query::SearchNextArgs),

    /// Retrieve grounding extracts.
    #[command(visible_alias = "r")]
    Retrieve(query::RetrieveArgs),

    /// Run chat, search and retrieval in one batched request.
    #[command(visible_alias = "b")]
    Batch(query::BatchArgs),

    /// List the signed-in user's Copilot interactions.
    Interactions(interactions::InteractionsArgs),

    /// Show the effective configuration.
    Config,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Settings missing or invalid.
    Config = 2,
}

impl ExitCode {
    /// Picks the exit code for a failed command.
    fn for_error(error: &anyhow::Error) -> Self {
        let is_config = error.downcast_ref::<ConfigError>().is_some()
            || matches!(
                error.downcast_ref::<ServiceError>(),
                Some(ServiceError::Config(_))
            );
        if is_config { Self::Config } else { Self::Error }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("copilot=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result: Result<()> = match &cli.command {
        Commands::Status => account::status(&cli).await,
        Commands::SignIn => account::sign_in(&cli).await,
        Commands::SignOut => account::sign_out(&cli).await,
        Commands::Chat(args) => chat::run(args, &cli).await,
        Commands::Search(args) => query::search(args, &cli).await,
        Commands::SearchNext(args) => query::search_next(args, &cli).await,
        Commands::Retrieve(args) => query::retrieve(args, &cli).await,
        Commands::Batch(args) => query::batch(args, &cli).await,
        Commands::Interactions(args) => interactions::run(args, &cli).await,
        Commands::Config => config::run(&cli),
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    std::process::exit(ExitCode::Success as i32);
}
