//! AI interactions command.

use anyhow::Result;
use clap::Args;

use super::connect;
use crate::Cli;
use crate::output::JsonFormatter;

/// Arguments for the interactions command.
#[derive(Args)]
pub struct InteractionsArgs {
    /// Maximum number of interactions to return.
    #[arg(long)]
    pub top: Option<u32>,

    /// OData filter, e.g. `appClass eq 'IPM.SkypeTeams.Message.Copilot.BizChat'`.
    #[arg(long)]
    pub filter: Option<String>,
}

/// Runs the interactions command. The response is always printed as JSON.
pub async fn run(args: &InteractionsArgs, cli: &Cli) -> Result<()> {
    let service = connect(cli).await?;
    let response = service
        .get_ai_interactions(args.top, args.filter.as_deref())
        .await?;
    println!("{}", JsonFormatter::new(cli.pretty).format(&response)?);
    Ok(())
}
