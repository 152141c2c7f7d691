//! Status, sign-in and sign-out commands.

use anyhow::Result;
use copilot_core::CredentialSession;

use super::connect;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the status command.
pub async fn status(cli: &Cli) -> Result<()> {
    let service = connect(cli).await?;
    print_session(cli, &service.session_state().await)
}

/// Runs the sign-in command.
pub async fn sign_in(cli: &Cli) -> Result<()> {
    let service = connect(cli).await?;
    let session = service.sign_in().await?;
    print_session(cli, &session)
}

/// Runs the sign-out command.
pub async fn sign_out(cli: &Cli) -> Result<()> {
    let service = connect(cli).await?;
    service.sign_out().await?;

    match cli.format {
        OutputFormat::Text => {
            if !cli.quiet {
                println!("Signed out.");
            }
        }
        OutputFormat::Json => {
            let state = service.session_state().await;
            println!("{}", JsonFormatter::new(cli.pretty).format(&state)?);
        }
    }
    Ok(())
}

fn print_session(cli: &Cli, session: &CredentialSession) -> Result<()> {
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_session(session));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(session)?);
        }
    }
    Ok(())
}
