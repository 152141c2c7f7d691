//! CLI command implementations.

pub mod account;
pub mod chat;
pub mod config;
pub mod interactions;
pub mod query;

use std::sync::Arc;

use anyhow::Result;
use copilot_auth::entra::browser::open_url;
use copilot_auth::{CredentialManager, EntraIdentityProvider};
use copilot_services::CopilotService;
use copilot_store::{AppSettings, open_persistence};
use serde_json::Value;
use tracing::debug;

use crate::output::{JsonFormatter, extract_formatted_text};
use crate::{Cli, OutputFormat};

/// Loads and validates settings.
pub fn load_settings() -> Result<AppSettings> {
    Ok(AppSettings::from_env()?)
}

/// Wires settings, token cache, identity provider and service together.
pub async fn connect(cli: &Cli) -> Result<CopilotService> {
    let settings = load_settings()?;
    let persistence = open_persistence(settings.token_cache_backend, &settings.token_cache_path);
    debug!(cache = %persistence.location(), "Using token cache");

    let quiet = cli.quiet;
    let provider = EntraIdentityProvider::load(&settings, Arc::clone(&persistence))
        .await?
        .with_browser(Arc::new(move |url: &str| {
            if !quiet {
                eprintln!("Opening the browser to sign in. If it does not open, visit:\n{url}");
            }
            open_url(url);
        }));

    // The device code must reach the user even in quiet mode.
    let manager = CredentialManager::new(&settings, Arc::new(provider), persistence)
        .with_device_prompt(Arc::new(|message: &str| eprintln!("{message}")));

    Ok(CopilotService::new(&settings, Arc::new(manager))?)
}

/// Prints an API response as readable text or JSON.
pub fn print_response(cli: &Cli, response: &Value) -> Result<()> {
    match cli.format {
        OutputFormat::Text => println!("{}", extract_formatted_text(response)),
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(response)?),
    }
    Ok(())
}
