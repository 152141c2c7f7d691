//! Config command - show the effective configuration.

use anyhow::Result;
use copilot_store::{AppSettings, open_persistence};
use serde_json::json;

use super::load_settings;
use crate::output::{JsonFormatter, TextFormatter, mask_tenant_id};
use crate::{Cli, OutputFormat};

/// Runs the config command.
pub fn run(cli: &Cli) -> Result<()> {
    let settings = load_settings()?;
    let cache = open_persistence(settings.token_cache_backend, &settings.token_cache_path).location();

    match cli.format {
        OutputFormat::Text => print_text(cli, &settings, &cache),
        OutputFormat::Json => {
            let value = json!({
                "tenantId": mask_tenant_id(&settings.tenant_id),
                "clientId": mask_tenant_id(&settings.client_id),
                "authority": settings.authority,
                "scopes": settings.scopes,
                "baseUrl": settings.base_url,
                "chatPath": settings.chat_path,
                "searchPath": settings.search_path,
                "retrievalPath": settings.retrieval_path,
                "batchPath": settings.batch_path,
                "aiInteractionsPath": settings.ai_interactions_path,
                "timeoutSeconds": settings.timeout_seconds,
                "retryAttempts": settings.retry_attempts,
                "tokenCache": {
                    "backend": settings.token_cache_backend.as_str(),
                    "location": cache,
                },
                "authFlow": settings.auth_flow.as_str(),
                "redirectUri": settings.redirect_uri,
                "timeZone": settings.time_zone,
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&value)?);
        }
    }
    Ok(())
}

fn print_text(cli: &Cli, settings: &AppSettings, cache: &str) {
    let f = TextFormatter::new(!cli.no_color);
    let lines = [
        ("Tenant", mask_tenant_id(&settings.tenant_id)),
        ("Client", mask_tenant_id(&settings.client_id)),
        ("Authority", settings.authority.clone()),
        ("Scopes", settings.scopes.join(" ")),
        ("Base URL", settings.base_url.clone()),
        ("Chat", settings.chat_path.clone()),
        ("Search", settings.search_path.clone()),
        ("Retrieval", settings.retrieval_path.clone()),
        ("Batch", settings.batch_path.clone()),
        ("AI interactions", settings.ai_interactions_path.clone()),
        ("Timeout", format!("{}s", settings.timeout_seconds)),
        ("Retries", settings.retry_attempts.to_string()),
        ("Auth flow", settings.auth_flow.to_string()),
        ("Redirect URI", settings.redirect_uri.clone()),
        (
            "Token cache",
            format!("{} ({})", cache, settings.token_cache_backend),
        ),
        (
            "Time zone",
            settings.time_zone.clone().unwrap_or_else(|| "local".to_string()),
        ),
    ];

    for (key, value) in lines {
        println!("{}", f.format_setting(key, &value));
    }
}
