//! Search, retrieval and batch commands.

use anyhow::Result;
use clap::Args;
use copilot_services::next_link_of;
use serde_json::{Map, Value, json};

use super::{connect, print_response};
use crate::output::continuation_hint;
use crate::{Cli, OutputFormat};

// ============================================================================
// Arguments
// ============================================================================

/// Arguments for the search command.
#[derive(Args)]
pub struct SearchArgs {
    /// Search query.
    pub query: String,

    /// Results per page.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub page_size: u32,

    /// KQL filter expression.
    #[arg(long)]
    pub filter: Option<String>,
}

impl SearchArgs {
    /// Builds the search payload.
    pub fn payload(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".into(), json!(self.query));
        body.insert("pageSize".into(), json!(self.page_size));
        if let Some(filter) = non_blank(self.filter.as_deref()) {
            body.insert("filterExpression".into(), json!(filter));
        }
        Value::Object(body)
    }
}

/// Arguments for the search-next command.
#[derive(Args)]
pub struct SearchNextArgs {
    /// The `@odata.nextLink` from a previous search.
    pub link: String,
}

/// Arguments for the retrieve command.
#[derive(Args)]
pub struct RetrieveArgs {
    /// Query string.
    #[arg(long)]
    pub query: String,

    /// Data source, e.g. `sharePoint` or `oneDriveBusiness`.
    #[arg(long)]
    pub data_source: String,

    /// Maximum number of results.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=25))]
    pub max_results: u32,

    /// KQL filter expression.
    #[arg(long)]
    pub filter: Option<String>,
}

impl RetrieveArgs {
    /// Builds the retrieval payload.
    pub fn payload(&self) -> Value {
        retrieval_payload(&self.query, &self.data_source, self.max_results, self.filter.as_deref())
    }
}

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Chat message to include.
    #[arg(long)]
    pub chat: Option<String>,

    /// Do not ground the chat answer in web results.
    #[arg(long)]
    pub no_web_search: bool,

    /// Search query to include.
    #[arg(long)]
    pub search: Option<String>,

    /// Results per search page.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub page_size: u32,

    /// Retrieval query to include.
    #[arg(long, requires = "retrieval_source")]
    pub retrieval_query: Option<String>,

    /// Retrieval data source.
    #[arg(long)]
    pub retrieval_source: Option<String>,

    /// Maximum retrieval results.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=25))]
    pub max_results: u32,
}

impl BatchArgs {
    /// Builds the batch payload. Sections left out on the command line are
    /// omitted.
    pub fn payload(&self) -> Value {
        let mut body = Map::new();
        if let Some(chat) = &self.chat {
            body.insert(
                "chat".into(),
                json!({
                    "messages": [{ "role": "user", "content": chat }],
                    "webSearchEnabled": !self.no_web_search,
                }),
            );
        }
        if let Some(query) = &self.search {
            body.insert(
                "search".into(),
                json!({ "query": query, "pageSize": self.page_size }),
            );
        }
        if let (Some(query), Some(source)) = (&self.retrieval_query, &self.retrieval_source) {
            body.insert(
                "retrieval".into(),
                retrieval_payload(query, source, self.max_results, None),
            );
        }
        Value::Object(body)
    }
}

fn retrieval_payload(query: &str, source: &str, max_results: u32, filter: Option<&str>) -> Value {
    let mut body = Map::new();
    body.insert("queryString".into(), json!(query));
    body.insert("dataSource".into(), json!(source));
    body.insert("maximumNumberOfResults".into(), json!(max_results));
    if let Some(filter) = non_blank(filter) {
        body.insert("filterExpression".into(), json!(filter));
    }
    Value::Object(body)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Commands
// ============================================================================

/// Runs the search command.
pub async fn search(args: &SearchArgs, cli: &Cli) -> Result<()> {
    let service = connect(cli).await?;
    let response = service.run_search(&args.payload()).await?;
    print_search_page(cli, &response)
}

/// Runs the search-next command.
pub async fn search_next(args: &SearchNextArgs, cli: &Cli) -> Result<()> {
    let service = connect(cli).await?;
    let response = service.run_search_next_page(&args.link).await?;
    print_search_page(cli, &response)
}

/// Runs the retrieve command.
pub async fn retrieve(args: &RetrieveArgs, cli: &Cli) -> Result<()> {
    let service = connect(cli).await?;
    let response = service.run_retrieval(&args.payload()).await?;
    print_response(cli, &response)
}

/// Runs the batch command.
pub async fn batch(args: &BatchArgs, cli: &Cli) -> Result<()> {
    let service = connect(cli).await?;
    let response = service.run_batch(&args.payload()).await?;
    print_response(cli, &response)
}

fn print_search_page(cli: &Cli, response: &Value) -> Result<()> {
    print_response(cli, response)?;
    if cli.format == OutputFormat::Text && !cli.quiet {
        eprintln!("\n{}", continuation_hint(response, next_link_of(response).as_deref()));
    }
    Ok(())
}
