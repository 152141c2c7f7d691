//! Chat command.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use copilot_core::StreamEvent;
use serde_json::{Value, json};

use super::{connect, print_response};
use crate::Cli;

/// Arguments for the chat command.
#[derive(Args)]
pub struct ChatArgs {
    /// Message to send.
    pub prompt: String,

    /// Stream the answer as server-sent events.
    #[arg(long)]
    pub stream: bool,

    /// Do not ground the answer in web results.
    #[arg(long)]
    pub no_web_search: bool,
}

impl ChatArgs {
    /// Builds the chat payload.
    pub fn payload(&self) -> Value {
        json!({
            "messages": [{ "role": "user", "content": self.prompt }],
            "webSearchEnabled": !self.no_web_search,
            "useStream": self.stream,
        })
    }
}

/// Runs the chat command.
pub async fn run(args: &ChatArgs, cli: &Cli) -> Result<()> {
    let service = connect(cli).await?;
    let payload = args.payload();

    let outcome = if args.stream && !cli.quiet {
        let mut received = 0_usize;
        let mut on_event = |_: &StreamEvent| {
            received += 1;
            eprint!("\rReceiving stream... {received} events");
            let _ = std::io::stderr().flush();
        };
        let outcome = service.send_chat(&payload, Some(&mut on_event)).await;
        eprintln!();
        outcome?
    } else {
        service.send_chat(&payload, None).await?
    };

    print_response(cli, &outcome.into_value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let args = ChatArgs {
            prompt: "Hello".to_string(),
            stream: true,
            no_web_search: true,
        };
        assert_eq!(
            args.payload(),
            json!({
                "messages": [{ "role": "user", "content": "Hello" }],
                "webSearchEnabled": false,
                "useStream": true,
            })
        );
    }
}
