//! Output formatting for CLI.

mod extract;
mod json;
mod text;

pub use extract::{continuation_hint, extract_formatted_text};
pub use json::JsonFormatter;
pub use text::{TextFormatter, mask_tenant_id};

#[cfg(test)]
mod tests;
