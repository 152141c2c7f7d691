//! Text output formatting with colors.

use copilot_core::CredentialSession;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats the sign-in state, masking identifying parts.
    pub fn format_session(&self, session: &CredentialSession) -> String {
        if !session.is_signed_in {
            return self.yellow("Not signed in");
        }

        let username = mask_username_domain(session.username.as_deref().unwrap_or("signed-in user"));
        let tenant = mask_tenant_id(session.tenant_id.as_deref().unwrap_or("unknown tenant"));
        format!(
            "{} {} {}",
            self.green("Signed in as"),
            self.bold(&username),
            self.dim(&format!("| Tenant: {tenant}")),
        )
    }

    /// Formats a `key: value` settings line.
    pub fn format_setting(&self, key: &str, value: &str) -> String {
        format!("{} {value}", self.bold(&format!("{key}:")))
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

// ============================================================================
// Masking
// ============================================================================

/// Masks the middle groups of a GUID tenant id, or the middle of any other
/// id longer than ten characters.
pub fn mask_tenant_id(tenant_id: &str) -> String {
    let value = tenant_id.trim();
    let parts: Vec<&str> = value.split('-').collect();
    if parts.len() == 5 && parts.iter().all(|p| !p.is_empty()) {
        return format!("{}-****-****-****-{}", parts[0], parts[4]);
    }

    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 10 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        return format!("{head}...{tail}");
    }
    value.to_string()
}

/// Hides the first six characters of the domain in an e-mail style username.
pub fn mask_username_domain(username: &str) -> String {
    let value = username.trim();
    let Some((local, domain)) = value.split_once('@') else {
        return value.to_string();
    };
    if domain.is_empty() {
        return value.to_string();
    }

    let hidden = domain.chars().count().min(6);
    let visible: String = domain.chars().skip(hidden).collect();
    format!("{local}@{}{visible}", "*".repeat(hidden))
}
