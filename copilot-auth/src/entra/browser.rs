//! System browser launcher.

use std::process::Command;

use tracing::{debug, warn};

/// Opens `url` with the platform's default handler.
pub fn open_url(url: &str) {
    match opener(url).spawn() {
        Ok(_) => debug!("Opened browser for sign-in"),
        Err(e) => warn!(error = %e, "Could not open a browser; open the sign-in URL manually"),
    }
}

/// The command that hands `url` to the default handler. The URL is always a
/// single argument; `cmd /c start` would split it on `&`.
fn opener(url: &str) -> Command {
    #[cfg(target_os = "macos")]
    let command = {
        let mut command = Command::new("open");
        command.arg(url);
        command
    };

    #[cfg(target_os = "windows")]
    let command = {
        let mut command = Command::new("rundll32");
        command.args(["url.dll,FileProtocolHandler", url]);
        command
    };

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let command = {
        let mut command = Command::new("xdg-open");
        command.arg(url);
        command
    };

    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_passed_as_one_argument() {
        let url = "https://login.microsoftonline.com/t/oauth2/v2.0/authorize?client_id=cid&response_type=code&state=s";
        let command = opener(url);

        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args.last().copied(), Some(std::ffi::OsStr::new(url)));
        assert_ne!(command.get_program(), "cmd");
    }
}
