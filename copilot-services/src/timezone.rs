//! Location hint time zone.
//!
//! The chat API wants an IANA key such as `Europe/Berlin`. Resolution order:
//!
//! 1. the configured override
//! 2. the local zone key (`TZ`, the `/etc/localtime` link, `/etc/timezone`)
//! 3. the local zone abbreviation, when it happens to be a key
//! 4. `Etc/UTC`

use std::path::Path;

use chrono::Local;
use tracing::trace;

/// Zone used when nothing local looks like an IANA key.
pub const FALLBACK_TIME_ZONE: &str = "Etc/UTC";

const ZONEINFO_MARKER: &str = "zoneinfo/";

/// Resolves the time zone for chat location hints.
pub fn resolve_time_zone(configured: Option<&str>) -> String {
    let key = local_zone_key();
    let abbreviation = Local::now().format("%Z").to_string();
    let zone = pick_time_zone(configured, key.as_deref(), &abbreviation);
    trace!(zone = %zone, "Resolved time zone");
    zone
}

/// Applies the resolution order to already-gathered candidates.
pub fn pick_time_zone(configured: Option<&str>, local_key: Option<&str>, abbreviation: &str) -> String {
    if let Some(configured) = configured.map(str::trim).filter(|c| !c.is_empty()) {
        return configured.to_string();
    }

    [local_key.unwrap_or_default(), abbreviation]
        .into_iter()
        .map(str::trim)
        .find(|candidate| candidate.contains('/'))
        .map_or_else(|| FALLBACK_TIME_ZONE.to_string(), ToString::to_string)
}

fn local_zone_key() -> Option<String> {
    if let Ok(tz) = std::env::var("TZ") {
        let tz = tz.trim().trim_start_matches(':');
        if tz.contains('/') {
            return Some(zone_from_path(tz).unwrap_or(tz).to_string());
        }
    }

    if let Ok(target) = std::fs::read_link("/etc/localtime") {
        if let Some(zone) = target.to_str().and_then(zone_from_path) {
            return Some(zone.to_string());
        }
    }

    read_zone_file(Path::new("/etc/timezone"))
}

/// Extracts `Area/City` from a path such as `/usr/share/zoneinfo/Area/City`.
fn zone_from_path(path: &str) -> Option<&str> {
    path.rsplit_once(ZONEINFO_MARKER)
        .map(|(_, zone)| zone)
        .filter(|zone| !zone.is_empty())
}

fn read_zone_file(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let zone = content.lines().next()?.trim();
    (!zone.is_empty()).then(|| zone.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_zone_wins() {
        assert_eq!(
            pick_time_zone(Some(" America/Chicago "), Some("Europe/Paris"), "CET"),
            "America/Chicago"
        );
    }

    #[test]
    fn test_blank_override_is_ignored() {
        assert_eq!(pick_time_zone(Some("  "), Some("Europe/Paris"), "CET"), "Europe/Paris");
    }

    #[test]
    fn test_key_without_slash_falls_through() {
        assert_eq!(pick_time_zone(None, Some("UTC"), "Asia/Tokyo"), "Asia/Tokyo");
        assert_eq!(pick_time_zone(None, Some("UTC"), "JST"), FALLBACK_TIME_ZONE);
        assert_eq!(pick_time_zone(None, None, ""), FALLBACK_TIME_ZONE);
    }

    #[test]
    fn test_zone_from_path() {
        assert_eq!(
            zone_from_path("/usr/share/zoneinfo/America/New_York"),
            Some("America/New_York")
        );
        assert_eq!(
            zone_from_path("../usr/share/zoneinfo/Europe/Oslo"),
            Some("Europe/Oslo")
        );
        assert_eq!(zone_from_path("/etc/localtime"), None);
    }

    #[test]
    fn test_read_zone_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("timezone");
        std::fs::write(&file, "Australia/Sydney\n").unwrap();

        assert_eq!(read_zone_file(&file).as_deref(), Some("Australia/Sydney"));
        assert_eq!(read_zone_file(&dir.path().join("missing")), None);
    }
}
