//! Loaders for the OUI database and the user known-device / known-IP lists.
//!
//! All three files use fixed character offsets rather than delimiters:
//!
//! ```text
//! 00-1A-2B   (hex)      Acme Networks         <- OUI file: prefix 0..8, name at 18
//! 00:11:22:33:44:55 my laptop                 <- known file: MAC 0..17, text at 18
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::mac::{MacAddr, Oui};
use crate::domain::vendor::{KnownDb, VendorDb, VENDOR_NAME_CAP};
use crate::error::{MergeError, MergeResult};

/// Well-known install locations of the scanner's OUI database, in search order.
pub const DEFAULT_OUI_PATHS: [&str; 2] = [
    "/usr/share/aircrack-ng/airodump-ng-oui.txt",
    "/etc/aircrack-ng/airodump-ng-oui.txt",
];

/// Offset at which the vendor name or description begins.
const VALUE_OFFSET: usize = 18;

/// Length of the OUI prefix field.
const OUI_LEN: usize = 8;

fn malformed(origin: &str, line: usize, reason: impl Into<String>) -> MergeError {
    MergeError::MalformedVendorLine {
        origin: origin.to_owned(),
        line,
        reason: reason.into(),
    }
}

/// Slice from `start` to the end of the line, cut to `cap` bytes on a char boundary.
fn value_from(line: &str, start: usize, cap: usize) -> &str {
    let value = line.get(start..).unwrap_or("");
    if value.len() <= cap {
        return value;
    }
    let mut end = cap;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Non-blank lines with their 1-based numbers and line terminators removed.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, l)| (idx + 1, l.strip_suffix('\r').unwrap_or(l)))
        .filter(|(_, l)| !l.trim().is_empty())
}

/// Parse OUI database text.
pub fn parse_oui_db(text: &str, origin: &str) -> MergeResult<VendorDb> {
    let mut entries = Vec::new();
    for (line_no, line) in content_lines(text) {
        if line.len() < VALUE_OFFSET || !line.is_char_boundary(OUI_LEN) {
            return Err(malformed(
                origin,
                line_no,
                format!("expected at least {VALUE_OFFSET} characters"),
            ));
        }
        let prefix = &line[..OUI_LEN];
        let oui = Oui::parse(prefix)
            .map_err(|_| malformed(origin, line_no, format!("'{prefix}' is not a hex OUI")))?;
        let vendor = value_from(line, VALUE_OFFSET, VENDOR_NAME_CAP).trim_end();
        entries.push((oui, vendor.to_owned()));
    }
    debug!(origin, entries = entries.len(), "parsed OUI database");
    Ok(VendorDb::from_entries(entries))
}

/// Parse known-device or known-IP text.
pub fn parse_known_db(text: &str, origin: &str) -> MergeResult<KnownDb> {
    let mut entries = Vec::new();
    for (line_no, line) in content_lines(text) {
        if line.len() < VALUE_OFFSET || !line.is_char_boundary(MacAddr::TEXT_LEN) {
            return Err(malformed(
                origin,
                line_no,
                format!("expected at least {VALUE_OFFSET} characters"),
            ));
        }
        let text_mac = &line[..MacAddr::TEXT_LEN];
        let mac = MacAddr::parse(text_mac)
            .map_err(|_| malformed(origin, line_no, format!("'{text_mac}' is not a MAC address")))?;
        let value = value_from(line, VALUE_OFFSET, VENDOR_NAME_CAP).trim_end();
        entries.push((mac, value.to_owned()));
    }
    debug!(origin, entries = entries.len(), "parsed known-device list");
    Ok(KnownDb::from_entries(entries))
}

fn read_text(path: &Path) -> MergeResult<String> {
    let bytes = std::fs::read(path).map_err(|e| MergeError::read(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Load an OUI database from `path`.
pub fn load_oui_db(path: &Path) -> MergeResult<VendorDb> {
    let db = parse_oui_db(&read_text(path)?, &path.display().to_string())?;
    info!(path = %path.display(), vendors = db.len(), "loaded OUI database");
    Ok(db)
}

/// Load a known-device or known-IP list from `path`.
pub fn load_known_db(path: &Path) -> MergeResult<KnownDb> {
    let db = parse_known_db(&read_text(path)?, &path.display().to_string())?;
    info!(path = %path.display(), entries = db.len(), "loaded known-device list");
    Ok(db)
}

/// First of [`DEFAULT_OUI_PATHS`] that exists.
pub fn find_default_oui_db() -> Option<PathBuf> {
    DEFAULT_OUI_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}
