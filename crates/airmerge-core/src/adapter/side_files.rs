//! Persisted side-files that carry device history between runs.
//!
//! Both stores are tiny comma-separated files written next to the report:
//!
//! - peak stores (`-appower.csv`, `-stapower.csv`): `MAC, power, time`
//! - printed store (`-printed.csv`): `MAC, last-displayed, cached SSID`
//!
//! Each line ends in CRLF and the peak stores finish with one blank line.
//! A missing file means "no history"; a line that cannot be interpreted is
//! skipped with a warning so one bad row never costs the rest.

use std::fmt::Write as _;
use std::io;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use crate::domain::device::{Device, PeakPower};
use crate::domain::mac::MacAddr;
use crate::domain::timestamp::Timestamp;
use crate::error::{MergeError, MergeResult};

const CRLF: &str = "\r\n";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One row of a peak store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakRecord {
    /// Device MAC.
    pub mac: MacAddr,
    /// Persisted peak.
    pub peak: PeakPower,
}

/// One row of the printed store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintedRecord {
    /// Station MAC.
    pub mac: MacAddr,
    /// When the station was last written to a report.
    pub last_displayed: Timestamp,
    /// SSID of the station's access point at that time.
    pub essid: String,
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

fn reader(text: &str, trim: Trim) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(trim)
        .from_reader(text.as_bytes())
}

fn record_line(record: &StringRecord) -> usize {
    record.position().map_or(0, |p| p.line() as usize)
}

fn skip(origin: &str, line: usize, reason: &str) {
    let err = MergeError::MalformedSideFile {
        origin: origin.to_owned(),
        line,
        reason: reason.to_owned(),
    };
    warn!(%err, "skipping side-file line");
}

/// Read a whole file, treating "not found" as an empty file.
fn read_optional(path: &Path) -> MergeResult<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MergeError::read(path, e)),
    }
}

/// Parse peak-store text.
pub fn parse_peak_store(text: &str, origin: &str) -> Vec<PeakRecord> {
    let mut out = Vec::new();
    for result in reader(text, Trim::All).records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(origin, error = %e, "unreadable peak-store record");
                continue;
            }
        };
        let line = record_line(&record);
        if record.len() < 3 {
            skip(origin, line, "expected MAC, power and time");
            continue;
        }
        let Ok(mac) = MacAddr::parse(&record[0]) else {
            skip(origin, line, "bad MAC address");
            continue;
        };
        let Ok(power) = record[1].parse::<i32>() else {
            skip(origin, line, "bad power value");
            continue;
        };
        let time = if record[2].is_empty() {
            None
        } else {
            match Timestamp::parse(&record[2]) {
                Ok(t) => Some(t),
                Err(_) => {
                    skip(origin, line, "bad timestamp");
                    continue;
                }
            }
        };
        out.push(PeakRecord {
            mac,
            peak: PeakPower { power, time },
        });
    }
    debug!(origin, records = out.len(), "parsed peak store");
    out
}

/// Read a peak store; a missing file yields no records.
pub fn read_peak_store(path: &Path) -> MergeResult<Vec<PeakRecord>> {
    Ok(read_optional(path)?
        .map(|text| parse_peak_store(&text, &path.display().to_string()))
        .unwrap_or_default())
}

/// Parse printed-store text.
///
/// The SSID is everything after the second comma, so it may itself contain
/// commas.
pub fn parse_printed_store(text: &str, origin: &str) -> Vec<PrintedRecord> {
    let mut out = Vec::new();
    for result in reader(text, Trim::None).records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(origin, error = %e, "unreadable printed-store record");
                continue;
            }
        };
        let line = record_line(&record);
        if record.len() < 2 {
            skip(origin, line, "expected MAC and last-displayed time");
            continue;
        }
        let Ok(mac) = MacAddr::parse(&record[0]) else {
            skip(origin, line, "bad MAC address");
            continue;
        };
        let Ok(last_displayed) = Timestamp::parse(&record[1]) else {
            skip(origin, line, "bad timestamp");
            continue;
        };
        let joined = record.iter().skip(2).collect::<Vec<_>>().join(",");
        let essid = joined.strip_prefix(' ').unwrap_or(&joined).to_owned();
        out.push(PrintedRecord {
            mac,
            last_displayed,
            essid,
        });
    }
    debug!(origin, records = out.len(), "parsed printed store");
    out
}

/// Read the printed store; a missing file yields no records.
pub fn read_printed_store(path: &Path) -> MergeResult<Vec<PrintedRecord>> {
    Ok(read_optional(path)?
        .map(|text| parse_printed_store(&text, &path.display().to_string()))
        .unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Render a peak store for `devices`.
pub fn render_peak_store<'a, D, I>(devices: I) -> String
where
    D: Device + 'a,
    I: IntoIterator<Item = &'a D>,
{
    let mut out = String::new();
    for device in devices {
        let peak = device.history().peak;
        let time = peak.time.map(|t| t.to_string()).unwrap_or_default();
        let _ = write!(out, "{}, {}, {}{CRLF}", device.mac(), peak.power, time);
    }
    out.push_str(CRLF);
    out
}

/// Render the printed store.
pub fn render_printed_store(records: &[PrintedRecord]) -> String {
    let mut out = String::new();
    for r in records {
        let _ = write!(out, "{}, {}, {}{CRLF}", r.mac, r.last_displayed, r.essid);
    }
    out
}

/// Write `contents` to `path`, replacing any previous file.
pub fn write_side_file(path: &Path, contents: &str) -> MergeResult<()> {
    std::fs::write(path, contents).map_err(|e| MergeError::write(path, e))?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote side-file");
    Ok(())
}
