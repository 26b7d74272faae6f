//! Adapter that reads airodump-style CSV snapshots.
//!
//! A snapshot has two record groups separated by a blank line:
//!
//! ```text
//! <blank>
//! BSSID, First time seen, Last time seen, channel, Speed, Privacy, ...
//! AA:BB:CC:DD:EE:01, 2024-01-01 10:00:00, 2024-01-01 10:05:00,  6, 54, WPA2, CCMP, PSK, -40, 120, 0, 0.  0.  0.  0, 4, home,
//! <blank>
//! Station MAC, First time seen, Last time seen, Power, # packets, BSSID, Probed ESSIDs
//! 00:11:22:33:44:55, 2024-01-01 10:00:00, 2024-01-01 10:05:00, -50, 12, (not associated) ,home
//! ```
//!
//! The tokenizer only splits text into named fields. Interpreting them
//! (MACs, timestamps, power) is the merge engine's job, which reports
//! failures against the line numbers recorded here.

use std::path::Path;

use tracing::debug;

use crate::domain::device::RecordGroup;
use crate::error::{MergeError, MergeResult};

/// Number of header lines before the first access-point row.
const HEADER_LINES: usize = 2;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Raw fields of one access-point row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApRow {
    /// 1-based line number inside the snapshot.
    pub line: usize,
    pub bssid: String,
    pub first_seen: String,
    pub last_seen: String,
    pub channel: String,
    pub speed: String,
    pub privacy: String,
    pub cipher: String,
    pub authentication: String,
    pub power: String,
    pub beacons: String,
    pub ivs: String,
    pub lan_ip: String,
    pub id_length: String,
    /// Everything up to the last comma on the line, commas included.
    pub essid: String,
    pub key: String,
}

/// Raw fields of one station row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationRow {
    /// 1-based line number inside the snapshot.
    pub line: usize,
    pub mac: String,
    pub first_seen: String,
    pub last_seen: String,
    pub power: String,
    pub packets: String,
    pub bssid: String,
    /// Free text to end of line.
    pub probed: String,
}

/// A tokenized snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Access-point rows in file order.
    pub access_points: Vec<ApRow>,
    /// Station rows in file order.
    pub stations: Vec<StationRow>,
}

// ---------------------------------------------------------------------------
// Field cursor
// ---------------------------------------------------------------------------

/// Walks the comma-separated fields of a single line.
struct FieldCursor<'a> {
    rest: &'a str,
    group: RecordGroup,
    line: usize,
    mac: &'a str,
}

impl<'a> FieldCursor<'a> {
    fn new(text: &'a str, group: RecordGroup, line: usize) -> Self {
        let rest = skip_blanks(text);
        let mac = rest.split(',').next().unwrap_or("").trim();
        Self {
            rest,
            group,
            line,
            mac,
        }
    }

    /// Take the next non-final field; it must be followed by a comma.
    fn field(&mut self, name: &str) -> MergeResult<String> {
        let rest = skip_blanks(self.rest);
        match rest.find(',') {
            Some(pos) => {
                self.rest = &rest[pos + 1..];
                Ok(rest[..pos].to_owned())
            }
            None => Err(self.error(format!("unexpected end of line in field '{name}'"))),
        }
    }

    /// Take the SSID (up to the last comma) and the key that follows it.
    fn essid_and_key(&mut self) -> MergeResult<(String, String)> {
        let rest = skip_blanks(self.rest);
        match rest.rfind(',') {
            Some(pos) => {
                self.rest = "";
                let key = rest[pos + 1..].trim();
                Ok((rest[..pos].to_owned(), key.to_owned()))
            }
            None => Err(self.error("no comma after the ESSID field")),
        }
    }

    /// Everything left on the line.
    fn remainder(self) -> String {
        skip_blanks(self.rest).to_owned()
    }

    fn error(&self, reason: impl Into<String>) -> MergeError {
        MergeError::malformed_row(self.group, self.line, self.mac, reason)
    }
}

fn skip_blanks(s: &str) -> &str {
    s.trim_start_matches([' ', '\t'])
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Split snapshot text into its two record groups.
///
/// Empty input, or input that ends inside the header, yields an empty
/// snapshot. A missing blank line after the access points simply means the
/// file has no station section.
pub fn parse_snapshot(text: &str) -> MergeResult<Snapshot> {
    let mut lines = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .enumerate()
        .map(|(idx, l)| (idx + 1, l))
        .skip(HEADER_LINES);

    let mut snapshot = Snapshot::default();

    for (line_no, line) in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
        snapshot.access_points.push(parse_ap_row(line, line_no)?);
    }

    // Station header.
    let _ = lines.next();

    for (line_no, line) in lines {
        if line.trim().is_empty() {
            break;
        }
        snapshot.stations.push(parse_station_row(line, line_no)?);
    }

    Ok(snapshot)
}

fn parse_ap_row(line: &str, line_no: usize) -> MergeResult<ApRow> {
    let mut cur = FieldCursor::new(line, RecordGroup::AccessPoints, line_no);
    let bssid = cur.field("BSSID")?;
    let first_seen = cur.field("first time seen")?;
    let last_seen = cur.field("last time seen")?;
    let channel = cur.field("channel")?;
    let speed = cur.field("speed")?;
    let privacy = cur.field("privacy")?;
    let cipher = cur.field("cipher")?;
    let authentication = cur.field("authentication")?;
    let power = cur.field("power")?;
    let beacons = cur.field("beacons")?;
    let ivs = cur.field("IV")?;
    let lan_ip = cur.field("LAN IP")?;
    let id_length = cur.field("ID-length")?;
    let (essid, key) = cur.essid_and_key()?;

    debug!(line = line_no, bssid = %bssid, "tokenized access point row");
    Ok(ApRow {
        line: line_no,
        bssid,
        first_seen,
        last_seen,
        channel,
        speed,
        privacy,
        cipher,
        authentication,
        power,
        beacons,
        ivs,
        lan_ip,
        id_length,
        essid,
        key,
    })
}

fn parse_station_row(line: &str, line_no: usize) -> MergeResult<StationRow> {
    let mut cur = FieldCursor::new(line, RecordGroup::Stations, line_no);
    let mac = cur.field("station MAC")?;
    let first_seen = cur.field("first time seen")?;
    let last_seen = cur.field("last time seen")?;
    let power = cur.field("power")?;
    let packets = cur.field("packets")?;
    let bssid = cur.field("BSSID")?;
    let probed = cur.remainder();

    debug!(line = line_no, mac = %mac, "tokenized station row");
    Ok(StationRow {
        line: line_no,
        mac,
        first_seen,
        last_seen,
        power,
        packets,
        bssid,
        probed,
    })
}

/// Read and tokenize the snapshot at `path`.
///
/// Invalid UTF-8 is replaced rather than rejected; SSIDs are arbitrary bytes.
pub fn read_snapshot(path: &Path) -> MergeResult<Snapshot> {
    let bytes = std::fs::read(path).map_err(|e| MergeError::read(path, e))?;
    parse_snapshot(&String::from_utf8_lossy(&bytes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
