//! Reader for GPS track files (`YYYY-MM-DD HH:MM:SS, lat, lon` per line).

use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::{info, warn};

use crate::domain::device::GeoPoint;
use crate::domain::gps::{GpsFix, GpsTrack};
use crate::domain::timestamp::Timestamp;
use crate::error::{MergeError, MergeResult};

/// Parse track text. Blank lines and unparseable lines are skipped.
///
/// Fixes are ordered by time; equal times keep file order.
pub fn parse_gps_track(text: &str, origin: &str) -> GpsTrack {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut fixes = Vec::new();
    for result in reader.records() {
        let Ok(record) = result else {
            warn!(origin, "unreadable GPS record");
            continue;
        };
        let line = record.position().map_or(0, |p| p.line());
        let parsed = (record.len() >= 3)
            .then(|| {
                let time = Timestamp::parse(&record[0]).ok()?;
                let lat = record[1].parse::<f64>().ok()?;
                let lon = record[2].parse::<f64>().ok()?;
                Some(GpsFix {
                    time,
                    point: GeoPoint { lat, lon },
                })
            })
            .flatten();
        match parsed {
            Some(fix) => fixes.push(fix),
            None => warn!(origin, line, "skipping malformed GPS line"),
        }
    }

    fixes.sort_by_key(|f| f.time);
    GpsTrack::new(fixes)
}

/// Read the GPS track at `path`.
pub fn read_gps_track(path: &Path) -> MergeResult<GpsTrack> {
    let bytes = std::fs::read(path).map_err(|e| MergeError::read(path, e))?;
    let track = parse_gps_track(&String::from_utf8_lossy(&bytes), &path.display().to_string());
    info!(path = %path.display(), fixes = track.len(), "loaded GPS track");
    Ok(track)
}
