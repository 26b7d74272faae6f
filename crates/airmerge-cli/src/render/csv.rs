//! Airodump-compatible CSV report.
//!
//! The merged report has the same layout as a scanner snapshot, so it can be
//! fed back in as an input on a later run.

use std::fmt::Write as _;
use std::path::PathBuf;

use airmerge_core::{AccessPoint, MergeResult, RecordSink, Station};

use super::{Destination, CRLF};

const AP_HEADER: &str = "BSSID, First time seen, Last time seen, channel, Speed, Privacy, \
Cipher, Authentication, Power, # beacons, # IV, LAN IP, ID-length, ESSID, Key";
const STATION_HEADER: &str =
    "Station MAC, First time seen, Last time seen, Power, # packets, BSSID, Probed ESSIDs";

/// Writes `<prefix>.csv`.
#[derive(Debug)]
pub struct CsvSink {
    destination: Destination,
    buf: String,
}

impl CsvSink {
    /// A sink that writes to `path` when the report finishes.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            destination: Destination::File(path.into()),
            buf: String::new(),
        }
    }

    /// The rendered text so far.
    pub fn contents(&self) -> &str {
        &self.buf
    }
}

impl RecordSink for CsvSink {
    fn begin_access_points(&mut self, _count: usize) -> MergeResult<()> {
        self.buf.push_str(CRLF);
        self.buf.push_str(AP_HEADER);
        self.buf.push_str(CRLF);
        Ok(())
    }

    fn access_point(&mut self, ap: &AccessPoint) -> MergeResult<()> {
        let h = &ap.history;
        let _ = write!(
            self.buf,
            "{}, {}, {}, {:>2}, {:>3}, {}, {}, {}, {:>3}, {:>8}, {:>8}, {:>15}, {:>3}, {}, {}{CRLF}",
            ap.bssid,
            h.first_seen,
            h.last_seen,
            ap.channel,
            ap.speed,
            ap.privacy,
            ap.cipher,
            ap.authentication,
            h.power,
            ap.beacons,
            ap.ivs,
            ap.lan_ip,
            ap.id_length,
            ap.essid,
            ap.key,
        );
        Ok(())
    }

    fn begin_stations(&mut self, _count: usize) -> MergeResult<()> {
        self.buf.push_str(CRLF);
        self.buf.push_str(STATION_HEADER);
        self.buf.push_str(CRLF);
        Ok(())
    }

    fn station(&mut self, station: &Station) -> MergeResult<()> {
        let h = &station.history;
        let _ = write!(
            self.buf,
            "{}, {}, {}, {:>3}, {:>8}, {},{}{CRLF}",
            station.mac,
            h.first_seen,
            h.last_seen,
            h.power,
            station.packets,
            station.association,
            station.probed,
        );
        Ok(())
    }

    fn finish(&mut self) -> MergeResult<()> {
        self.buf.push_str(CRLF);
        self.destination.write_all(&self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airmerge_core::{
        parse_snapshot, Association, DeviceHistory, MacAddr, ProbedEssids, Timestamp,
    };

    fn history(power: i32) -> DeviceHistory {
        let t = Timestamp::parse("2024-01-01 10:00:00").unwrap();
        let mut h = DeviceHistory::first_sighting(t, t.offset_secs(300));
        h.power = power;
        h
    }

    #[test]
    fn rendered_report_parses_as_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.csv");
        let mut sink = CsvSink::new(&path);

        let mut ap = AccessPoint::new(MacAddr::parse("AA:BB:CC:DD:EE:01").unwrap(), history(-40));
        ap.channel = "6".into();
        ap.essid = "cafe, wifi".into();
        let mut sta = Station::new(MacAddr::parse("00:11:22:33:44:55").unwrap(), history(-55));
        sta.association = Association::Bssid(ap.bssid);
        sta.probed = ProbedEssids::new("home,office");

        sink.begin_access_points(1).unwrap();
        sink.access_point(&ap).unwrap();
        sink.begin_stations(1).unwrap();
        sink.station(&sta).unwrap();
        sink.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let snap = parse_snapshot(&text).unwrap();
        assert_eq!(snap.access_points.len(), 1);
        assert_eq!(snap.access_points[0].essid, "cafe, wifi");
        assert_eq!(snap.access_points[0].power, "-40");
        assert_eq!(snap.stations.len(), 1);
        assert_eq!(snap.stations[0].bssid, "AA:BB:CC:DD:EE:01");
        assert_eq!(snap.stations[0].probed, "home,office");
    }

    #[test]
    fn nothing_is_written_before_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.csv");
        let mut sink = CsvSink::new(&path);
        sink.begin_access_points(0).unwrap();
        assert!(!path.exists());
        assert!(sink.contents().contains("BSSID, First time seen"));
    }
}
