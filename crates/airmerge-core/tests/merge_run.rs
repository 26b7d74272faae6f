//! Integration tests for full merge runs.
//!
//! Every test works in its own temporary directory: snapshots are written as
//! the scanner would write them, the run is executed end to end, and the
//! assertions look at what reached the sink and at the side-files left behind.

use std::fs;
use std::path::{Path, PathBuf};

use airmerge_core::adapter::side_files::{parse_peak_store, parse_printed_store};
use airmerge_core::{
    run, AccessPoint, MergeConfig, MergeError, MergeResult, OrphanEntry, RecordSink, Station,
    ThrottlePolicy, Timestamp,
};

const AP_HEADER: &str = "BSSID, First time seen, Last time seen, channel, Speed, Privacy, Cipher, Authentication, Power, # beacons, # IV, LAN IP, ID-length, ESSID, Key";
const STA_HEADER: &str = "Station MAC, First time seen, Last time seen, Power, # packets, BSSID, Probed ESSIDs";

/// Sink that keeps copies of everything it is handed.
#[derive(Default)]
struct Collector {
    aps: Vec<AccessPoint>,
    stations: Vec<Station>,
    orphans: Vec<OrphanEntry>,
    finished: bool,
}

impl RecordSink for Collector {
    fn access_point(&mut self, ap: &AccessPoint) -> MergeResult<()> {
        self.aps.push(ap.clone());
        Ok(())
    }

    fn station(&mut self, station: &Station) -> MergeResult<()> {
        self.stations.push(station.clone());
        Ok(())
    }

    fn orphan(&mut self, orphan: &OrphanEntry) -> MergeResult<()> {
        self.orphans.push(orphan.clone());
        Ok(())
    }

    fn finish(&mut self) -> MergeResult<()> {
        self.finished = true;
        Ok(())
    }
}

fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

fn ap_row(bssid: &str, first: &str, last: &str, power: i32, essid: &str) -> String {
    format!(
        "{bssid}, {first}, {last},  6,  54, WPA2, CCMP, PSK, {power},       10,        0,   0.  0.  0.  0, {:>3}, {essid}, ",
        essid.len()
    )
}

fn sta_row(mac: &str, first: &str, last: &str, power: i32, bssid: &str, probed: &str) -> String {
    format!("{mac}, {first}, {last}, {power},        5, {bssid},{probed}")
}

fn write_snapshot(dir: &Path, name: &str, aps: &[String], stations: &[String]) -> PathBuf {
    let mut text = format!("\r\n{AP_HEADER}\r\n");
    for row in aps {
        text.push_str(row);
        text.push_str("\r\n");
    }
    text.push_str(&format!("\r\n{STA_HEADER}\r\n"));
    for row in stations {
        text.push_str(row);
        text.push_str("\r\n");
    }
    text.push_str("\r\n");
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn config(dir: &Path, inputs: Vec<PathBuf>) -> MergeConfig {
    MergeConfig {
        inputs,
        output_prefix: Some(dir.join("survey")),
        now: Some(ts("2024-01-01 12:00:00")),
        ..MergeConfig::default()
    }
}

fn run_collect(cfg: MergeConfig) -> Collector {
    let mut sink = Collector::default();
    run(cfg, &mut [&mut sink]).unwrap();
    sink
}

#[test]
fn two_snapshots_merge_into_one_access_point() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_snapshot(
        dir.path(),
        "a.csv",
        &[ap_row("AA:BB:CC:DD:EE:01", "2024-01-01 10:00:00", "2024-01-01 10:05:00", -40, "home")],
        &[],
    );
    let b = write_snapshot(
        dir.path(),
        "b.csv",
        &[ap_row("AA:BB:CC:DD:EE:01", "2024-01-01 11:00:00", "2024-01-01 11:10:00", -70, "home")],
        &[],
    );
    let mut cfg = config(dir.path(), vec![a]);
    cfg.final_snapshot = Some(b);
    let sink = run_collect(cfg);

    assert!(sink.finished);
    assert_eq!(sink.aps.len(), 1);
    let h = &sink.aps[0].history;
    assert_eq!(h.first_seen, ts("2024-01-01 10:00:00"));
    assert_eq!(h.last_seen, ts("2024-01-01 11:10:00"));
    assert_eq!(h.power, -70);
    assert_eq!(h.old_power, -40);
    assert_eq!(h.peak.power, -40);
    assert_eq!(h.peak.time, Some(ts("2024-01-01 10:05:00")));
    assert!(h.is_old);
}

#[test]
fn peak_power_survives_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let loud = write_snapshot(
        dir.path(),
        "loud.csv",
        &[ap_row("AA:BB:CC:DD:EE:01", "2024-01-01 10:00:00", "2024-01-01 10:05:00", -30, "home")],
        &[],
    );
    run_collect(config(dir.path(), vec![loud]));

    let quiet = write_snapshot(
        dir.path(),
        "quiet.csv",
        &[ap_row("AA:BB:CC:DD:EE:01", "2024-01-01 11:00:00", "2024-01-01 11:05:00", -60, "home")],
        &[],
    );
    let sink = run_collect(config(dir.path(), vec![quiet]));

    let h = &sink.aps[0].history;
    assert_eq!(h.peak.power, -30);
    assert_eq!(h.peak.time, Some(ts("2024-01-01 10:05:00")));
    assert_eq!(h.first_seen, ts("2024-01-01 11:00:00"));

    let text = fs::read_to_string(dir.path().join("survey-appower.csv")).unwrap();
    let records = parse_peak_store(&text, "appower");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].peak.power, -30);
    assert!(text.ends_with("\r\n\r\n"));
}

#[test]
fn remerging_the_same_snapshot_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let rows = [ap_row("AA:BB:CC:DD:EE:01", "2024-01-01 10:00:00", "2024-01-01 10:05:00", -40, "home")];
    let stations = [sta_row(
        "00:11:22:33:44:55",
        "2024-01-01 10:00:00",
        "2024-01-01 10:05:00",
        -50,
        "AA:BB:CC:DD:EE:01",
        "home",
    )];
    let a = write_snapshot(dir.path(), "a.csv", &rows, &stations);

    let once = run_collect(config(dir.path(), vec![a.clone()]));
    let other = tempfile::tempdir().unwrap();
    let twice = run_collect(config(other.path(), vec![a.clone(), a]));

    assert_eq!(once.aps.len(), twice.aps.len());
    assert_eq!(once.stations.len(), twice.stations.len());
    for (a, b) in once.aps.iter().zip(&twice.aps) {
        assert_eq!(a.essid, b.essid);
        assert_eq!(a.history.first_seen, b.history.first_seen);
        assert_eq!(a.history.last_seen, b.history.last_seen);
        assert_eq!(a.history.power, b.history.power);
        assert_eq!(a.history.peak, b.history.peak);
    }
    for (a, b) in once.stations.iter().zip(&twice.stations) {
        assert_eq!(a.essid, b.essid);
        assert_eq!(a.history.first_seen, b.history.first_seen);
        assert_eq!(a.history.last_seen, b.history.last_seen);
        assert_eq!(a.history.peak, b.history.peak);
    }
    // Neither run had a final snapshot.
    assert!(!twice.aps[0].history.is_new);
    assert!(!twice.aps[0].history.is_old);
}

#[test]
fn unassociated_station_has_no_essid() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_snapshot(
        dir.path(),
        "a.csv",
        &[],
        &[sta_row(
            "00:11:22:33:44:55",
            "2024-01-01 10:00:00",
            "2024-01-01 10:05:00",
            -50,
            "(not associated) ",
            "home,office",
        )],
    );
    let sink = run_collect(config(dir.path(), vec![a]));
    assert_eq!(sink.stations.len(), 1);
    assert_eq!(sink.stations[0].essid, "");
    assert_eq!(sink.stations[0].probed.as_str(), "home,office");
}

#[test]
fn gps_position_comes_from_latest_fix_before_peak() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_snapshot(
        dir.path(),
        "a.csv",
        &[ap_row("AA:BB:CC:DD:EE:01", "2024-01-01 09:00:00", "2024-01-01 09:05:00", -40, "home")],
        &[],
    );
    let track = dir.path().join("track.gps");
    fs::write(
        &track,
        "2024-01-01 09:00:00, 1.0, 1.0\r\n2024-01-01 09:10:00, 2.0, 2.0\r\n",
    )
    .unwrap();

    let mut cfg = config(dir.path(), vec![a]);
    cfg.gps_track = Some(track);
    let sink = run_collect(cfg);

    let pos = sink.aps[0].history.position;
    assert_eq!((pos.lat, pos.lon), (1.0, 1.0));
}

#[test]
fn missing_gps_track_does_not_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_snapshot(
        dir.path(),
        "a.csv",
        &[ap_row("AA:BB:CC:DD:EE:01", "2024-01-01 09:00:00", "2024-01-01 09:05:00", -40, "home")],
        &[],
    );
    let mut cfg = config(dir.path(), vec![a]);
    cfg.gps_track = Some(dir.path().join("nowhere.gps"));
    let sink = run_collect(cfg);
    assert!(!sink.aps[0].history.position.is_fix());
}

#[test]
fn display_throttle_suppresses_then_presence_overrides() {
    let dir = tempfile::tempdir().unwrap();
    // Last displayed 20 minutes before "now" (12:00:00).
    fs::write(
        dir.path().join("survey-printed.csv"),
        "00:11:22:33:44:55, 2024-01-01 11:40:00, home\r\n\
         00:11:22:33:44:66, 2024-01-01 11:40:00, home\r\n",
    )
    .unwrap();
    let a = write_snapshot(
        dir.path(),
        "a.csv",
        &[],
        &[
            // Seen five minutes ago: throttled.
            sta_row(
                "00:11:22:33:44:55",
                "2024-01-01 11:00:00",
                "2024-01-01 11:55:00",
                -50,
                "(not associated) ",
                "",
            ),
            // Seen ten seconds ago: reported regardless.
            sta_row(
                "00:11:22:33:44:66",
                "2024-01-01 11:00:00",
                "2024-01-01 11:59:50",
                -50,
                "(not associated) ",
                "",
            ),
        ],
    );
    let mut cfg = config(dir.path(), vec![a]);
    cfg.throttle = Some(ThrottlePolicy {
        min_quiet_secs: 30 * 60,
        max_age_secs: 7 * 24 * 3600,
    });
    let sink = run_collect(cfg);

    let reported: Vec<String> = sink.stations.iter().map(|s| s.mac.to_string()).collect();
    assert_eq!(reported, ["00:11:22:33:44:66"]);

    let printed = fs::read_to_string(dir.path().join("survey-printed.csv")).unwrap();
    let records = parse_printed_store(&printed, "printed");
    assert_eq!(records.len(), 2);
    let throttled = records
        .iter()
        .find(|r| r.mac.to_string() == "00:11:22:33:44:55")
        .unwrap();
    assert_eq!(throttled.last_displayed, ts("2024-01-01 11:40:00"));
    let shown = records
        .iter()
        .find(|r| r.mac.to_string() == "00:11:22:33:44:66")
        .unwrap();
    assert_eq!(shown.last_displayed, ts("2024-01-01 12:00:00"));
}

#[test]
fn known_orphans_are_reported_and_carried_forward() {
    let dir = tempfile::tempdir().unwrap();
    let known = dir.path().join("known.txt");
    fs::write(&known, "00:00:00:00:00:0A printer\n").unwrap();
    fs::write(
        dir.path().join("survey-printed.csv"),
        "00:00:00:00:00:0A, 2024-01-01 08:00:00, office\r\n\
         00:00:00:00:00:0B, 2024-01-01 08:00:00, \r\n",
    )
    .unwrap();
    let a = write_snapshot(
        dir.path(),
        "a.csv",
        &[ap_row("AA:BB:CC:DD:EE:01", "2024-01-01 09:00:00", "2024-01-01 09:05:00", -40, "home")],
        &[],
    );
    let mut cfg = config(dir.path(), vec![a]);
    cfg.known_devices = Some(known);
    let sink = run_collect(cfg);

    assert_eq!(sink.orphans.len(), 1);
    assert_eq!(sink.orphans[0].description, "printer");

    let printed = fs::read_to_string(dir.path().join("survey-printed.csv")).unwrap();
    assert_eq!(parse_printed_store(&printed, "printed").len(), 2);
}

#[test]
fn config_error_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), Vec::new());
    cfg.inputs.clear();
    let mut sink = Collector::default();
    let err = run(cfg, &mut [&mut sink]).unwrap_err();
    assert!(matches!(err, MergeError::Config { .. }));
    assert_eq!(err.exit_code(), 1);
    assert!(!dir.path().join("survey-appower.csv").exists());
    assert!(!sink.finished);
}

#[test]
fn malformed_snapshot_aborts_before_any_side_file_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(
        &path,
        format!("\r\n{AP_HEADER}\r\nAA:BB:CC:DD:EE:01, 2024-01-01 10:00:00\r\n"),
    )
    .unwrap();
    let mut sink = Collector::default();
    let err = run(config(dir.path(), vec![path]), &mut [&mut sink]).unwrap_err();
    assert!(err.is_parse_error());
    assert!(!dir.path().join("survey-appower.csv").exists());
    assert!(!dir.path().join("survey-printed.csv").exists());
}

#[test]
fn unreadable_output_location_is_a_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_snapshot(
        dir.path(),
        "a.csv",
        &[ap_row("AA:BB:CC:DD:EE:01", "2024-01-01 09:00:00", "2024-01-01 09:05:00", -40, "home")],
        &[],
    );
    let mut cfg = config(dir.path(), vec![a]);
    cfg.output_prefix = Some(dir.path().join("missing-dir").join("survey"));
    let mut sink = Collector::default();
    let err = run(cfg, &mut [&mut sink]).unwrap_err();
    assert!(matches!(err, MergeError::Write { .. }));
    assert_eq!(err.exit_code(), 3);
}
