//! Run orchestrator (Domain Service).
//!
//! [`MergeRun`] wires the stages of one invocation together:
//!
//! 1. validate the configuration (nothing is written on failure)
//! 2. load the vendor and known-device tables
//! 3. merge every snapshot in order, the final snapshot last
//! 4. fold in the persisted peak stores
//! 5. correlate the GPS track
//! 6. apply the printed store and the display throttle
//! 7. filter, sort and hand the report to the sinks
//! 8. rewrite the peak and printed stores

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::adapter::{gps_track, side_files, snapshot, vendor_db};
use crate::config::{MergeConfig, SideFiles};
use crate::domain::device::OrphanEntry;
use crate::domain::mac::MacAddr;
use crate::domain::timestamp::Timestamp;
use crate::domain::vendor::Directory;
use crate::error::{MergeError, MergeResult};
use crate::port::RecordSink;

use super::history::{apply_printed, fold_peaks, printed_records};
use super::merge::{MergeEngine, MergeStats, SnapshotRole};
use super::report::Report;

/// What a run did, for the caller's status line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Counters summed over every snapshot.
    pub merge: MergeStats,
    /// Snapshots merged.
    pub snapshots: usize,
    /// Distinct access points tracked.
    pub access_points: usize,
    /// Distinct stations tracked.
    pub stations: usize,
    /// Access points handed to the sinks.
    pub reported_access_points: usize,
    /// Stations handed to the sinks.
    pub reported_stations: usize,
    /// Stations held back by the display throttle.
    pub suppressed_stations: usize,
    /// Printed-store rows kept for devices absent from this run.
    pub orphans: usize,
    /// Devices whose peak came from a persisted store.
    pub persisted_peaks: usize,
    /// Devices placed on the GPS track, when a track was given.
    pub gps_placed: Option<usize>,
    /// Legacy hash collisions across both indexes.
    pub legacy_collisions: usize,
}

/// Load every configured lookup table.
///
/// A configured file that cannot be read is fatal. The default OUI database
/// is optional.
pub fn load_directory(config: &MergeConfig) -> MergeResult<Directory> {
    let vendors = match &config.oui_db {
        Some(path) => vendor_db::load_oui_db(path).map_err(|e| match e {
            MergeError::Read { path, source } => MergeError::config(format!(
                "cannot read OUI database {}: {source}",
                path.display()
            )),
            other => other,
        })?,
        None => match vendor_db::find_default_oui_db() {
            Some(path) => vendor_db::load_oui_db(&path)?,
            None => {
                debug!("no OUI database installed; vendors stay empty");
                Default::default()
            }
        },
    };
    let known_devices = match &config.known_devices {
        Some(path) => vendor_db::load_known_db(path)?,
        None => Default::default(),
    };
    let known_ips = match &config.known_ips {
        Some(path) => vendor_db::load_known_db(path)?,
        None => Default::default(),
    };
    Ok(Directory {
        vendors,
        known_devices,
        known_ips,
    })
}

/// One invocation of the merge pipeline.
pub struct MergeRun {
    config: MergeConfig,
    side: SideFiles,
    directory: Directory,
    engine: MergeEngine,
    now: Timestamp,
    orphans: Vec<OrphanEntry>,
    suppressed: HashSet<MacAddr>,
    summary: RunSummary,
}

impl MergeRun {
    /// Validate `config` and load the lookup tables.
    pub fn with_config(config: MergeConfig) -> MergeResult<Self> {
        config.validate()?;
        let side = config
            .side_files()
            .ok_or_else(|| MergeError::config("an output prefix is required"))?;
        let directory = load_directory(&config)?;
        let now = config.now();
        Ok(Self {
            config,
            side,
            directory,
            engine: MergeEngine::new(),
            now,
            orphans: Vec::new(),
            suppressed: HashSet::new(),
            summary: RunSummary::default(),
        })
    }

    /// The run's configuration.
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// The merged indexes.
    pub fn engine(&self) -> &MergeEngine {
        &self.engine
    }

    /// The clock used for throttling.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Run every stage, rendering the report into each of `sinks`.
    pub fn execute(mut self, sinks: &mut [&mut dyn RecordSink]) -> MergeResult<RunSummary> {
        self.merge_all()?;
        self.fold_peak_stores()?;
        self.correlate_gps();
        self.apply_throttle()?;
        self.render(sinks)?;
        self.persist()?;

        let ap_stats = self.engine.access_points.stats();
        let sta_stats = self.engine.stations.stats();
        self.summary.access_points = ap_stats.records;
        self.summary.stations = sta_stats.records;
        self.summary.legacy_collisions = ap_stats.legacy_collisions + sta_stats.legacy_collisions;
        self.summary.orphans = self.orphans.len();
        info!(
            access_points = self.summary.access_points,
            stations = self.summary.stations,
            legacy_collisions = self.summary.legacy_collisions,
            "run complete"
        );
        Ok(self.summary)
    }

    fn merge_file(&mut self, path: &Path, role: SnapshotRole) -> MergeResult<()> {
        let snap = snapshot::read_snapshot(path)?;
        let source = path.display().to_string();
        let stats = self
            .engine
            .merge_snapshot(&snap, &source, role, &self.directory)?;
        info!(file = %source, final_snapshot = role.is_final(), %stats, "merged snapshot");
        self.summary.merge.accumulate(stats);
        self.summary.snapshots += 1;
        Ok(())
    }

    fn merge_all(&mut self) -> MergeResult<()> {
        let inputs = self.config.inputs.clone();
        for path in &inputs {
            self.merge_file(path, SnapshotRole::Merge)?;
        }
        if let Some(path) = self.config.final_snapshot.clone() {
            self.merge_file(&path, SnapshotRole::Final)?;
        }
        Ok(())
    }

    fn fold_peak_stores(&mut self) -> MergeResult<()> {
        let ap_records = side_files::read_peak_store(&self.side.ap_power)?;
        let sta_records = side_files::read_peak_store(&self.side.station_power)?;
        let raised = fold_peaks(&mut self.engine.access_points, &ap_records)
            + fold_peaks(&mut self.engine.stations, &sta_records);
        debug!(
            ap_rows = ap_records.len(),
            station_rows = sta_records.len(),
            raised,
            "folded peak stores"
        );
        self.summary.persisted_peaks = raised;
        Ok(())
    }

    /// GPS problems never fail the run.
    fn correlate_gps(&mut self) {
        let Some(path) = self.config.gps_track.as_deref() else {
            return;
        };
        let track = match gps_track::read_gps_track(path) {
            Ok(track) => track,
            Err(e) => {
                warn!(error = %e, "GPS track unavailable; positions stay empty");
                return;
            }
        };
        let placed = track
            .correlate(self.engine.access_points.iter_mut())
            .and_then(|aps| {
                track
                    .correlate(self.engine.stations.iter_mut())
                    .map(|stations| aps + stations)
            });
        match placed {
            Ok(n) => {
                info!(placed = n, fixes = track.len(), "correlated GPS track");
                self.summary.gps_placed = Some(n);
            }
            Err(e) => warn!(error = %e, "GPS correlation stopped"),
        }
    }

    fn apply_throttle(&mut self) -> MergeResult<()> {
        let records = side_files::read_printed_store(&self.side.printed)?;
        let outcome = apply_printed(
            &mut self.engine.stations,
            records,
            &self.directory.known_devices,
            self.config.throttle.as_ref(),
            self.now,
        );
        self.summary.suppressed_stations = outcome.suppressed.len();
        self.suppressed = outcome.suppressed;
        self.orphans = outcome.orphans;
        Ok(())
    }

    fn render(&mut self, sinks: &mut [&mut dyn RecordSink]) -> MergeResult<()> {
        let rendered = {
            let report = Report::build(
                self.engine.access_points.iter(),
                self.engine.stations.iter(),
                self.orphans.iter(),
                &self.config.filter,
                &self.suppressed,
            );
            for sink in sinks.iter_mut() {
                report.render(&mut **sink)?;
            }
            self.summary.reported_access_points = report.access_points.len();
            self.summary.reported_stations = report.stations.len();
            report.station_macs()
        };

        for mac in rendered {
            if let Some(station) = self.engine.stations.get_mut(&mac) {
                station.history.last_displayed = Some(self.now);
            }
        }
        Ok(())
    }

    fn persist(&self) -> MergeResult<()> {
        side_files::write_side_file(
            &self.side.ap_power,
            &side_files::render_peak_store(self.engine.access_points.iter()),
        )?;
        side_files::write_side_file(
            &self.side.station_power,
            &side_files::render_peak_store(self.engine.stations.iter()),
        )?;
        let printed = printed_records(&self.engine.stations, &self.orphans);
        side_files::write_side_file(&self.side.printed, &side_files::render_printed_store(&printed))?;
        info!(printed = printed.len(), "side-files updated");
        Ok(())
    }
}

/// Validate, merge, report and persist in one call.
pub fn run(config: MergeConfig, sinks: &mut [&mut dyn RecordSink]) -> MergeResult<RunSummary> {
    MergeRun::with_config(config)?.execute(sinks)
}
