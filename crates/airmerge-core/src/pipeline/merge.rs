//! Merge engine: folds tokenized snapshots into the per-device indexes.
//!
//! Each device moves through a small state machine:
//!
//! ```text
//! ABSENT --first sighting--> TRACKED(new = final)
//! TRACKED --later sighting--> TRACKED(new = false, old = final)
//! ```
//!
//! where `final` is whether the snapshot being merged is the designated
//! final snapshot of the run.

use std::fmt;

use tracing::debug;

use crate::adapter::snapshot::{ApRow, Snapshot, StationRow};
use crate::domain::device::{
    AccessPoint, Association, DeviceHistory, Identity, ProbedEssids, RecordGroup, Station,
};
use crate::domain::index::DeviceIndex;
use crate::domain::mac::MacAddr;
use crate::domain::timestamp::Timestamp;
use crate::domain::vendor::Directory;
use crate::error::{MergeError, MergeResult};

/// How a snapshot takes part in the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotRole {
    /// An ordinary snapshot.
    Merge,
    /// The final snapshot; drives the new/old flags and the power delta.
    Final,
}

impl SnapshotRole {
    /// Whether this is the final snapshot.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Final)
    }
}

/// Per-snapshot counters, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Access points seen for the first time.
    pub aps_added: usize,
    /// Access points already tracked.
    pub aps_updated: usize,
    /// Stations seen for the first time.
    pub stations_added: usize,
    /// Stations already tracked.
    pub stations_updated: usize,
}

impl MergeStats {
    /// Add another snapshot's counters.
    pub fn accumulate(&mut self, other: MergeStats) {
        self.aps_added += other.aps_added;
        self.aps_updated += other.aps_updated;
        self.stations_added += other.stations_added;
        self.stations_updated += other.stations_updated;
    }
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} APs added, {} updated; {} stations added, {} updated",
            self.aps_added, self.aps_updated, self.stations_added, self.stations_updated
        )
    }
}

/// The fields of a row that feed [`DeviceHistory`].
struct Sighting<'a> {
    first_seen: Timestamp,
    last_seen: Timestamp,
    power: i32,
    source: &'a str,
    identity: Identity,
}

// ---------------------------------------------------------------------------
// MergeEngine
// ---------------------------------------------------------------------------

/// Access-point and station indexes built from the snapshots of one run.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    /// Access points, in first-sighting order.
    pub access_points: DeviceIndex<AccessPoint>,
    /// Stations, in first-sighting order.
    pub stations: DeviceIndex<Station>,
}

impl MergeEngine {
    /// An engine with empty indexes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one tokenized snapshot.
    ///
    /// Access points are merged before stations so that a station can pick
    /// up the ESSID of an access point from the same snapshot. The first
    /// malformed row aborts the merge with its group, line and MAC.
    pub fn merge_snapshot(
        &mut self,
        snapshot: &Snapshot,
        source: &str,
        role: SnapshotRole,
        directory: &Directory,
    ) -> MergeResult<MergeStats> {
        let mut stats = MergeStats::default();
        for row in &snapshot.access_points {
            if self.merge_ap(row, source, role, directory)? {
                stats.aps_added += 1;
            } else {
                stats.aps_updated += 1;
            }
        }
        for row in &snapshot.stations {
            if self.merge_station(row, source, role, directory)? {
                stats.stations_added += 1;
            } else {
                stats.stations_updated += 1;
            }
        }
        Ok(stats)
    }

    fn merge_ap(
        &mut self,
        row: &ApRow,
        source: &str,
        role: SnapshotRole,
        directory: &Directory,
    ) -> MergeResult<bool> {
        let group = RecordGroup::AccessPoints;
        let bssid = parse_mac(&row.bssid, group, row.line)?;
        let sighting = Sighting {
            first_seen: parse_time(&row.first_seen, "first time seen", group, row.line, &row.bssid)?,
            last_seen: parse_time(&row.last_seen, "last time seen", group, row.line, &row.bssid)?,
            power: parse_power(&row.power, group, row.line, &row.bssid)?,
            source,
            identity: identify(directory, &bssid),
        };

        let (ap, created) = self.access_points.get_or_insert_with(bssid, || {
            AccessPoint::new(
                bssid,
                DeviceHistory::first_sighting(sighting.first_seen, sighting.last_seen),
            )
        });
        ap.channel.clone_from(&row.channel);
        ap.speed.clone_from(&row.speed);
        ap.privacy.clone_from(&row.privacy);
        ap.cipher.clone_from(&row.cipher);
        ap.authentication.clone_from(&row.authentication);
        ap.beacons.clone_from(&row.beacons);
        ap.ivs.clone_from(&row.ivs);
        ap.lan_ip.clone_from(&row.lan_ip);
        ap.id_length.clone_from(&row.id_length);
        ap.essid.clone_from(&row.essid);
        ap.key.clone_from(&row.key);
        apply_sighting(&mut ap.history, !created, sighting, role);

        debug!(bssid = %bssid, created, power = ap.history.power, "merged access point");
        Ok(created)
    }

    fn merge_station(
        &mut self,
        row: &StationRow,
        source: &str,
        role: SnapshotRole,
        directory: &Directory,
    ) -> MergeResult<bool> {
        let group = RecordGroup::Stations;
        let mac = parse_mac(&row.mac, group, row.line)?;
        let sighting = Sighting {
            first_seen: parse_time(&row.first_seen, "first time seen", group, row.line, &row.mac)?,
            last_seen: parse_time(&row.last_seen, "last time seen", group, row.line, &row.mac)?,
            power: parse_power(&row.power, group, row.line, &row.mac)?,
            source,
            identity: identify(directory, &mac),
        };

        let association = Association::parse(&row.bssid);
        let essid = association
            .bssid()
            .and_then(|bssid| self.access_points.find(&bssid))
            .map(|ap| ap.essid.clone())
            .unwrap_or_default();

        let (station, created) = self.stations.get_or_insert_with(mac, || {
            Station::new(
                mac,
                DeviceHistory::first_sighting(sighting.first_seen, sighting.last_seen),
            )
        });
        station.packets.clone_from(&row.packets);
        station.association = association;
        station.essid = essid;
        station.probed = ProbedEssids::new(&row.probed);
        apply_sighting(&mut station.history, !created, sighting, role);

        debug!(mac = %mac, created, power = station.history.power, "merged station");
        Ok(created)
    }
}

/// Apply the per-field merge policy to one device's history.
fn apply_sighting(h: &mut DeviceHistory, existed: bool, s: Sighting<'_>, role: SnapshotRole) {
    if existed {
        h.is_new = false;
        h.is_old = role.is_final();
    } else {
        h.first_seen = s.first_seen;
        h.is_new = role.is_final();
        h.is_old = false;
    }

    h.last_seen = s.last_seen;
    if !role.is_final() {
        h.prev_last_seen = Some(s.last_seen);
    }

    h.old_power = if h.is_old { h.power } else { 0 };
    h.power = s.power;
    h.peak.observe(s.power, s.last_seen);
    if h.peak.time.is_none() {
        h.peak.time = Some(s.last_seen);
    }

    h.source = s.source.to_owned();
    h.identity = s.identity;
}

fn identify(directory: &Directory, mac: &MacAddr) -> Identity {
    Identity {
        vendor: directory.vendors.resolve_vendor(mac).to_owned(),
        description: directory.known_devices.resolve_known(mac).to_owned(),
        ip: directory.known_ips.resolve_known(mac).to_owned(),
    }
}

fn parse_mac(text: &str, group: RecordGroup, line: usize) -> MergeResult<MacAddr> {
    MacAddr::parse(text)
        .map_err(|_| MergeError::malformed_row(group, line, text.trim(), "invalid MAC address"))
}

fn parse_time(
    text: &str,
    field: &str,
    group: RecordGroup,
    line: usize,
    mac: &str,
) -> MergeResult<Timestamp> {
    Timestamp::parse(text).map_err(|_| {
        MergeError::malformed_row(
            group,
            line,
            mac.trim(),
            format!("invalid {field} '{}'", text.trim()),
        )
    })
}

fn parse_power(text: &str, group: RecordGroup, line: usize, mac: &str) -> MergeResult<i32> {
    text.trim().parse::<i32>().map_err(|_| {
        MergeError::malformed_row(
            group,
            line,
            mac.trim(),
            format!("invalid power '{}'", text.trim()),
        )
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
