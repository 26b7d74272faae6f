//! Tracked devices: access points and client stations.
//!
//! Both record groups share the temporal, power, GPS and novelty state held
//! in [`DeviceHistory`]; the [`Device`] trait exposes it so that the merge
//! engine, side-file stores, GPS correlator and report filter are written
//! once for both groups.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::domain::mac::MacAddr;
use crate::domain::timestamp::Timestamp;

/// Power readings at or above this value mean "signal not detected".
pub const NO_SIGNAL_CEILING: i32 = -1;

/// Peak power of a device that has not produced a usable reading yet.
pub const PEAK_POWER_FLOOR: i32 = -100;

/// Maximum number of bytes kept from a station's probed-ESSID list.
pub const PROBED_ESSIDS_CAP: usize = 253;

/// Returns `true` when `power` is an in-range signal reading.
pub fn is_detected(power: i32) -> bool {
    power < NO_SIGNAL_CEILING
}

// ---------------------------------------------------------------------------
// RecordGroup
// ---------------------------------------------------------------------------

/// The two record groups of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RecordGroup {
    /// Access points (BSSIDs).
    AccessPoints,
    /// Client stations.
    Stations,
}

impl fmt::Display for RecordGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessPoints => write!(f, "access point"),
            Self::Stations => write!(f, "station"),
        }
    }
}

// ---------------------------------------------------------------------------
// GeoPoint
// ---------------------------------------------------------------------------

/// A latitude/longitude pair. `(0, 0)` means "no fix".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

impl GeoPoint {
    /// The "no fix" sentinel.
    pub const NONE: GeoPoint = GeoPoint { lat: 0.0, lon: 0.0 };

    /// Whether this point is a real fix rather than the zero sentinel.
    pub fn is_fix(&self) -> bool {
        self.lat != 0.0 || self.lon != 0.0
    }
}

// ---------------------------------------------------------------------------
// Identity / PeakPower
// ---------------------------------------------------------------------------

/// Strings resolved from the vendor and known-device databases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Identity {
    /// Vendor name from the OUI database.
    pub vendor: String,
    /// User description from the known-devices database.
    pub description: String,
    /// Address from the known-IPs database.
    pub ip: String,
}

impl Identity {
    /// A device is "known" when the user database describes it.
    pub fn is_known(&self) -> bool {
        !self.description.is_empty()
    }
}

/// The strongest reading ever observed for a device and when it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakPower {
    /// Peak power in dBm.
    pub power: i32,
    /// Time of the peak reading.
    pub time: Option<Timestamp>,
}

impl Default for PeakPower {
    fn default() -> Self {
        Self {
            power: PEAK_POWER_FLOOR,
            time: None,
        }
    }
}

impl PeakPower {
    /// Record a live reading. Out-of-range readings never move the peak.
    ///
    /// Returns `true` when the peak changed.
    pub fn observe(&mut self, power: i32, at: Timestamp) -> bool {
        if power > self.power && is_detected(power) {
            self.power = power;
            self.time = Some(at);
            true
        } else {
            false
        }
    }

    /// Fold in a persisted peak, keeping whichever is stronger. Like live
    /// readings, an out-of-range persisted value never moves the peak.
    ///
    /// Returns `true` when the persisted value won.
    pub fn absorb(&mut self, persisted: PeakPower) -> bool {
        if persisted.power > self.power && is_detected(persisted.power) {
            *self = persisted;
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceHistory
// ---------------------------------------------------------------------------

/// Temporal, power, GPS and novelty state shared by both record groups.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceHistory {
    /// When the device was first seen. Never regresses once set.
    pub first_seen: Timestamp,
    /// When the device was last seen, from the latest snapshot processed.
    pub last_seen: Timestamp,
    /// Last-seen time as of the last non-final snapshot.
    pub prev_last_seen: Option<Timestamp>,
    /// When the device was last written to a report.
    pub last_displayed: Option<Timestamp>,
    /// Current power in dBm.
    pub power: i32,
    /// Power before the final snapshot, or 0.
    pub old_power: i32,
    /// Strongest reading and its time.
    pub peak: PeakPower,
    /// GPS position at the peak time.
    pub position: GeoPoint,
    /// Snapshot file the latest sighting came from.
    pub source: String,
    /// First appeared in the final snapshot.
    pub is_new: bool,
    /// Existed before the final snapshot and was seen again in it.
    pub is_old: bool,
    /// Resolved vendor, description and IP.
    pub identity: Identity,
}

impl DeviceHistory {
    /// History for a device that has just been sighted for the first time.
    pub fn first_sighting(first_seen: Timestamp, last_seen: Timestamp) -> Self {
        Self {
            first_seen,
            last_seen,
            prev_last_seen: None,
            last_displayed: None,
            power: 0,
            old_power: 0,
            peak: PeakPower::default(),
            position: GeoPoint::NONE,
            source: String::new(),
            is_new: false,
            is_old: false,
            identity: Identity::default(),
        }
    }

    /// Change of power since the previous snapshot.
    pub fn power_delta(&self) -> i32 {
        self.power - self.old_power
    }
}

/// Common view over access points and stations.
pub trait Device {
    /// Which record group this device type belongs to.
    const GROUP: RecordGroup;

    /// The device identity.
    fn mac(&self) -> MacAddr;

    /// Shared state.
    fn history(&self) -> &DeviceHistory;

    /// Shared state, mutably.
    fn history_mut(&mut self) -> &mut DeviceHistory;
}

// ---------------------------------------------------------------------------
// AccessPoint -- Entity
// ---------------------------------------------------------------------------

/// An access point merged across snapshots.
///
/// Free-text columns are kept exactly as the scanner wrote them (leading
/// whitespace trimmed) so the merged CSV can be fed back in as a snapshot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AccessPoint {
    /// BSSID.
    pub bssid: MacAddr,
    /// Channel column.
    pub channel: String,
    /// Link speed column.
    pub speed: String,
    /// Privacy column (e.g. `WPA2`).
    pub privacy: String,
    /// Cipher column.
    pub cipher: String,
    /// Authentication column.
    pub authentication: String,
    /// Beacon count column.
    pub beacons: String,
    /// IV count column.
    pub ivs: String,
    /// LAN IP column.
    pub lan_ip: String,
    /// SSID length column.
    pub id_length: String,
    /// SSID; may contain commas.
    pub essid: String,
    /// Key column.
    pub key: String,
    /// Shared state.
    pub history: DeviceHistory,
}

impl AccessPoint {
    /// An access point with empty columns.
    pub fn new(bssid: MacAddr, history: DeviceHistory) -> Self {
        Self {
            bssid,
            channel: String::new(),
            speed: String::new(),
            privacy: String::new(),
            cipher: String::new(),
            authentication: String::new(),
            beacons: String::new(),
            ivs: String::new(),
            lan_ip: String::new(),
            id_length: String::new(),
            essid: String::new(),
            key: String::new(),
            history,
        }
    }
}

impl Device for AccessPoint {
    const GROUP: RecordGroup = RecordGroup::AccessPoints;

    fn mac(&self) -> MacAddr {
        self.bssid
    }

    fn history(&self) -> &DeviceHistory {
        &self.history
    }

    fn history_mut(&mut self) -> &mut DeviceHistory {
        &mut self.history
    }
}

// ---------------------------------------------------------------------------
// Station -- Entity
// ---------------------------------------------------------------------------

/// What a station reports as its associated access point.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Association {
    /// The `(not associated)` sentinel.
    Unassociated,
    /// Associated with this BSSID.
    Bssid(MacAddr),
    /// Anything else the scanner wrote; never looked up.
    Unparsed(String),
}

impl Association {
    /// How the scanner spells "no association".
    pub const UNASSOCIATED_TEXT: &'static str = "(not associated)";

    /// Interpret the BSSID column of a station row.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed == Self::UNASSOCIATED_TEXT {
            Self::Unassociated
        } else {
            match MacAddr::parse(trimmed) {
                Ok(mac) => Self::Bssid(mac),
                Err(_) => Self::Unparsed(trimmed.to_owned()),
            }
        }
    }

    /// The BSSID to look up, if any.
    pub fn bssid(&self) -> Option<MacAddr> {
        match self {
            Self::Bssid(mac) => Some(*mac),
            _ => None,
        }
    }
}

impl fmt::Display for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unassociated => f.write_str(Self::UNASSOCIATED_TEXT),
            Self::Bssid(mac) => write!(f, "{mac}"),
            Self::Unparsed(text) => f.write_str(text),
        }
    }
}

/// The free-text probed-ESSID list, capped at [`PROBED_ESSIDS_CAP`] bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProbedEssids(String);

impl ProbedEssids {
    /// Keep at most [`PROBED_ESSIDS_CAP`] bytes of `text`, cut on a char boundary.
    pub fn new(text: &str) -> Self {
        if text.len() <= PROBED_ESSIDS_CAP {
            return Self(text.to_owned());
        }
        let mut end = PROBED_ESSIDS_CAP;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        Self(text[..end].to_owned())
    }

    /// The stored text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ProbedEssids {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A client station merged across snapshots.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Station {
    /// Station MAC.
    pub mac: MacAddr,
    /// Packet count column.
    pub packets: String,
    /// Associated BSSID column.
    pub association: Association,
    /// ESSID of the associated access point, cached at merge time.
    pub essid: String,
    /// Probed ESSIDs.
    pub probed: ProbedEssids,
    /// Shared state.
    pub history: DeviceHistory,
}

impl Station {
    /// An unassociated station with empty columns.
    pub fn new(mac: MacAddr, history: DeviceHistory) -> Self {
        Self {
            mac,
            packets: String::new(),
            association: Association::Unassociated,
            essid: String::new(),
            probed: ProbedEssids::default(),
            history,
        }
    }
}

impl Device for Station {
    const GROUP: RecordGroup = RecordGroup::Stations;

    fn mac(&self) -> MacAddr {
        self.mac
    }

    fn history(&self) -> &DeviceHistory {
        &self.history
    }

    fn history_mut(&mut self) -> &mut DeviceHistory {
        &mut self.history
    }
}

// ---------------------------------------------------------------------------
// OrphanEntry
// ---------------------------------------------------------------------------

/// A printed-store row whose MAC matched no station in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrphanEntry {
    /// Station MAC.
    pub mac: MacAddr,
    /// When it was last reported.
    pub last_displayed: Timestamp,
    /// SSID cached when it was last reported.
    pub essid: String,
    /// Description from the known-devices list, empty when unknown.
    pub description: String,
}

impl OrphanEntry {
    /// Whether the orphan is a known device.
    pub fn is_known(&self) -> bool {
        !self.description.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn peak_ignores_undetected_readings() {
        let mut peak = PeakPower::default();
        assert!(!peak.observe(-1, ts("2024-01-01 10:00:00")));
        assert!(!peak.observe(0, ts("2024-01-01 10:00:00")));
        assert!(!peak.observe(5, ts("2024-01-01 10:00:00")));
        assert_eq!(peak.power, PEAK_POWER_FLOOR);
        assert!(peak.time.is_none());

        assert!(peak.observe(-2, ts("2024-01-01 10:01:00")));
        assert_eq!(peak.power, -2);
    }

    #[test]
    fn peak_never_decreases() {
        let mut peak = PeakPower::default();
        peak.observe(-40, ts("2024-01-01 10:00:00"));
        assert!(!peak.observe(-60, ts("2024-01-01 10:05:00")));
        assert_eq!(peak.power, -40);
        assert_eq!(peak.time, Some(ts("2024-01-01 10:00:00")));
    }

    #[test]
    fn absorb_prefers_strictly_stronger_persisted_peak() {
        let mut peak = PeakPower {
            power: -50,
            time: Some(ts("2024-01-02 10:00:00")),
        };
        let weaker = PeakPower {
            power: -50,
            time: Some(ts("2023-12-31 09:00:00")),
        };
        assert!(!peak.absorb(weaker));
        assert_eq!(peak.time, Some(ts("2024-01-02 10:00:00")));

        let stronger = PeakPower {
            power: -20,
            time: Some(ts("2023-12-31 09:00:00")),
        };
        assert!(peak.absorb(stronger));
        assert_eq!(peak, stronger);
    }

    #[test]
    fn absorb_ignores_undetected_persisted_peak() {
        let live = PeakPower {
            power: -50,
            time: Some(ts("2024-01-02 10:00:00")),
        };
        let mut peak = live;
        for power in [0, NO_SIGNAL_CEILING] {
            let persisted = PeakPower {
                power,
                time: Some(ts("2023-12-31 09:00:00")),
            };
            assert!(!peak.absorb(persisted));
            assert_eq!(peak, live);
        }
    }

    #[test]
    fn association_parse() {
        assert_eq!(
            Association::parse("(not associated) "),
            Association::Unassociated
        );
        let mac = MacAddr::parse("AA:BB:CC:DD:EE:01").unwrap();
        assert_eq!(Association::parse("aa:bb:cc:dd:ee:01"), Association::Bssid(mac));
        assert_eq!(
            Association::parse("garbage"),
            Association::Unparsed("garbage".into())
        );
        assert_eq!(Association::Unassociated.bssid(), None);
        assert_eq!(Association::Unassociated.to_string(), "(not associated)");
    }

    #[test]
    fn probed_essids_are_capped_on_char_boundary() {
        let short = ProbedEssids::new("home,office");
        assert_eq!(short.as_str(), "home,office");

        let long = "x".repeat(400);
        assert_eq!(ProbedEssids::new(&long).as_str().len(), PROBED_ESSIDS_CAP);

        // 252 ASCII bytes then a 3-byte char straddling the cap.
        let tricky = format!("{}€tail", "a".repeat(252));
        let capped = ProbedEssids::new(&tricky);
        assert_eq!(capped.as_str(), "a".repeat(252));
    }

    #[test]
    fn geo_point_sentinel() {
        assert!(!GeoPoint::NONE.is_fix());
        assert!(GeoPoint { lat: 0.0, lon: 12.5 }.is_fix());
    }
}
