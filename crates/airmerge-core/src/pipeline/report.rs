//! Filtering and ordering of merged devices for rendering.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::device::{
    AccessPoint, Device, DeviceHistory, OrphanEntry, Station, NO_SIGNAL_CEILING,
};
use crate::domain::mac::MacAddr;
use crate::error::{MergeError, MergeResult};
use crate::port::RecordSink;

/// Which devices to keep by novelty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Novelty {
    /// Every device.
    #[default]
    All,
    /// Only devices that first appeared in the final snapshot.
    NewOnly,
    /// Only devices seen before and again in the final snapshot.
    OldOnly,
}

/// Report ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortKey {
    /// Strongest current power first.
    #[default]
    Power,
    /// Ascending MAC.
    Mac,
    /// Earliest first-seen first.
    FirstSeen,
    /// Most recent last-seen first.
    LastSeen,
}

impl FromStr for SortKey {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "power" => Ok(Self::Power),
            "mac" => Ok(Self::Mac),
            "first-seen" | "first_seen" => Ok(Self::FirstSeen),
            "last-seen" | "last_seen" => Ok(Self::LastSeen),
            other => Err(MergeError::config(format!("unknown sort key '{other}'"))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Power => "power",
            Self::Mac => "mac",
            Self::FirstSeen => "first-seen",
            Self::LastSeen => "last-seen",
        })
    }
}

/// Device selection rules.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReportFilter {
    /// Weakest power kept (inclusive).
    pub min_power: i32,
    /// Strongest power kept (inclusive).
    pub max_power: i32,
    /// Novelty selection.
    pub novelty: Novelty,
    /// Keep only devices with a known-device description.
    pub known_only: bool,
    /// Keep only devices whose power rose by more than this since the
    /// previous snapshot.
    pub min_delta: Option<i32>,
    /// Include access points.
    pub access_points: bool,
    /// Include stations.
    pub stations: bool,
    /// Ordering.
    pub sort: SortKey,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            min_power: -100,
            max_power: 0,
            novelty: Novelty::All,
            known_only: false,
            min_delta: None,
            access_points: true,
            stations: true,
            sort: SortKey::Power,
        }
    }
}

impl ReportFilter {
    /// Whether a device with this history passes every rule.
    pub fn accepts(&self, h: &DeviceHistory) -> bool {
        if h.power < self.min_power || h.power > self.max_power {
            return false;
        }
        match self.novelty {
            Novelty::All => {}
            Novelty::NewOnly if !h.is_new => return false,
            Novelty::OldOnly if !h.is_old => return false,
            _ => {}
        }
        if self.known_only && !h.identity.is_known() {
            return false;
        }
        if let Some(delta) = self.min_delta {
            if h.old_power >= NO_SIGNAL_CEILING || h.power_delta() <= delta {
                return false;
            }
        }
        true
    }
}

fn compare<D: Device>(key: SortKey, a: &D, b: &D) -> Ordering {
    let (ha, hb) = (a.history(), b.history());
    match key {
        SortKey::Power => hb.power.cmp(&ha.power),
        SortKey::Mac => a.mac().cmp(&b.mac()),
        SortKey::FirstSeen => ha.first_seen.cmp(&hb.first_seen),
        SortKey::LastSeen => hb.last_seen.cmp(&ha.last_seen),
    }
}

fn select<'a, D: Device>(
    devices: impl IntoIterator<Item = &'a D>,
    filter: &ReportFilter,
    suppressed: &HashSet<MacAddr>,
) -> Vec<&'a D>
where
    D: 'a,
{
    let mut kept: Vec<&D> = devices
        .into_iter()
        .filter(|d| filter.accepts(d.history()) && !suppressed.contains(&d.mac()))
        .collect();
    kept.sort_by(|a, b| compare(filter.sort, *a, *b));
    kept
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Filtered, ordered view over the merged devices.
#[derive(Debug, Clone, Default)]
pub struct Report<'a> {
    /// Access points to render.
    pub access_points: Vec<&'a AccessPoint>,
    /// Stations to render.
    pub stations: Vec<&'a Station>,
    /// Known devices from earlier runs that were not seen in this one.
    pub orphans: Vec<&'a OrphanEntry>,
}

impl<'a> Report<'a> {
    /// Build a report.
    ///
    /// `suppressed` holds stations the display throttle held back.
    pub fn build(
        access_points: impl IntoIterator<Item = &'a AccessPoint>,
        stations: impl IntoIterator<Item = &'a Station>,
        orphans: impl IntoIterator<Item = &'a OrphanEntry>,
        filter: &ReportFilter,
        suppressed: &HashSet<MacAddr>,
    ) -> Self {
        let none = HashSet::new();
        Self {
            access_points: if filter.access_points {
                select(access_points, filter, &none)
            } else {
                Vec::new()
            },
            stations: if filter.stations {
                select(stations, filter, suppressed)
            } else {
                Vec::new()
            },
            orphans: if filter.stations {
                orphans.into_iter().filter(|o| o.is_known()).collect()
            } else {
                Vec::new()
            },
        }
    }

    /// Drive `sink` through the report.
    pub fn render(&self, sink: &mut dyn RecordSink) -> MergeResult<()> {
        sink.begin_access_points(self.access_points.len())?;
        for ap in &self.access_points {
            sink.access_point(ap)?;
        }
        sink.begin_stations(self.stations.len())?;
        for station in &self.stations {
            sink.station(station)?;
        }
        for orphan in &self.orphans {
            sink.orphan(orphan)?;
        }
        sink.finish()
    }

    /// MACs of the stations in the report.
    pub fn station_macs(&self) -> Vec<MacAddr> {
        self.stations.iter().map(|s| s.mac).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timestamp::Timestamp;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn ap(mac: &str, power: i32) -> AccessPoint {
        let t = ts("2024-01-01 10:00:00");
        let mut h = DeviceHistory::first_sighting(t, t);
        h.power = power;
        AccessPoint::new(MacAddr::parse(mac).unwrap(), h)
    }

    fn station(mac: &str, power: i32) -> Station {
        let t = ts("2024-01-01 10:00:00");
        let mut h = DeviceHistory::first_sighting(t, t);
        h.power = power;
        Station::new(MacAddr::parse(mac).unwrap(), h)
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl RecordSink for Recorder {
        fn begin_access_points(&mut self, count: usize) -> MergeResult<()> {
            self.events.push(format!("aps:{count}"));
            Ok(())
        }
        fn access_point(&mut self, ap: &AccessPoint) -> MergeResult<()> {
            self.events.push(ap.bssid.to_string());
            Ok(())
        }
        fn begin_stations(&mut self, count: usize) -> MergeResult<()> {
            self.events.push(format!("stations:{count}"));
            Ok(())
        }
        fn station(&mut self, station: &Station) -> MergeResult<()> {
            self.events.push(station.mac.to_string());
            Ok(())
        }
        fn orphan(&mut self, orphan: &OrphanEntry) -> MergeResult<()> {
            self.events.push(format!("orphan:{}", orphan.mac));
            Ok(())
        }
        fn finish(&mut self) -> MergeResult<()> {
            self.events.push("finish".into());
            Ok(())
        }
    }

    #[test]
    fn power_bounds_are_inclusive() {
        let filter = ReportFilter {
            min_power: -70,
            max_power: -40,
            ..ReportFilter::default()
        };
        let aps = [
            ap("00:00:00:00:00:01", -70),
            ap("00:00:00:00:00:02", -40),
            ap("00:00:00:00:00:03", -71),
            ap("00:00:00:00:00:04", -39),
        ];
        let report = Report::build(aps.iter(), [], [], &filter, &HashSet::new());
        assert_eq!(report.access_points.len(), 2);
    }

    #[test]
    fn power_sort_is_descending_and_stable() {
        let aps = [
            ap("00:00:00:00:00:01", -60),
            ap("00:00:00:00:00:02", -40),
            ap("00:00:00:00:00:03", -60),
        ];
        let report = Report::build(aps.iter(), [], [], &ReportFilter::default(), &HashSet::new());
        let order: Vec<String> = report.access_points.iter().map(|a| a.bssid.to_string()).collect();
        assert_eq!(order, ["00:00:00:00:00:02", "00:00:00:00:00:01", "00:00:00:00:00:03"]);
    }

    #[test]
    fn mac_sort() {
        let aps = [ap("00:00:00:00:00:02", -60), ap("00:00:00:00:00:01", -40)];
        let filter = ReportFilter {
            sort: SortKey::Mac,
            ..ReportFilter::default()
        };
        let report = Report::build(aps.iter(), [], [], &filter, &HashSet::new());
        assert_eq!(report.access_points[0].bssid.to_string(), "00:00:00:00:00:01");
    }

    #[test]
    fn novelty_and_known_filters() {
        let mut fresh = ap("00:00:00:00:00:01", -50);
        fresh.history.is_new = true;
        let mut seen = ap("00:00:00:00:00:02", -50);
        seen.history.is_old = true;
        seen.history.identity.description = "router".into();
        let aps = [fresh, seen];

        let new_only = ReportFilter {
            novelty: Novelty::NewOnly,
            ..ReportFilter::default()
        };
        let r = Report::build(aps.iter(), [], [], &new_only, &HashSet::new());
        assert_eq!(r.access_points.len(), 1);
        assert!(r.access_points[0].history.is_new);

        let known = ReportFilter {
            known_only: true,
            ..ReportFilter::default()
        };
        let r = Report::build(aps.iter(), [], [], &known, &HashSet::new());
        assert_eq!(r.access_points.len(), 1);
        assert_eq!(r.access_points[0].history.identity.description, "router");
    }

    #[test]
    fn delta_filter_requires_a_previous_reading() {
        let filter = ReportFilter {
            min_delta: Some(10),
            ..ReportFilter::default()
        };
        let mut rising = ap("00:00:00:00:00:01", -40);
        rising.history.old_power = -60;
        let mut steady = ap("00:00:00:00:00:02", -55);
        steady.history.old_power = -60;
        let unknown_before = ap("00:00:00:00:00:03", -40);
        assert!(filter.accepts(&rising.history));
        assert!(!filter.accepts(&steady.history));
        assert!(!filter.accepts(&unknown_before.history));
    }

    #[test]
    fn suppressed_stations_and_group_selection() {
        let stations = [station("00:00:00:00:00:01", -50), station("00:00:00:00:00:02", -50)];
        let suppressed: HashSet<MacAddr> = [stations[0].mac].into_iter().collect();
        let r = Report::build([], stations.iter(), [], &ReportFilter::default(), &suppressed);
        assert_eq!(r.station_macs(), vec![stations[1].mac]);

        let aps_only = ReportFilter {
            stations: false,
            ..ReportFilter::default()
        };
        let r = Report::build([], stations.iter(), [], &aps_only, &HashSet::new());
        assert!(r.stations.is_empty());
    }

    #[test]
    fn render_drives_sink_in_order() {
        let aps = [ap("00:00:00:00:00:01", -40)];
        let stations = [station("00:00:00:00:00:02", -50)];
        let orphans = [
            OrphanEntry {
                mac: MacAddr::parse("00:00:00:00:00:03").unwrap(),
                last_displayed: ts("2024-01-01 09:00:00"),
                essid: String::new(),
                description: "printer".into(),
            },
            OrphanEntry {
                mac: MacAddr::parse("00:00:00:00:00:04").unwrap(),
                last_displayed: ts("2024-01-01 09:00:00"),
                essid: String::new(),
                description: String::new(),
            },
        ];
        let report = Report::build(
            aps.iter(),
            stations.iter(),
            orphans.iter(),
            &ReportFilter::default(),
            &HashSet::new(),
        );
        let mut sink = Recorder::default();
        report.render(&mut sink).unwrap();
        assert_eq!(
            sink.events,
            [
                "aps:1",
                "00:00:00:00:00:01",
                "stations:1",
                "00:00:00:00:00:02",
                "orphan:00:00:00:00:00:03",
                "finish"
            ]
        );
    }

    #[test]
    fn sort_key_parsing() {
        assert_eq!("power".parse::<SortKey>().unwrap(), SortKey::Power);
        assert_eq!("first-seen".parse::<SortKey>().unwrap(), SortKey::FirstSeen);
        assert!("loudness".parse::<SortKey>().is_err());
    }
}
