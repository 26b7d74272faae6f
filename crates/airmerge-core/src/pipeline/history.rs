//! Cross-run history: peak-power folding and the display throttle.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::adapter::side_files::{PeakRecord, PrintedRecord};
use crate::domain::device::{Device, OrphanEntry, Station};
use crate::domain::index::DeviceIndex;
use crate::domain::mac::MacAddr;
use crate::domain::timestamp::Timestamp;
use crate::domain::vendor::KnownDb;

/// A station seen this recently is always reported.
pub const PRESENCE_WINDOW_SECS: i64 = 30;

// ---------------------------------------------------------------------------
// Peak stores
// ---------------------------------------------------------------------------

/// Fold persisted peaks into the devices of `index`.
///
/// Rows whose MAC is not in the index are ignored. Returns the number of
/// devices whose peak was raised by the persisted value.
pub fn fold_peaks<D: Device>(index: &mut DeviceIndex<D>, records: &[PeakRecord]) -> usize {
    let mut raised = 0;
    for record in records {
        if let Some(device) = index.get_mut(&record.mac) {
            if device.history_mut().peak.absorb(record.peak) {
                trace!(mac = %record.mac, power = record.peak.power, "persisted peak wins");
                raised += 1;
            }
        }
    }
    raised
}

// ---------------------------------------------------------------------------
// ThrottlePolicy
// ---------------------------------------------------------------------------

/// Outcome of the display throttle for one station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Seen within [`PRESENCE_WINDOW_SECS`] of now.
    Present,
    /// Never reported before.
    FirstReport,
    /// Reported too recently.
    Quiet,
    /// Last reported too long ago.
    Expired,
    /// Quiet period over, not yet expired.
    Due,
}

impl ThrottleDecision {
    /// Whether the station may be reported.
    pub fn is_eligible(self) -> bool {
        matches!(self, Self::Present | Self::FirstReport | Self::Due)
    }
}

/// Minimum quiet time and maximum age, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThrottlePolicy {
    /// A station reported less than this long ago is suppressed.
    pub min_quiet_secs: i64,
    /// A station last reported more than this long ago is suppressed.
    pub max_age_secs: i64,
}

impl ThrottlePolicy {
    /// Decide whether a station may be reported at `now`.
    pub fn decide(
        &self,
        now: Timestamp,
        last_seen: Timestamp,
        last_displayed: Option<Timestamp>,
    ) -> ThrottleDecision {
        if now.seconds_since(&last_seen) <= PRESENCE_WINDOW_SECS {
            return ThrottleDecision::Present;
        }
        let Some(shown) = last_displayed else {
            return ThrottleDecision::FirstReport;
        };
        let elapsed = now.seconds_since(&shown);
        if elapsed < self.min_quiet_secs {
            ThrottleDecision::Quiet
        } else if elapsed > self.max_age_secs {
            ThrottleDecision::Expired
        } else {
            ThrottleDecision::Due
        }
    }

    /// Whether an orphan row last reported at `last_displayed` is too old to keep.
    pub fn is_stale(&self, now: Timestamp, last_displayed: Timestamp) -> bool {
        now.seconds_since(&last_displayed) > self.max_age_secs
    }
}

// ---------------------------------------------------------------------------
// Printed store
// ---------------------------------------------------------------------------

/// Result of applying the printed store to the current stations.
#[derive(Debug, Clone, Default)]
pub struct ThrottleOutcome {
    /// Stations that must not be reported this run.
    pub suppressed: HashSet<MacAddr>,
    /// Retained rows that matched no current station.
    pub orphans: Vec<OrphanEntry>,
}

impl ThrottleOutcome {
    /// Orphans that are known devices, for reporting.
    pub fn known_orphans(&self) -> impl Iterator<Item = &OrphanEntry> {
        self.orphans.iter().filter(|o| o.is_known())
    }
}

/// Restore last-displayed times from the printed store and run the throttle.
///
/// Without a policy every station stays eligible, but the store is still
/// carried forward.
pub fn apply_printed(
    stations: &mut DeviceIndex<Station>,
    records: Vec<PrintedRecord>,
    known: &KnownDb,
    policy: Option<&ThrottlePolicy>,
    now: Timestamp,
) -> ThrottleOutcome {
    let mut outcome = ThrottleOutcome::default();

    for record in records {
        if let Some(station) = stations.get_mut(&record.mac) {
            station.history.last_displayed = Some(record.last_displayed);
            continue;
        }
        if policy.is_some_and(|p| p.is_stale(now, record.last_displayed)) {
            debug!(mac = %record.mac, "dropping stale orphan");
            continue;
        }
        outcome.orphans.push(OrphanEntry {
            mac: record.mac,
            last_displayed: record.last_displayed,
            essid: record.essid,
            description: known.resolve_known(&record.mac).to_owned(),
        });
    }

    if let Some(policy) = policy {
        for station in stations.iter_mut() {
            let h = &mut station.history;
            let decision = policy.decide(now, h.last_seen, h.last_displayed);
            trace!(mac = %station.mac, ?decision, "throttle decision");
            if decision == ThrottleDecision::Present {
                h.last_displayed = Some(now);
            }
            if !decision.is_eligible() {
                outcome.suppressed.insert(station.mac);
            }
        }
    }

    debug!(
        suppressed = outcome.suppressed.len(),
        orphans = outcome.orphans.len(),
        "applied display throttle"
    );
    outcome
}

/// Rows for the next printed store: current stations that have ever been
/// reported, then the retained orphans unchanged.
pub fn printed_records(stations: &DeviceIndex<Station>, orphans: &[OrphanEntry]) -> Vec<PrintedRecord> {
    let live = stations.iter().filter_map(|s| {
        s.history.last_displayed.map(|last_displayed| PrintedRecord {
            mac: s.mac,
            last_displayed,
            essid: s.essid.clone(),
        })
    });
    let kept = orphans.iter().map(|o| PrintedRecord {
        mac: o.mac,
        last_displayed: o.last_displayed,
        essid: o.essid.clone(),
    });
    live.chain(kept).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::{DeviceHistory, PeakPower};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn mac(s: &str) -> MacAddr {
        MacAddr::parse(s).unwrap()
    }

    fn station(m: &str, last_seen: &str) -> Station {
        let t = ts(last_seen);
        Station::new(mac(m), DeviceHistory::first_sighting(t, t))
    }

    fn policy() -> ThrottlePolicy {
        ThrottlePolicy {
            min_quiet_secs: 30 * 60,
            max_age_secs: 24 * 3600,
        }
    }

    #[test]
    fn quiet_period_suppresses() {
        let now = ts("2024-01-01 10:00:00");
        let decision = policy().decide(
            now,
            ts("2024-01-01 09:50:00"),
            Some(ts("2024-01-01 09:40:00")),
        );
        assert_eq!(decision, ThrottleDecision::Quiet);
        assert!(!decision.is_eligible());
    }

    #[test]
    fn recent_sighting_overrides_quiet_period() {
        let now = ts("2024-01-01 10:00:00");
        let decision = policy().decide(
            now,
            ts("2024-01-01 09:59:45"),
            Some(ts("2024-01-01 09:40:00")),
        );
        assert_eq!(decision, ThrottleDecision::Present);
        assert!(decision.is_eligible());
    }

    #[test]
    fn decision_ladder() {
        let now = ts("2024-01-02 10:00:00");
        let seen = ts("2024-01-02 09:00:00");
        let p = policy();
        assert_eq!(p.decide(now, seen, None), ThrottleDecision::FirstReport);
        assert_eq!(
            p.decide(now, seen, Some(ts("2024-01-02 09:00:00"))),
            ThrottleDecision::Due
        );
        assert_eq!(
            p.decide(now, seen, Some(ts("2023-12-31 09:00:00"))),
            ThrottleDecision::Expired
        );
    }

    #[test]
    fn fold_peaks_keeps_maximum_and_ignores_strangers() {
        let mut index = DeviceIndex::new();
        let mut s = station("00:11:22:33:44:55", "2024-01-02 10:00:00");
        s.history.peak = PeakPower {
            power: -50,
            time: Some(ts("2024-01-02 10:00:00")),
        };
        index.insert(s);

        let records = [
            PeakRecord {
                mac: mac("00:11:22:33:44:55"),
                peak: PeakPower {
                    power: -30,
                    time: Some(ts("2024-01-01 08:00:00")),
                },
            },
            PeakRecord {
                mac: mac("00:11:22:33:44:99"),
                peak: PeakPower {
                    power: -10,
                    time: None,
                },
            },
        ];
        assert_eq!(fold_peaks(&mut index, &records), 1);
        let h = &index.as_slice()[0].history;
        assert_eq!(h.peak.power, -30);
        assert_eq!(h.peak.time, Some(ts("2024-01-01 08:00:00")));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn apply_printed_restores_refreshes_and_suppresses() {
        let now = ts("2024-01-01 10:00:00");
        let mut index = DeviceIndex::new();
        index.insert(station("00:00:00:00:00:01", "2024-01-01 09:50:00"));
        index.insert(station("00:00:00:00:00:02", "2024-01-01 09:59:50"));
        index.insert(station("00:00:00:00:00:03", "2024-01-01 09:00:00"));

        let records = vec![
            PrintedRecord {
                mac: mac("00:00:00:00:00:01"),
                last_displayed: ts("2024-01-01 09:40:00"),
                essid: String::new(),
            },
            PrintedRecord {
                mac: mac("00:00:00:00:00:02"),
                last_displayed: ts("2024-01-01 09:40:00"),
                essid: String::new(),
            },
        ];
        let outcome = apply_printed(&mut index, records, &KnownDb::default(), Some(&policy()), now);

        assert!(outcome.suppressed.contains(&mac("00:00:00:00:00:01")));
        assert!(!outcome.suppressed.contains(&mac("00:00:00:00:00:02")));
        assert!(!outcome.suppressed.contains(&mac("00:00:00:00:00:03")));
        assert_eq!(index.as_slice()[1].history.last_displayed, Some(now));
        assert_eq!(
            index.as_slice()[0].history.last_displayed,
            Some(ts("2024-01-01 09:40:00"))
        );
        assert!(outcome.orphans.is_empty());
    }

    #[test]
    fn orphans_are_kept_reported_and_expired() {
        let now = ts("2024-01-10 10:00:00");
        let known = KnownDb::from_entries(vec![(mac("00:00:00:00:00:0A"), "printer".into())]);
        let records = vec![
            PrintedRecord {
                mac: mac("00:00:00:00:00:0A"),
                last_displayed: ts("2024-01-10 08:00:00"),
                essid: "office".into(),
            },
            PrintedRecord {
                mac: mac("00:00:00:00:00:0B"),
                last_displayed: ts("2024-01-10 07:00:00"),
                essid: String::new(),
            },
            PrintedRecord {
                mac: mac("00:00:00:00:00:0C"),
                last_displayed: ts("2024-01-01 07:00:00"),
                essid: String::new(),
            },
        ];
        let mut index = DeviceIndex::new();
        let outcome = apply_printed(&mut index, records, &known, Some(&policy()), now);

        assert_eq!(outcome.orphans.len(), 2);
        let known_orphans: Vec<_> = outcome.known_orphans().collect();
        assert_eq!(known_orphans.len(), 1);
        assert_eq!(known_orphans[0].description, "printer");

        let rows = printed_records(&index, &outcome.orphans);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].essid, "office");
    }

    #[test]
    fn no_policy_keeps_everything_eligible() {
        let now = ts("2024-01-10 10:00:00");
        let mut index = DeviceIndex::new();
        index.insert(station("00:00:00:00:00:01", "2024-01-01 09:00:00"));
        let records = vec![
            PrintedRecord {
                mac: mac("00:00:00:00:00:01"),
                last_displayed: ts("2024-01-10 09:59:00"),
                essid: String::new(),
            },
            PrintedRecord {
                mac: mac("00:00:00:00:00:0C"),
                last_displayed: ts("2020-01-01 07:00:00"),
                essid: String::new(),
            },
        ];
        let outcome = apply_printed(&mut index, records, &KnownDb::default(), None, now);
        assert!(outcome.suppressed.is_empty());
        assert_eq!(outcome.orphans.len(), 1);
    }
}
