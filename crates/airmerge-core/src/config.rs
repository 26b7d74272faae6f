//! Run configuration.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::domain::timestamp::Timestamp;
use crate::error::{MergeError, MergeResult};
use crate::pipeline::history::ThrottlePolicy;
use crate::pipeline::report::ReportFilter;

/// Paths of the side-files that belong to one output prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SideFiles {
    /// `<prefix>-appower.csv`
    pub ap_power: PathBuf,
    /// `<prefix>-stapower.csv`
    pub station_power: PathBuf,
    /// `<prefix>-printed.csv`
    pub printed: PathBuf,
}

impl SideFiles {
    /// Side-file paths for `prefix`.
    pub fn for_prefix(prefix: &Path) -> Self {
        Self {
            ap_power: with_suffix(prefix, "-appower.csv"),
            station_power: with_suffix(prefix, "-stapower.csv"),
            printed: with_suffix(prefix, "-printed.csv"),
        }
    }
}

/// `prefix` with `suffix` appended to its last component.
pub fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(prefix.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// Everything one merge run needs to know.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MergeConfig {
    /// Snapshots merged in order.
    pub inputs: Vec<PathBuf>,
    /// Snapshot merged last with the final role.
    pub final_snapshot: Option<PathBuf>,
    /// Output prefix; side-files and reports are derived from it.
    pub output_prefix: Option<PathBuf>,
    /// Explicit OUI database. When unset the default install paths are tried.
    pub oui_db: Option<PathBuf>,
    /// Known-device descriptions.
    pub known_devices: Option<PathBuf>,
    /// Known-device IP addresses.
    pub known_ips: Option<PathBuf>,
    /// GPS track to correlate against.
    pub gps_track: Option<PathBuf>,
    /// Selection and ordering.
    pub filter: ReportFilter,
    /// Display throttle for stations.
    pub throttle: Option<ThrottlePolicy>,
    /// Wall-clock override, mostly for tests.
    pub now: Option<Timestamp>,
}

impl MergeConfig {
    /// Check the configuration before anything is read or written.
    pub fn validate(&self) -> MergeResult<()> {
        if self.inputs.is_empty() && self.final_snapshot.is_none() {
            return Err(MergeError::config("no input files specified"));
        }
        match &self.output_prefix {
            None => return Err(MergeError::config("an output prefix is required")),
            Some(p) if p.as_os_str().is_empty() => {
                return Err(MergeError::config("the output prefix is empty"))
            }
            Some(_) => {}
        }
        let f = &self.filter;
        if f.min_power > f.max_power {
            return Err(MergeError::config(format!(
                "minimum power {} is above maximum power {}",
                f.min_power, f.max_power
            )));
        }
        if !f.access_points && !f.stations {
            return Err(MergeError::config(
                "neither access points nor stations are selected",
            ));
        }
        if let Some(t) = &self.throttle {
            if t.min_quiet_secs < 0 || t.max_age_secs < 0 {
                return Err(MergeError::config("throttle durations must not be negative"));
            }
        }
        Ok(())
    }

    /// Side-file paths, once a prefix is configured.
    pub fn side_files(&self) -> Option<SideFiles> {
        self.output_prefix.as_deref().map(SideFiles::for_prefix)
    }

    /// The configured clock, or the local time now.
    pub fn now(&self) -> Timestamp {
        self.now.unwrap_or_else(Timestamp::now)
    }
}
