//! File adapters.
//!
//! - [`snapshot`]: tokenizes airodump CSV snapshots.
//! - [`vendor_db`]: loads the OUI database and known-device lists.
//! - [`side_files`]: reads and writes the peak and printed stores.
//! - [`gps_track`]: reads GPS track files.

pub mod gps_track;
pub mod side_files;
pub mod snapshot;
pub mod vendor_db;

pub use gps_track::{parse_gps_track, read_gps_track};
pub use side_files::{PeakRecord, PrintedRecord};
pub use snapshot::{parse_snapshot, read_snapshot, ApRow, Snapshot, StationRow};
pub use vendor_db::{find_default_oui_db, load_known_db, load_oui_db, DEFAULT_OUI_PATHS};
