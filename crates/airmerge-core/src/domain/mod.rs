//! Domain types for the survey merge bounded context.

pub mod device;
pub mod gps;
pub mod index;
pub mod mac;
pub mod timestamp;
pub mod vendor;

pub use device::{
    AccessPoint, Association, Device, DeviceHistory, GeoPoint, Identity, OrphanEntry, PeakPower,
    ProbedEssids, RecordGroup, Station,
};
pub use gps::{GpsFix, GpsTrack};
pub use index::{DeviceIndex, IndexStats};
pub use mac::{MacAddr, Oui};
pub use timestamp::{calendar_diff, CalendarSpan, Timestamp};
pub use vendor::{Directory, KnownDb, VendorDb};
