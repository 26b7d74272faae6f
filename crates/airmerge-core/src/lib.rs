//! # airmerge-core
//!
//! Merge-and-identity engine for airodump-style wireless survey snapshots.
//!
//! Successive CSV snapshots are merged into one longitudinal record per
//! device, keyed by MAC address. Peak signal strength and display history
//! survive between invocations in small side-files next to the report.
//!
//! - **Domain types**: [`MacAddr`], [`Timestamp`], [`AccessPoint`], [`Station`],
//!   [`DeviceIndex`], [`GpsTrack`]
//! - **Port**: [`RecordSink`] -- what renderers implement
//! - **Adapters**: snapshot tokenizer, vendor databases, side-files, GPS track
//! - **Pipeline**: [`MergeEngine`], display throttle, [`Report`], [`MergeRun`]

pub mod adapter;
pub mod config;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod port;

// Re-export key types at the crate root for convenience.
pub use adapter::{parse_snapshot, read_snapshot, Snapshot};
pub use config::{MergeConfig, SideFiles};
pub use domain::device::{
    AccessPoint, Association, Device, DeviceHistory, GeoPoint, Identity, OrphanEntry, PeakPower,
    ProbedEssids, RecordGroup, Station,
};
pub use domain::gps::{GpsFix, GpsTrack};
pub use domain::index::{DeviceIndex, IndexStats};
pub use domain::mac::{MacAddr, Oui};
pub use domain::timestamp::{calendar_diff, CalendarSpan, Timestamp};
pub use domain::vendor::{Directory, KnownDb, VendorDb};
pub use error::{MergeError, MergeResult, EXIT_IO, EXIT_MEMORY, EXIT_USAGE};
pub use pipeline::{
    run, MergeEngine, MergeRun, MergeStats, Novelty, Report, ReportFilter, RunSummary,
    SnapshotRole, SortKey, ThrottlePolicy,
};
pub use port::RecordSink;
