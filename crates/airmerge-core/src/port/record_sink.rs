//! The driven port through which merged reports leave the engine.

use crate::domain::device::{AccessPoint, OrphanEntry, Station};
use crate::error::MergeResult;

/// Consumer of a rendered report.
///
/// [`Report::render`](crate::pipeline::report::Report::render) calls the
/// methods in this order: `begin_access_points`, `access_point` per AP,
/// `begin_stations`, `station` per station, `orphan` per known orphan,
/// then `finish`. Groups that were not selected are announced with a count
/// of zero and no records. Sinks only ever see shared references.
pub trait RecordSink {
    /// Start of the access-point group.
    fn begin_access_points(&mut self, _count: usize) -> MergeResult<()> {
        Ok(())
    }

    /// One access point.
    fn access_point(&mut self, ap: &AccessPoint) -> MergeResult<()>;

    /// Start of the station group.
    fn begin_stations(&mut self, _count: usize) -> MergeResult<()> {
        Ok(())
    }

    /// One station.
    fn station(&mut self, station: &Station) -> MergeResult<()>;

    /// One known device seen in an earlier run but not in this one.
    fn orphan(&mut self, _orphan: &OrphanEntry) -> MergeResult<()> {
        Ok(())
    }

    /// End of the report; flush buffered output here.
    fn finish(&mut self) -> MergeResult<()> {
        Ok(())
    }
}
