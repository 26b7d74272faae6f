//! GPS track and peak-time correlation.

use crate::domain::device::{Device, GeoPoint};
use crate::domain::timestamp::Timestamp;
use crate::error::{MergeError, MergeResult};

/// One GPS fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    /// When the fix was taken.
    pub time: Timestamp,
    /// Where.
    pub point: GeoPoint,
}

/// A chronological sequence of fixes.
#[derive(Debug, Clone, Default)]
pub struct GpsTrack {
    fixes: Vec<GpsFix>,
}

impl GpsTrack {
    /// Wrap fixes already in chronological order.
    pub fn new(fixes: Vec<GpsFix>) -> Self {
        Self { fixes }
    }

    /// The fixes.
    pub fn fixes(&self) -> &[GpsFix] {
        &self.fixes
    }

    /// Number of fixes.
    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    /// Whether the track has no fixes.
    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// Position of the device at `at`.
    ///
    /// The cursor starts at the first fix and advances while the next fix is
    /// not later than `at`, so the result is the latest fix at or before
    /// `at`. Times before the first fix or after the last one have no
    /// position.
    pub fn position_at(&self, at: Timestamp) -> GeoPoint {
        let (first, last) = match (self.fixes.first(), self.fixes.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return GeoPoint::NONE,
        };
        if at < first.time || at > last.time {
            return GeoPoint::NONE;
        }

        let mut cursor = 0;
        while cursor + 1 < self.fixes.len() && self.fixes[cursor + 1].time <= at {
            cursor += 1;
        }
        self.fixes[cursor].point
    }

    /// Assign a position to every device from its peak-power time.
    ///
    /// Stops at the first device without a peak time; devices already
    /// visited keep their new position.
    pub fn correlate<'a, D, I>(&self, devices: I) -> MergeResult<usize>
    where
        D: Device + 'a,
        I: IntoIterator<Item = &'a mut D>,
    {
        let mut placed = 0;
        for device in devices {
            let at = device
                .history()
                .peak
                .time
                .ok_or_else(|| MergeError::GpsCorrelation {
                    mac: device.mac().to_string(),
                    reason: "device has no peak-power timestamp".into(),
                })?;
            let point = self.position_at(at);
            if point.is_fix() {
                placed += 1;
            }
            device.history_mut().position = point;
        }
        Ok(placed)
    }
}
