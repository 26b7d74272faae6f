//! MAC-keyed device index.
//!
//! One [`DeviceIndex`] exists per record group. Records live in an
//! insertion-ordered `Vec` so that reports without an explicit sort follow
//! snapshot order; a `HashMap` from [`MacAddr`] to the record's position
//! gives O(1) average lookups.

use std::collections::HashMap;

use crate::domain::device::Device;
use crate::domain::mac::MacAddr;

// ---------------------------------------------------------------------------
// IndexStats
// ---------------------------------------------------------------------------

/// Counters describing how the index was populated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of records held.
    pub records: usize,
    /// Number of distinct legacy hash buckets in use.
    pub legacy_buckets: usize,
    /// Inserts that landed in a legacy bucket already holding another MAC.
    pub legacy_collisions: usize,
}

// ---------------------------------------------------------------------------
// DeviceIndex -- Aggregate Root
// ---------------------------------------------------------------------------

/// Insertion-ordered collection of devices with unique MACs.
#[derive(Debug, Clone)]
pub struct DeviceIndex<D> {
    /// Records in first-sighting order.
    records: Vec<D>,
    /// Position of each MAC inside `records`.
    positions: HashMap<MacAddr, usize>,
    /// Occupancy of the historical 65536-bucket hash.
    legacy_buckets: HashMap<u16, usize>,
    /// Inserts that shared a legacy bucket with an earlier MAC.
    legacy_collisions: usize,
}

impl<D: Device> DeviceIndex<D> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            positions: HashMap::new(),
            legacy_buckets: HashMap::new(),
            legacy_collisions: 0,
        }
    }

    /// Look up a device by MAC.
    pub fn find(&self, mac: &MacAddr) -> Option<&D> {
        self.positions.get(mac).map(|&idx| &self.records[idx])
    }

    /// Look up a device by MAC text. Unparseable text is simply not found.
    pub fn find_str(&self, mac: &str) -> Option<&D> {
        MacAddr::parse(mac).ok().and_then(|mac| self.find(&mac))
    }

    /// Mutable lookup by MAC.
    pub fn get_mut(&mut self, mac: &MacAddr) -> Option<&mut D> {
        match self.positions.get(mac) {
            Some(&idx) => self.records.get_mut(idx),
            None => None,
        }
    }

    /// Whether `mac` is present.
    pub fn contains(&self, mac: &MacAddr) -> bool {
        self.positions.contains_key(mac)
    }

    /// Insert a record unless its MAC is already present.
    ///
    /// Returns `true` when the record was added.
    pub fn insert(&mut self, record: D) -> bool {
        let mac = record.mac();
        if self.positions.contains_key(&mac) {
            return false;
        }

        let bucket = self.legacy_buckets.entry(mac.legacy_bucket()).or_insert(0);
        if *bucket > 0 {
            self.legacy_collisions += 1;
        }
        *bucket += 1;

        self.positions.insert(mac, self.records.len());
        self.records.push(record);
        true
    }

    /// Mutable access to the record for `mac`, creating it with `make` first
    /// when absent. The flag is `true` when the record was just created.
    ///
    /// `make` must build a record whose MAC is `mac`.
    pub fn get_or_insert_with(&mut self, mac: MacAddr, make: impl FnOnce() -> D) -> (&mut D, bool) {
        if let Some(&idx) = self.positions.get(&mac) {
            return (&mut self.records[idx], false);
        }
        let record = make();
        debug_assert_eq!(record.mac(), mac);
        self.insert(record);
        let idx = self.records.len() - 1;
        (&mut self.records[idx], true)
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &D> {
        self.records.iter()
    }

    /// Mutable records in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut D> {
        self.records.iter_mut()
    }

    /// Records as a slice, in insertion order.
    pub fn as_slice(&self) -> &[D] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Population counters.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            records: self.records.len(),
            legacy_buckets: self.legacy_buckets.len(),
            legacy_collisions: self.legacy_collisions,
        }
    }
}

impl<D: Device> Default for DeviceIndex<D> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
