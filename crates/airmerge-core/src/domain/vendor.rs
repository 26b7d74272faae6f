//! Vendor and known-device lookup tables.
//!
//! Both tables are sorted arrays searched with `binary_search_by`. A miss is
//! not an error: resolution returns an empty string.

use crate::domain::mac::{MacAddr, Oui};

/// Longest vendor name kept from the OUI database, in bytes.
pub const VENDOR_NAME_CAP: usize = 80;

/// Sorted `(OUI, vendor)` table.
#[derive(Debug, Clone, Default)]
pub struct VendorDb {
    entries: Vec<(Oui, String)>,
}

impl VendorDb {
    /// Build a table from entries in any order.
    ///
    /// Duplicate prefixes keep the first occurrence.
    pub fn from_entries(entries: Vec<(Oui, String)>) -> Self {
        Self {
            entries: sort_keep_first(entries),
        }
    }

    /// Vendor name for the OUI of `mac`, or `""`.
    pub fn resolve_vendor(&self, mac: &MacAddr) -> &str {
        let oui = mac.oui();
        self.entries
            .binary_search_by(|(key, _)| key.cmp(&oui))
            .map(|idx| self.entries[idx].1.as_str())
            .unwrap_or("")
    }

    /// Number of prefixes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sorted `(MAC, text)` table used for both known devices and known IPs.
#[derive(Debug, Clone, Default)]
pub struct KnownDb {
    entries: Vec<(MacAddr, String)>,
}

impl KnownDb {
    /// Build a table from entries in any order.
    ///
    /// Duplicate MACs keep the first occurrence.
    pub fn from_entries(entries: Vec<(MacAddr, String)>) -> Self {
        Self {
            entries: sort_keep_first(entries),
        }
    }

    /// Text recorded for `mac`, or `""`.
    pub fn resolve_known(&self, mac: &MacAddr) -> &str {
        self.entries
            .binary_search_by(|(key, _)| key.cmp(mac))
            .map(|idx| self.entries[idx].1.as_str())
            .unwrap_or("")
    }

    /// Whether `mac` has an entry.
    pub fn contains(&self, mac: &MacAddr) -> bool {
        self.entries
            .binary_search_by(|(key, _)| key.cmp(mac))
            .is_ok()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stable sort by key, then drop later duplicates.
fn sort_keep_first<K: Ord + Copy>(mut entries: Vec<(K, String)>) -> Vec<(K, String)> {
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.dedup_by(|later, earlier| later.0 == earlier.0);
    entries
}

/// All lookup tables used to label devices.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    /// OUI to vendor name.
    pub vendors: VendorDb,
    /// MAC to user description.
    pub known_devices: KnownDb,
    /// MAC to IP address.
    pub known_ips: KnownDb,
}
