//! Terminal summary tables.

use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use airmerge_core::{AccessPoint, MergeResult, OrphanEntry, RecordSink, Station, Timestamp};

/// Access point table row.
#[derive(Debug, Tabled)]
pub struct ApRow {
    /// BSSID.
    #[tabled(rename = "BSSID")]
    pub bssid: String,
    /// Current power in dBm.
    #[tabled(rename = "PWR")]
    pub power: i32,
    /// Peak power in dBm.
    #[tabled(rename = "Max")]
    pub peak: i32,
    /// Channel.
    #[tabled(rename = "CH")]
    pub channel: String,
    /// Privacy column.
    #[tabled(rename = "Privacy")]
    pub privacy: String,
    /// SSID.
    #[tabled(rename = "ESSID")]
    pub essid: String,
    /// OUI vendor.
    #[tabled(rename = "Vendor")]
    pub vendor: String,
    /// Last seen, month to second.
    #[tabled(rename = "Last seen")]
    pub last_seen: String,
}

/// Station table row.
#[derive(Debug, Tabled)]
pub struct StationRow {
    /// Station MAC.
    #[tabled(rename = "Station")]
    pub mac: String,
    /// Current power in dBm.
    #[tabled(rename = "PWR")]
    pub power: i32,
    /// Peak power in dBm.
    #[tabled(rename = "Max")]
    pub peak: i32,
    /// Associated BSSID or `(not associated)`.
    #[tabled(rename = "BSSID")]
    pub bssid: String,
    /// ESSID of the associated access point.
    #[tabled(rename = "ESSID")]
    pub essid: String,
    /// OUI vendor.
    #[tabled(rename = "Vendor")]
    pub vendor: String,
    /// Known-device description.
    #[tabled(rename = "Description")]
    pub description: String,
    /// Last seen, month to second.
    #[tabled(rename = "Last seen")]
    pub last_seen: String,
}

/// Known device missing from this run.
#[derive(Debug, Tabled)]
pub struct OrphanRow {
    /// Station MAC.
    #[tabled(rename = "Station")]
    pub mac: String,
    /// Known-device description.
    #[tabled(rename = "Description")]
    pub description: String,
    /// ESSID recorded when it was last shown.
    #[tabled(rename = "ESSID")]
    pub essid: String,
    /// When it was last shown.
    #[tabled(rename = "Last shown")]
    pub last_displayed: String,
}

fn short_time(t: Timestamp) -> String {
    t.as_naive().format("%m-%d %H:%M:%S").to_string()
}

/// Collects rows and prints rounded tables to stdout on `finish`.
#[derive(Debug, Default)]
pub struct TableSink {
    aps: Vec<ApRow>,
    stations: Vec<StationRow>,
    orphans: Vec<OrphanRow>,
}

impl TableSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The tables as they will be printed.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.aps.is_empty() {
            out.push_str(&format!("{}\n", "Access points".bold().cyan()));
            out.push_str(&Table::new(&self.aps).with(Style::rounded()).to_string());
            out.push('\n');
        }
        if !self.stations.is_empty() {
            out.push_str(&format!("{}\n", "Stations".bold().cyan()));
            out.push_str(&Table::new(&self.stations).with(Style::rounded()).to_string());
            out.push('\n');
        }
        if !self.orphans.is_empty() {
            out.push_str(&format!("{}\n", "Known devices not seen".bold().yellow()));
            out.push_str(&Table::new(&self.orphans).with(Style::rounded()).to_string());
            out.push('\n');
        }
        out
    }
}

impl RecordSink for TableSink {
    fn access_point(&mut self, ap: &AccessPoint) -> MergeResult<()> {
        let h = &ap.history;
        self.aps.push(ApRow {
            bssid: ap.bssid.to_string(),
            power: h.power,
            peak: h.peak.power,
            channel: ap.channel.clone(),
            privacy: ap.privacy.clone(),
            essid: ap.essid.clone(),
            vendor: h.identity.vendor.clone(),
            last_seen: short_time(h.last_seen),
        });
        Ok(())
    }

    fn station(&mut self, station: &Station) -> MergeResult<()> {
        let h = &station.history;
        self.stations.push(StationRow {
            mac: station.mac.to_string(),
            power: h.power,
            peak: h.peak.power,
            bssid: station.association.to_string(),
            essid: station.essid.clone(),
            vendor: h.identity.vendor.clone(),
            description: h.identity.description.clone(),
            last_seen: short_time(h.last_seen),
        });
        Ok(())
    }

    fn orphan(&mut self, orphan: &OrphanEntry) -> MergeResult<()> {
        self.orphans.push(OrphanRow {
            mac: orphan.mac.to_string(),
            description: orphan.description.clone(),
            essid: orphan.essid.clone(),
            last_displayed: short_time(orphan.last_displayed),
        });
        Ok(())
    }

    fn finish(&mut self) -> MergeResult<()> {
        print!("{}", self.render());
        Ok(())
    }
}
