//! HTML report: one bordered table per record group.

use std::fmt::Write as _;
use std::path::PathBuf;

use airmerge_core::{AccessPoint, MergeResult, RecordSink, Station, Timestamp};

use super::{escape_markup, Destination, CRLF};

const AP_COLUMNS: &[&str] = &[
    "BSSID",
    "Vendor",
    "First time seen",
    "Last time seen",
    "Prev time seen",
    "channel",
    "Speed",
    "Privacy",
    "Cipher",
    "Authentication",
    "Power",
    "# beacons",
    "# IV",
    "LAN IP",
    "ID-Length",
    "ESSID",
    "Key",
    "Description",
    "IP Address",
];

const STATION_COLUMNS: &[&str] = &[
    "Station MAC",
    "Vendor",
    "First time seen",
    "Last time seen",
    "Prev time seen",
    "Power",
    "# packets",
    "BSSID",
    "ESSID",
    "Probes",
    "Description",
    "IP Address",
];

/// Writes `<prefix>.html`.
#[derive(Debug)]
pub struct HtmlSink {
    destination: Destination,
    buf: String,
    table_open: bool,
}

fn opt_time(t: Option<Timestamp>) -> String {
    t.map(|t| t.to_string()).unwrap_or_default()
}

impl HtmlSink {
    /// A sink that writes to `path` when the report finishes.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            destination: Destination::File(path.into()),
            buf: String::new(),
            table_open: false,
        }
    }

    /// The full document as it will be written.
    pub fn document(&self) -> String {
        let mut doc = format!("<html>{CRLF}<head></head>{CRLF}<body>{CRLF}");
        doc.push_str(&self.buf);
        if self.table_open {
            doc.push_str("</table>");
            doc.push_str(CRLF);
        }
        doc.push_str("</body>");
        doc.push_str(CRLF);
        doc.push_str("</html>");
        doc.push_str(CRLF);
        doc
    }

    fn table(&mut self, columns: &[&str]) {
        if self.table_open {
            self.buf.push_str("</table>");
            self.buf.push_str(CRLF);
        }
        self.buf.push_str("<table border=\"1\">");
        self.buf.push_str(CRLF);
        self.row(columns.iter().map(|c| c.to_string()));
        self.table_open = true;
    }

    fn row(&mut self, cells: impl IntoIterator<Item = String>) {
        self.buf.push_str("<tr>");
        for cell in cells {
            let _ = write!(self.buf, "<td>{}</td>", escape_markup(&cell));
        }
        self.buf.push_str("</tr>");
        self.buf.push_str(CRLF);
    }
}

impl RecordSink for HtmlSink {
    fn begin_access_points(&mut self, count: usize) -> MergeResult<()> {
        if count > 0 {
            self.table(AP_COLUMNS);
        }
        Ok(())
    }

    fn access_point(&mut self, ap: &AccessPoint) -> MergeResult<()> {
        let h = &ap.history;
        self.row([
            ap.bssid.to_string(),
            h.identity.vendor.clone(),
            h.first_seen.to_string(),
            h.last_seen.to_string(),
            opt_time(h.prev_last_seen),
            ap.channel.clone(),
            ap.speed.clone(),
            ap.privacy.clone(),
            ap.cipher.clone(),
            ap.authentication.clone(),
            h.power.to_string(),
            ap.beacons.clone(),
            ap.ivs.clone(),
            ap.lan_ip.clone(),
            ap.id_length.clone(),
            ap.essid.clone(),
            ap.key.clone(),
            h.identity.description.clone(),
            h.identity.ip.clone(),
        ]);
        Ok(())
    }

    fn begin_stations(&mut self, count: usize) -> MergeResult<()> {
        if count > 0 {
            self.table(STATION_COLUMNS);
        }
        Ok(())
    }

    fn station(&mut self, station: &Station) -> MergeResult<()> {
        let h = &station.history;
        self.row([
            station.mac.to_string(),
            h.identity.vendor.clone(),
            h.first_seen.to_string(),
            h.last_seen.to_string(),
            opt_time(h.prev_last_seen),
            h.power.to_string(),
            station.packets.clone(),
            station.association.to_string(),
            station.essid.clone(),
            station.probed.to_string(),
            h.identity.description.clone(),
            h.identity.ip.clone(),
        ]);
        Ok(())
    }

    fn finish(&mut self) -> MergeResult<()> {
        self.destination.write_all(&self.document())
    }
}
