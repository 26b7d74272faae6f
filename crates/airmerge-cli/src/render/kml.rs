//! KML placemarks for devices with a GPS position.
//!
//! Only written when a GPS track was supplied. Each access point or station
//! whose peak-power time fell inside the track becomes one placemark at that
//! position; devices without a fix are left out.

use std::fmt::Write as _;
use std::path::PathBuf;

use airmerge_core::{AccessPoint, DeviceHistory, MergeResult, RecordSink, Station};

use super::{escape_markup, Destination, CRLF};

const KML_OPEN: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n\
<kml xmlns=\"http://www.opengis.net/kml/2.2\">\r\n<Document>\r\n";
const KML_CLOSE: &str = "</Document>\r\n</kml>\r\n";

/// Writes `<prefix>.kml`.
#[derive(Debug)]
pub struct KmlSink {
    destination: Destination,
    buf: String,
    placemarks: usize,
}

impl KmlSink {
    /// A sink that writes to `path` when the report finishes.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            destination: Destination::File(path.into()),
            buf: String::new(),
            placemarks: 0,
        }
    }

    /// Number of placemarks rendered so far.
    pub fn placemarks(&self) -> usize {
        self.placemarks
    }

    /// The full document as it will be written.
    pub fn document(&self) -> String {
        format!("{KML_OPEN}{}{KML_CLOSE}", self.buf)
    }

    fn field(&mut self, label: &str, value: impl std::fmt::Display) {
        let value = escape_markup(&value.to_string());
        let _ = write!(self.buf, "{label}: {value}{CRLF}");
    }

    /// Opens a placemark. The name is the description when the device is
    /// known, otherwise `fallback`.
    fn open(&mut self, h: &DeviceHistory, fallback: &str) {
        let name = if h.identity.is_known() {
            &h.identity.description
        } else {
            fallback
        };
        let _ = write!(
            self.buf,
            "<Placemark>{CRLF}<name>{} ({})</name>{CRLF}<description>{CRLF}",
            escape_markup(name),
            escape_markup(&h.identity.vendor),
        );
        self.field("Description", &h.identity.description);
    }

    fn close(&mut self, h: &DeviceHistory) {
        self.field("Max Power", h.peak.power);
        self.field(
            "Max Power Time",
            h.peak.time.map(|t| t.to_string()).unwrap_or_default(),
        );
        self.field("IP Address", &h.identity.ip);
        self.field("File", &h.source);
        // KML orders coordinates longitude first.
        let _ = write!(
            self.buf,
            "</description>{CRLF}<Point>{CRLF}<coordinates>{:.6},{:.6}</coordinates>{CRLF}\
             </Point>{CRLF}</Placemark>{CRLF}",
            h.position.lon, h.position.lat,
        );
        self.placemarks += 1;
    }
}

impl RecordSink for KmlSink {
    fn access_point(&mut self, ap: &AccessPoint) -> MergeResult<()> {
        let h = &ap.history;
        if !h.position.is_fix() {
            return Ok(());
        }
        self.open(h, &ap.essid);
        self.field("BSSID", ap.bssid);
        self.field("Vendor", &h.identity.vendor);
        self.field("First time seen", h.first_seen);
        self.field("Last time seen", h.last_seen);
        self.field("Channel", &ap.channel);
        self.field("Privacy", &ap.privacy);
        self.field("Power", h.power);
        self.field("Previous Power", h.old_power);
        self.field("ESSID", &ap.essid);
        self.close(h);
        Ok(())
    }

    fn station(&mut self, station: &Station) -> MergeResult<()> {
        let h = &station.history;
        if !h.position.is_fix() {
            return Ok(());
        }
        self.open(h, &station.mac.to_string());
        self.field("Station MAC", station.mac);
        self.field("Vendor", &h.identity.vendor);
        self.field("First time seen", h.first_seen);
        self.field("Last time seen", h.last_seen);
        self.field("Power", h.power);
        self.field("Previous Power", h.old_power);
        self.field("Packet count", &station.packets);
        self.field("BSSID", &station.association);
        self.field("ESSID", &station.essid);
        self.field("Probed ESSIDs", &station.probed);
        self.close(h);
        Ok(())
    }

    fn finish(&mut self) -> MergeResult<()> {
        tracing::debug!(placemarks = self.placemarks, "rendered KML");
        self.destination.write_all(&self.document())
    }
}
