//! Human-readable text report.

use std::fmt::Write as _;

use airmerge_core::{
    calendar_diff, AccessPoint, DeviceHistory, MergeResult, OrphanEntry, RecordSink, Station,
    Timestamp,
};

use super::{Destination, CRLF};

/// Layout of the text report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextStyle {
    /// One labelled block per device.
    #[default]
    Full,
    /// One line per device.
    Brief,
}

/// Writes `<prefix>.txt`, or stdout.
#[derive(Debug)]
pub struct TextSink {
    destination: Destination,
    style: TextStyle,
    buf: String,
}

fn opt_time(t: Option<Timestamp>) -> String {
    t.map(|t| t.to_string()).unwrap_or_default()
}

impl TextSink {
    /// A sink that writes to `destination` when the report finishes.
    pub fn new(destination: Destination, style: TextStyle) -> Self {
        Self {
            destination,
            style,
            buf: String::new(),
        }
    }

    /// The rendered text so far.
    pub fn contents(&self) -> &str {
        &self.buf
    }

    fn line(&mut self, label: &str, value: impl std::fmt::Display) {
        let _ = write!(self.buf, "{label}: {value}{CRLF}");
    }

    fn timing(&mut self, h: &DeviceHistory) {
        self.line("First time seen", h.first_seen);
        self.line("Last time seen", h.last_seen);
        self.line("Previous last time seen", opt_time(h.prev_last_seen));
        if let Some(prev) = h.prev_last_seen {
            self.line("Since previous last seen", calendar_diff(&h.last_seen, &prev));
        }
    }

    fn tail(&mut self, h: &DeviceHistory) {
        self.line("Max Power", h.peak.power);
        self.line("Max Power Time", opt_time(h.peak.time));
        self.line("Latitude", format_args!("{:.6}", h.position.lat));
        self.line("Longitude", format_args!("{:.6}", h.position.lon));
        self.line("File", &h.source);
        self.line("IP Address", &h.identity.ip);
        self.line("Description", &h.identity.description);
        self.buf.push_str(CRLF);
    }
}

impl RecordSink for TextSink {
    fn access_point(&mut self, ap: &AccessPoint) -> MergeResult<()> {
        let h = &ap.history;
        if self.style == TextStyle::Brief {
            let _ = write!(
                self.buf,
                "{} AP:  {} ESSID: {} PWR: {} DESC: {} VEN: {}{CRLF}",
                h.last_seen, ap.bssid, ap.essid, h.power, h.identity.description, h.identity.vendor
            );
            return Ok(());
        }
        self.line("BSSID", ap.bssid);
        self.line("Vendor", &h.identity.vendor);
        self.timing(h);
        self.line("Channel", &ap.channel);
        self.line("Speed", &ap.speed);
        self.line("Privacy", &ap.privacy);
        self.line("Cipher", &ap.cipher);
        self.line("Authentication", &ap.authentication);
        self.line("Power", h.power);
        self.line("Previous Power", h.old_power);
        self.line("Beacons", &ap.beacons);
        self.line("IVs", &ap.ivs);
        self.line("LAN IP", &ap.lan_ip);
        self.line("ID-length", &ap.id_length);
        self.line("ESSID", &ap.essid);
        self.line("Key", &ap.key);
        self.tail(h);
        Ok(())
    }

    fn station(&mut self, station: &Station) -> MergeResult<()> {
        let h = &station.history;
        if self.style == TextStyle::Brief {
            let _ = write!(
                self.buf,
                "{} STA: {} ESSID: {} PWR: {} DESC: {} VEN: {}{CRLF}",
                h.last_seen,
                station.mac,
                station.essid,
                h.power,
                h.identity.description,
                h.identity.vendor
            );
            return Ok(());
        }
        self.line("Station MAC", station.mac);
        self.line("Vendor", &h.identity.vendor);
        self.timing(h);
        self.line("Power", h.power);
        self.line("Previous Power", h.old_power);
        self.line("Packet count", &station.packets);
        self.line("BSSID", &station.association);
        self.line("ESSID", &station.essid);
        self.line("Probed ESSIDs", &station.probed);
        self.tail(h);
        Ok(())
    }

    fn orphan(&mut self, orphan: &OrphanEntry) -> MergeResult<()> {
        if self.style == TextStyle::Brief {
            let _ = write!(
                self.buf,
                "{} KNOWN: {} ESSID: {} DESC: {}{CRLF}",
                orphan.last_displayed, orphan.mac, orphan.essid, orphan.description
            );
            return Ok(());
        }
        self.line("Known device not seen", orphan.mac);
        self.line("Last displayed", orphan.last_displayed);
        self.line("ESSID", &orphan.essid);
        self.line("Description", &orphan.description);
        self.buf.push_str(CRLF);
        Ok(())
    }

    fn finish(&mut self) -> MergeResult<()> {
        self.destination.write_all(&self.buf)
    }
}
