//! Report renderers.
//!
//! Each renderer is a [`RecordSink`](airmerge_core::RecordSink) that buffers
//! its output and only touches the filesystem in `finish`, so a run that
//! fails half way never leaves a truncated report behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use airmerge_core::{MergeError, MergeResult};

pub mod csv;
pub mod html;
pub mod kml;
pub mod table;
pub mod text;

pub use self::csv::CsvSink;
pub use self::html::HtmlSink;
pub use self::kml::KmlSink;
pub use self::table::TableSink;
pub use self::text::{TextSink, TextStyle};

pub(crate) const CRLF: &str = "\r\n";

/// Escape text for an HTML or XML body.
pub(crate) fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Where a rendered report ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Replace the file at this path.
    File(PathBuf),
    /// Standard output.
    Stdout,
}

impl Destination {
    /// Write `contents` to the destination.
    pub fn write_all(&self, contents: &str) -> MergeResult<()> {
        match self {
            Self::File(path) => {
                std::fs::write(path, contents).map_err(|e| MergeError::write(path, e))?;
                tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote report");
                Ok(())
            }
            Self::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(contents.as_bytes())
                    .and_then(|()| out.flush())
                    .map_err(|e| MergeError::write(Path::new("<stdout>"), e))
            }
        }
    }
}
