//! Error types for the airmerge-core crate.
//!
//! Lookup misses (unknown vendor, MAC absent from an index, no side-file yet)
//! are not errors and never show up here; they are represented by empty
//! strings or `Option::None` at the call site.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::device::RecordGroup;

/// A specialized `Result` type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Process exit status for usage, configuration and malformed-input failures.
pub const EXIT_USAGE: u8 = 1;

/// Process exit status reserved for allocation failures.
pub const EXIT_MEMORY: u8 = 2;

/// Process exit status for I/O failures while writing outputs.
pub const EXIT_IO: u8 = 3;

/// Errors that can occur while loading, merging and persisting survey data.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MergeError {
    /// Missing or contradictory configuration.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// A required input file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An output or side-file could not be written.
    #[error("cannot write {}: {source}", path.display())]
    Write {
        /// The file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A snapshot row is structurally invalid.
    #[error("malformed {group} row at line {line} (MAC '{mac}'): {reason}")]
    MalformedRow {
        /// Record group the row belongs to.
        group: RecordGroup,
        /// 1-based line number inside the snapshot.
        line: usize,
        /// MAC text of the offending row, possibly empty.
        mac: String,
        /// What was wrong with the row.
        reason: String,
    },

    /// Failed to parse a timestamp (expected `YYYY-MM-DD HH:MM:SS`).
    #[error("invalid timestamp '{value}': expected YYYY-MM-DD HH:MM:SS")]
    InvalidTimestamp {
        /// The text that could not be parsed.
        value: String,
    },

    /// Failed to parse a MAC address string (expected `AA:BB:CC:DD:EE:FF`).
    #[error("failed to parse MAC address from '{input}': expected AA:BB:CC:DD:EE:FF")]
    MacParseFailed {
        /// The input string that could not be parsed.
        input: String,
    },

    /// A vendor or known-device database line is shorter than its fixed offsets
    /// or carries an unparseable prefix.
    #[error("malformed vendor-database line {line} in {origin}: {reason}")]
    MalformedVendorLine {
        /// Name of the database the line came from.
        origin: String,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// A side-file line could not be interpreted.
    #[error("malformed side-file line {line} in {origin}: {reason}")]
    MalformedSideFile {
        /// Name of the side-file.
        origin: String,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// GPS correlation could not proceed for a device.
    #[error("GPS correlation stopped at {mac}: {reason}")]
    GpsCorrelation {
        /// Device whose timestamp could not be used.
        mac: String,
        /// Why the correlation stopped.
        reason: String,
    },
}

impl MergeError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a read error for `path`.
    #[must_use]
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a write error for `path`.
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a malformed-row error.
    #[must_use]
    pub fn malformed_row(
        group: RecordGroup,
        line: usize,
        mac: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedRow {
            group,
            line,
            mac: mac.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for malformed input of any kind.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedRow { .. }
                | Self::InvalidTimestamp { .. }
                | Self::MacParseFailed { .. }
                | Self::MalformedVendorLine { .. }
                | Self::MalformedSideFile { .. }
        )
    }

    /// The process exit status this error maps to.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Write { .. } => EXIT_IO,
            _ => EXIT_USAGE,
        }
    }
}
