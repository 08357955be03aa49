//! Error handling for the sensorvis core
//!
//! This module defines the crate-wide error type and a Result alias.
//! Fatal load conditions surface as explicit variants with human-readable
//! reasons; nothing panics across the load/aggregate boundary.

use thiserror::Error;

/// Main error type for sensorvis operations
#[derive(Error, Debug)]
pub enum SensorVisError {
    /// IO errors from the underlying file reads
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV header is missing or does not name a recognized temperature unit
    #[error("header error: {0}")]
    Header(String),

    /// A data line is provably inconsistent with the record grammar
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord {
        /// 1-based line number in the source file (line 1 is the header)
        line: usize,
        /// What the parser found instead of the expected grammar
        reason: String,
    },

    /// The stream ended in the middle of a record
    #[error("truncated input: {0}")]
    TruncatedInput(String),

    /// The configured IANA timezone name could not be parsed
    #[error("timezone error: {0}")]
    Timezone(#[from] chrono_tz::ParseError),

    /// Errors related to configuration loading/saving
    #[error("configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication with the loader worker
    #[error("channel error: {0}")]
    Channel(String),
}

/// Result type alias for sensorvis operations
pub type Result<T> = std::result::Result<T, SensorVisError>;
