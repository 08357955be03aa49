//! Persistent configuration for the load pipeline
//!
//! Configuration is stored as TOML and covers the loader's acceptance
//! policy (buffer size, timeout, calibration cutoff, fault floor) and the
//! time interpretation mode (UTC or a named IANA timezone).
//!
//! # Main Types
//!
//! - [`AppConfig`] - Top-level configuration with TOML load/save
//! - [`LoaderConfig`] - Buffer sizing, timeout, and record acceptance policy
//! - [`TimeConfig`] - UTC vs. local-time resolution and the IANA zone name
//! - [`CalibrationCutoff`] - Date threshold for discarding pre-calibration data

use crate::error::{Result, SensorVisError};
use crate::resolve::TimeMode;
use crate::types::CalendarFields;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Loader policy and resource limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Size of the streaming read buffer in bytes.
    ///
    /// Also the upper bound on a single record's length; a record longer
    /// than this fails the load.
    pub read_buffer_bytes: usize,

    /// Wall-clock ceiling for a single load in seconds; loads exceeding it
    /// complete with whatever was parsed so far
    pub load_timeout_secs: u64,

    /// Continuity tolerance in seconds when disambiguating wall-clock times
    /// that map to two absolute instants
    pub tie_break_tolerance_secs: i64,

    /// Records dated at or before this cutoff are discarded as
    /// pre-calibration noise
    pub calibration_cutoff: CalibrationCutoff,

    /// Celsius readings at or below this floor are treated as sensor
    /// faults and stored as NaN
    pub fault_floor_celsius: f64,

    /// Expected spacing between consecutive records in seconds
    pub nominal_interval_secs: i64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            read_buffer_bytes: 1024 * 1024,
            load_timeout_secs: 5,
            tie_break_tolerance_secs: 65,
            calibration_cutoff: CalibrationCutoff::default(),
            fault_floor_celsius: -40.0,
            nominal_interval_secs: 60,
        }
    }
}

/// Date threshold below which records are considered pre-calibration.
///
/// A record is excluded when its year, month, and day are all at or below
/// the respective cutoff fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationCutoff {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl Default for CalibrationCutoff {
    fn default() -> Self {
        Self {
            year: 2020,
            month: 1,
            day: 20,
        }
    }
}

impl CalibrationCutoff {
    /// Whether a record with these calendar fields falls under the cutoff.
    pub fn excludes(&self, fields: &CalendarFields) -> bool {
        fields.year <= self.year && fields.month <= self.month && fields.day <= self.day
    }
}

/// How CSV wall-clock fields are mapped to absolute times
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Interpret record times in the configured timezone rather than UTC
    pub use_local_time: bool,

    /// IANA timezone name used when `use_local_time` is set
    pub timezone: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            use_local_time: true,
            timezone: "America/Los_Angeles".to_string(),
        }
    }
}

impl TimeConfig {
    /// Resolve the configured mode, parsing the IANA zone name.
    pub fn time_mode(&self) -> Result<TimeMode> {
        if self.use_local_time {
            let tz = self.timezone.parse()?;
            Ok(TimeMode::Local(tz))
        } else {
            Ok(TimeMode::Utc)
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub loader: LoaderConfig,
    pub time: TimeConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SensorVisError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SensorVisError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration as pretty TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SensorVisError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| SensorVisError::Config(format!("Failed to write config: {}", e)))
    }
}
