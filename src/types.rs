//! Core data types shared across the crate
//!
//! # Main Types
//! - [`Sample`]: One resolved measurement (absolute time + temperature)
//! - [`CalendarFields`]: Wall-clock fields as they appear in the CSV
//! - [`TemperatureUnit`]: Unit declared by the CSV header
//! - [`SeriesStore`]: Immutable, time-ordered sample storage
//! - [`LoadProgress`]: Byte-level progress snapshot of a running load

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// Seconds per minute
pub const SEC_PER_MIN: i64 = 60;
/// Seconds per hour
pub const SEC_PER_HOUR: i64 = 3600;
/// Seconds per day
pub const SEC_PER_DAY: i64 = 86_400;
/// Minutes per day
pub const MIN_PER_DAY: i64 = 1440;

/// One measurement with its resolved absolute time.
///
/// `temperature` is always stored in Celsius; faulted readings are NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since the Unix epoch
    pub time: i64,
    /// Temperature in Celsius, NaN if the reading was rejected
    pub temperature: f64,
}

/// Wall-clock date/time fields exactly as written in a CSV record.
///
/// These are local (or UTC) fields with no offset attached; turning them
/// into an absolute time is the resolver's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl CalendarFields {
    /// Validate the fields against the real calendar.
    ///
    /// Returns `None` for impossible dates like February 30th or hour 25.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?
            .and_hms_opt(self.hour, self.minute, 0)
    }
}

impl fmt::Display for CalendarFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }
}

/// Temperature unit declared by the CSV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    /// No header has been parsed yet
    #[default]
    Unknown,
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a raw reading in this unit to Celsius.
    ///
    /// `Unknown` passes the value through; the loader never converts
    /// before the header has established a unit.
    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Fahrenheit => fahrenheit_to_celsius(value),
            _ => value,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TemperatureUnit::Unknown => "?",
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

/// Convert Celsius to Fahrenheit.
pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Convert Fahrenheit to Celsius.
pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

/// Byte-level snapshot of a load in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    /// Bytes consumed from the source so far
    pub bytes_loaded: u64,
    /// Total bytes the load will consume; equals `bytes_loaded` once the
    /// load has finished (including timeout truncation)
    pub bytes_total: u64,
}

impl LoadProgress {
    pub fn is_complete(&self) -> bool {
        self.bytes_loaded >= self.bytes_total
    }

    /// Completion fraction in `[0, 1]`; an empty source counts as done.
    pub fn fraction(&self) -> f64 {
        if self.bytes_total == 0 {
            1.0
        } else {
            self.bytes_loaded as f64 / self.bytes_total as f64
        }
    }
}

/// Immutable, time-ordered storage for a loaded series.
///
/// Constructed once by the loader and shared behind an `Arc` afterwards;
/// nothing mutates it after construction.
#[derive(Debug, Default)]
pub struct SeriesStore {
    samples: Vec<Sample>,
}

impl SeriesStore {
    pub(crate) fn from_samples(samples: Vec<Sample>) -> Self {
        debug_assert!(samples.windows(2).all(|w| w[0].time <= w[1].time));
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Covered time span in seconds, 0 for fewer than two samples.
    pub fn time_span(&self) -> i64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(a), Some(b)) => b.time - a.time,
            _ => 0,
        }
    }
}
