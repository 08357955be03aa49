//! # SensorVis: Sensor Log Data Core
//!
//! The data-handling core of an interactive temperature-log viewer. It
//! streams minute-resolution CSV sensor logs through a fixed-size buffer,
//! resolves naive local timestamps across daylight-saving transitions,
//! and reduces the resulting series into display-ready aggregates.
//!
//! ## Architecture
//!
//! - **Loader**: Streams and parses the CSV on a worker thread, publishing
//!   byte progress and honoring cooperative cancellation
//! - **Parser**: Stateless tri-state line parsing over byte windows
//! - **Resolver**: Wall-clock to absolute time with continuity tie-breaks
//! - **Aggregation**: View-fingerprinted bucketed bars and a time-of-day
//!   distribution histogram
//!
//! ## Example
//!
//! ```ignore
//! use sensorvis::{
//!     aggregate::{bucket_width_for, BucketAggregator, ViewFingerprint},
//!     config::AppConfig,
//!     loader::{load_file, LoadOutcome},
//!     resolve::TimeResolver,
//! };
//!
//! fn main() -> sensorvis::Result<()> {
//!     let config = AppConfig::load_or_default("sensorvis.toml");
//!     let handle = load_file("temperature.csv", &config)?;
//!
//!     // poll handle.progress() from the refresh loop, then:
//!     let store = match handle.join()? {
//!         LoadOutcome::Completed(store) | LoadOutcome::Aborted(store) => store,
//!     };
//!
//!     let resolver = TimeResolver::from_config(&config)?;
//!     let mut aggregator = BucketAggregator::new(resolver);
//!     let view = ViewFingerprint {
//!         use_celsius: true,
//!         window_lo: store.first().map_or(0.0, |s| s.time as f64),
//!         window_hi: store.last().map_or(0.0, |s| s.time as f64),
//!         pixel_width: 800.0,
//!         bucket_width: bucket_width_for(store.time_span() as f64, 800.0, 1.0),
//!     };
//!     let summary = aggregator.summary(&store, view);
//!     println!("{} buckets", summary.len());
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod histogram;
pub mod loader;
pub mod parser;
pub mod resolve;
pub mod types;

// Re-export commonly used types
pub use aggregate::{BucketAggregator, Summary, ViewFingerprint, YearlyCompare};
pub use config::{AppConfig, LoaderConfig, TimeConfig};
pub use error::{Result, SensorVisError};
pub use histogram::{Histogram, HistogramBinner, HistogramFingerprint};
pub use loader::{load_file, load_file_blocking, LoadOutcome, LoaderHandle};
pub use parser::{ParseOutcome, RawRecord};
pub use resolve::{TimeMode, TimeResolver};
pub use types::{LoadProgress, Sample, SeriesStore, TemperatureUnit};
