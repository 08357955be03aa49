//! View-driven bucketed aggregation
//!
//! Reduces the full sample series to a bounded number of per-bucket
//! (center, avg, min, max) bars for the visible window. Bucket width
//! adapts to the zoom level and pixel budget so the output stays small no
//! matter how many samples are loaded; results are cached against a view
//! fingerprint and recomputed only when the view actually changes.
//!
//! # Main Types
//! - [`ViewFingerprint`]: The view parameters a summary depends on
//! - [`Summary`]: Four equal-length arrays, one element per bucket
//! - [`BucketAggregator`]: Fingerprint-gated cache over [`compute_summary`]
//! - [`YearlyCompare`]: Per-year summaries shifted onto a shared axis

use crate::resolve::TimeResolver;
use crate::types::{celsius_to_fahrenheit, Sample, SeriesStore, SEC_PER_MIN};
use std::collections::BTreeMap;

/// Reference year all series are shifted to in compare mode. A leap year,
/// so February 29th data keeps a home.
pub const COMPARE_REFERENCE_YEAR: i32 = 2000;

/// Half the nominal sampling interval; bucket centers are offset by this
/// so a bucket's bar sits over the minutes it covers.
const CENTER_OFFSET: f64 = 30.0;

/// Everything a bucketed summary depends on. Two equal fingerprints
/// always produce the same summary for the same store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFingerprint {
    /// Emit values in Celsius (false: Fahrenheit)
    pub use_celsius: bool,
    /// Left edge of the visible window, seconds
    pub window_lo: f64,
    /// Right edge of the visible window, seconds
    pub window_hi: f64,
    /// Horizontal pixel budget of the view
    pub pixel_width: f64,
    /// Bucket width in seconds, usually from [`bucket_width_for`]
    pub bucket_width: f64,
}

/// Display-ready aggregation output. All four vectors share one length,
/// one element per bucket across the covered range; buckets without any
/// finite sample hold NaN in `avg`/`min`/`max` so bars and gaps stay
/// index-aligned with `centers`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub centers: Vec<f64>,
    pub avg: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl Summary {
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}

/// Bucket width for a window of `visible_secs` seconds rendered into
/// `pixel_width` pixels: whole minutes per pixel, scaled, floored at one
/// minute.
pub fn bucket_width_for(visible_secs: f64, pixel_width: f64, density_scale: f64) -> f64 {
    let minutes_per_pixel = (visible_secs / 60.0 / pixel_width.max(1.0)).ceil();
    (minutes_per_pixel * density_scale).max(1.0) * SEC_PER_MIN as f64
}

fn bucket_of(time: f64, width: f64) -> i64 {
    (time / width).floor() as i64
}

/// Aggregate `samples` into per-bucket bars for the window described by
/// `view`.
///
/// A non-zero `target_year` moves every sample to that year's calendar
/// before bucketing (compare mode); callers must then pass a slice that
/// spans a single calendar year so shifted times stay sorted. NaN samples
/// occupy their bucket but never contribute to the aggregates.
pub fn compute_summary(
    samples: &[Sample],
    view: &ViewFingerprint,
    target_year: i32,
    resolver: &TimeResolver,
) -> Summary {
    let width = view.bucket_width.max(1.0);
    let shifted = |s: &Sample| resolver.shift_to_year(s.time, target_year) as f64;

    // one bucket of slack on both sides keeps edge bars stable while
    // panning
    let lo = view.window_lo - width;
    let hi = view.window_hi + width;
    let start = samples.partition_point(|s| shifted(s) < lo);
    let end = start + samples[start..].partition_point(|s| shifted(s) <= hi);
    if start >= end {
        return Summary::default();
    }

    let first_bucket = bucket_of(shifted(&samples[start]), width);
    let last_bucket = bucket_of(shifted(&samples[end - 1]), width);
    let n = (last_bucket - first_bucket + 1) as usize;

    let mut out = Summary {
        centers: Vec::with_capacity(n),
        avg: Vec::with_capacity(n),
        min: Vec::with_capacity(n),
        max: Vec::with_capacity(n),
    };

    let convert = |v: f64| {
        if view.use_celsius {
            v
        } else {
            celsius_to_fahrenheit(v)
        }
    };

    let mut idx = start;
    for bucket in first_bucket..=last_bucket {
        out.centers
            .push((bucket as f64 + 0.5) * width - CENTER_OFFSET);

        let mut sum = 0.0;
        let mut count = 0u32;
        let mut lowest = f64::INFINITY;
        let mut highest = f64::NEG_INFINITY;
        while idx < end && bucket_of(shifted(&samples[idx]), width) == bucket {
            let value = samples[idx].temperature;
            if value.is_finite() {
                sum += value;
                count += 1;
                lowest = lowest.min(value);
                highest = highest.max(value);
            }
            idx += 1;
        }

        if count > 0 {
            out.avg.push(convert(sum / f64::from(count)));
            out.min.push(convert(lowest));
            out.max.push(convert(highest));
        } else {
            out.avg.push(f64::NAN);
            out.min.push(f64::NAN);
            out.max.push(f64::NAN);
        }
    }

    out
}

/// Caches one [`Summary`] against the view fingerprint that produced it.
#[derive(Debug)]
pub struct BucketAggregator {
    resolver: TimeResolver,
    fingerprint: Option<ViewFingerprint>,
    summary: Summary,
    recomputes: u64,
}

impl BucketAggregator {
    pub fn new(resolver: TimeResolver) -> Self {
        Self {
            resolver,
            fingerprint: None,
            summary: Summary::default(),
            recomputes: 0,
        }
    }

    /// Summary for the given view, recomputed only when `view` differs
    /// from the cached fingerprint.
    pub fn summary(&mut self, store: &SeriesStore, view: ViewFingerprint) -> &Summary {
        if self.fingerprint != Some(view) {
            self.summary = compute_summary(store.samples(), &view, 0, &self.resolver);
            self.fingerprint = Some(view);
            self.recomputes += 1;
            tracing::trace!(buckets = self.summary.len(), "summary recomputed");
        }
        &self.summary
    }

    /// Drop the cached result, forcing the next call to recompute. Needed
    /// when the store itself is replaced.
    pub fn invalidate(&mut self) {
        self.fingerprint = None;
    }

    /// How many times a summary has actually been computed.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }
}

/// Per-year summaries shifted onto the [`COMPARE_REFERENCE_YEAR`] axis so
/// several years can be drawn over each other.
#[derive(Debug)]
pub struct YearlyCompare {
    resolver: TimeResolver,
    fingerprint: Option<ViewFingerprint>,
    summaries: BTreeMap<i32, Summary>,
    recomputes: u64,
}

impl YearlyCompare {
    pub fn new(resolver: TimeResolver) -> Self {
        Self {
            resolver,
            fingerprint: None,
            summaries: BTreeMap::new(),
            recomputes: 0,
        }
    }

    /// One summary per calendar year present in the store, keyed by the
    /// source year, each shifted to the reference year's calendar.
    pub fn summaries(
        &mut self,
        store: &SeriesStore,
        view: ViewFingerprint,
    ) -> &BTreeMap<i32, Summary> {
        if self.fingerprint != Some(view) {
            self.summaries = self.compute(store, &view);
            self.fingerprint = Some(view);
            self.recomputes += 1;
        }
        &self.summaries
    }

    pub fn invalidate(&mut self) {
        self.fingerprint = None;
    }

    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    fn compute(&self, store: &SeriesStore, view: &ViewFingerprint) -> BTreeMap<i32, Summary> {
        let mut out = BTreeMap::new();
        let samples = store.samples();
        let (Some(first), Some(last)) = (store.first(), store.last()) else {
            return out;
        };

        let first_year = self.resolver.year_of(first.time);
        let last_year = self.resolver.year_of(last.time);
        let mut start = 0usize;
        for year in first_year..=last_year {
            let next_year_start = self.resolver.year_start(year + 1);
            let end = start + samples[start..].partition_point(|s| s.time < next_year_start);
            if end > start {
                let summary = compute_summary(
                    &samples[start..end],
                    view,
                    COMPARE_REFERENCE_YEAR,
                    &self.resolver,
                );
                if !summary.is_empty() {
                    out.insert(year, summary);
                }
            }
            start = end;
        }
        out
    }
}
