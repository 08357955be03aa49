//! Time-of-day distribution histogram
//!
//! Bins samples into a 2D grid of time-of-day columns by temperature
//! rows. The value axis is inverted (hottest row first) to match a
//! top-to-bottom display; the grid, its maximum cell count, and the
//! observed value range are cached against a fingerprint like the
//! bucketed summary.
//!
//! # Main Types
//! - [`HistogramFingerprint`]: Range, day offset, and bin counts
//! - [`Histogram`]: Row-major count grid plus value range and peak count
//! - [`HistogramBinner`]: Fingerprint-gated cache over [`compute_histogram`]

use crate::types::{Sample, SeriesStore, SEC_PER_DAY};

/// Time-of-day bin counts that divide the day into whole minutes.
const BINS_X_DIVISORS: [usize; 36] = [
    1, 2, 3, 4, 5, 6, 8, 9, 10, 12, 15, 16, 18, 20, 24, 30, 32, 36, 40, 45, 48, 60, 72, 80, 90,
    96, 120, 144, 160, 180, 240, 288, 360, 480, 720, 1440,
];

/// Everything a histogram depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramFingerprint {
    /// Inclusive absolute-time range filter `[start, end]`
    pub time_range: [i64; 2],
    /// Seconds subtracted before folding into a day, so columns align
    /// with local midnight
    pub day_offset: i64,
    /// Time-of-day columns; must divide the minutes of a day evenly, see
    /// [`snap_bins_x`]
    pub bins_x: usize,
    /// Temperature rows
    pub bins_y: usize,
}

/// Binned distribution output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    /// Row-major `bins_y * bins_x` counts, row 0 holding the highest
    /// temperatures
    pub grid: Vec<u32>,
    /// Largest single cell count, for color scaling
    pub max_count: u32,
    /// (min, max) finite temperature over the filtered samples, `None`
    /// when nothing finite is in range
    pub value_range: Option<(f64, f64)>,
    pub bins_x: usize,
    pub bins_y: usize,
}

impl Histogram {
    pub fn count_at(&self, bin_x: usize, bin_y: usize) -> u32 {
        self.grid[bin_y * self.bins_x + bin_x]
    }

    /// Total samples binned.
    pub fn total(&self) -> u64 {
        self.grid.iter().map(|&c| u64::from(c)).sum()
    }
}

/// Snap a requested column count to the nearest value that divides the
/// day into whole minutes. Ties resolve to the smaller count.
pub fn snap_bins_x(requested: usize) -> usize {
    let mut best = BINS_X_DIVISORS[0];
    let mut best_dist = usize::MAX;
    for &candidate in &BINS_X_DIVISORS {
        let dist = candidate.abs_diff(requested);
        if dist < best_dist {
            best = candidate;
            best_dist = dist;
        }
    }
    best
}

/// Bin the samples whose time falls inside the fingerprint's range.
///
/// The first pass finds the finite value range over the filtered subset;
/// the second assigns each finite sample to a time-of-day column and an
/// inverted temperature row. NaN samples are never binned.
pub fn compute_histogram(samples: &[Sample], fp: &HistogramFingerprint) -> Histogram {
    let bins_x = fp.bins_x.max(1);
    let bins_y = fp.bins_y.max(1);

    let start = samples.partition_point(|s| s.time < fp.time_range[0]);
    let end = start + samples[start..].partition_point(|s| s.time <= fp.time_range[1]);
    let in_range = &samples[start..end];

    let mut lowest = f64::INFINITY;
    let mut highest = f64::NEG_INFINITY;
    for s in in_range {
        if s.temperature.is_finite() {
            lowest = lowest.min(s.temperature);
            highest = highest.max(s.temperature);
        }
    }

    let mut out = Histogram {
        grid: vec![0; bins_x * bins_y],
        max_count: 0,
        value_range: None,
        bins_x,
        bins_y,
    };
    if lowest > highest {
        return out;
    }
    out.value_range = Some((lowest, highest));

    let span = highest - lowest;
    // a column count beyond the seconds of a day degenerates to 1s columns
    let bucket_secs = (SEC_PER_DAY / bins_x as i64).max(1);
    for s in in_range {
        if !s.temperature.is_finite() {
            continue;
        }
        let time_of_day = (s.time - fp.day_offset).rem_euclid(SEC_PER_DAY);
        let bin_x = ((time_of_day / bucket_secs) as usize).min(bins_x - 1);
        // inverted so the hottest samples land in row 0
        let bin_y = if span == 0.0 {
            0
        } else {
            (((highest - s.temperature) * bins_y as f64 / span).floor() as usize).min(bins_y - 1)
        };

        let cell = &mut out.grid[bin_y * bins_x + bin_x];
        *cell += 1;
        out.max_count = out.max_count.max(*cell);
    }
    out
}

/// Caches one [`Histogram`] against the fingerprint that produced it.
#[derive(Debug, Default)]
pub struct HistogramBinner {
    fingerprint: Option<HistogramFingerprint>,
    histogram: Histogram,
    recomputes: u64,
}

impl HistogramBinner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Histogram for the given fingerprint, recomputed only on change.
    pub fn histogram(&mut self, store: &SeriesStore, fp: HistogramFingerprint) -> &Histogram {
        if self.fingerprint != Some(fp) {
            self.histogram = compute_histogram(store.samples(), &fp);
            self.fingerprint = Some(fp);
            self.recomputes += 1;
            tracing::trace!(
                total = self.histogram.total(),
                max_count = self.histogram.max_count,
                "histogram recomputed"
            );
        }
        &self.histogram
    }

    pub fn invalidate(&mut self) {
        self.fingerprint = None;
    }

    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }
}
