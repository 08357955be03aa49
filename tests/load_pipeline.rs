//! End-to-end pipeline tests: generate a CSV, load it through the worker
//! thread, and run the aggregation stages over the frozen store.

use chrono::DateTime;
use chrono_tz::America::Los_Angeles;
use sensorvis::{
    aggregate::{bucket_width_for, BucketAggregator, ViewFingerprint, YearlyCompare},
    config::AppConfig,
    histogram::{snap_bins_x, HistogramBinner, HistogramFingerprint},
    loader::{load_file, LoadOutcome},
    resolve::TimeResolver,
    types::SeriesStore,
};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const HEADER_C: &str = "\"Timestamp\",\"Temperature (\u{b0}C)\",\"Relative Humidity (%)\"\n";

/// Minute-spaced records whose wall-clock stamps come from formatting
/// absolute times in Los Angeles, the way the real sensor writes them.
fn la_file(start_utc: i64, minutes: i64) -> (NamedTempFile, Vec<i64>) {
    let mut content = String::from(HEADER_C);
    let mut times = Vec::new();
    for i in 0..minutes {
        let t = start_utc + i * 60;
        times.push(t);
        let local = DateTime::from_timestamp(t, 0)
            .unwrap()
            .with_timezone(&Los_Angeles);
        let temp = 15.0 + 5.0 * (i as f64 / 30.0).sin();
        content.push_str(&format!(
            "{},\"{:.4}\",\"50.0000\"\n",
            local.format("\"%Y-%m-%d %H:%M\""),
            temp
        ));
    }
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    (file, times)
}

fn local_config() -> AppConfig {
    AppConfig::default()
}

fn load(file: &NamedTempFile, config: &AppConfig) -> Arc<SeriesStore> {
    match load_file(file.path(), config).unwrap().join().unwrap() {
        LoadOutcome::Completed(store) => store,
        LoadOutcome::Aborted(_) => panic!("load unexpectedly aborted"),
    }
}

#[test]
fn fall_back_transition_reconstructs_absolute_times() {
    // 01:00 PDT on 2021-11-07; the 01:xx wall-clock hour repeats
    let start = 1_636_272_000;
    let (file, times) = la_file(start, 180);
    let store = load(&file, &local_config());

    assert_eq!(store.len(), times.len());
    for (sample, expected) in store.samples().iter().zip(&times) {
        assert_eq!(sample.time, *expected);
    }
}

#[test]
fn spring_forward_transition_reconstructs_absolute_times() {
    // 01:30 PST on 2021-03-14; wall clock jumps 01:59 -> 03:00
    let start = 1_615_714_200;
    let (file, times) = la_file(start, 120);
    let store = load(&file, &local_config());

    assert_eq!(store.len(), times.len());
    for (sample, expected) in store.samples().iter().zip(&times) {
        assert_eq!(sample.time, *expected);
    }
    // the absolute series is strictly increasing by the nominal interval
    for pair in store.samples().windows(2) {
        assert_eq!(pair[1].time - pair[0].time, 60);
    }
}

#[test]
fn aggregation_over_loaded_store_is_bounded_and_stable() {
    let start = 1_620_000_000; // May 2021, no transition nearby
    let (file, _) = la_file(start, 24 * 60);
    let config = local_config();
    let store = load(&file, &config);

    let resolver = TimeResolver::from_config(&config).unwrap();
    let mut aggregator = BucketAggregator::new(resolver);

    let pixel_width = 800.0;
    let lo = store.first().unwrap().time as f64;
    let hi = store.last().unwrap().time as f64;
    let view = ViewFingerprint {
        use_celsius: true,
        window_lo: lo,
        window_hi: hi,
        pixel_width,
        bucket_width: bucket_width_for(hi - lo, pixel_width, 1.0),
    };

    let summary = aggregator.summary(&store, view).clone();
    assert!(!summary.is_empty());
    // bucket count stays within the pixel budget plus edge slack
    assert!(summary.len() as f64 <= pixel_width + 2.0);
    assert_eq!(summary.centers.len(), summary.avg.len());
    assert_eq!(summary.centers.len(), summary.min.len());
    assert_eq!(summary.centers.len(), summary.max.len());
    for i in 0..summary.len() {
        if summary.avg[i].is_finite() {
            assert!(summary.min[i] <= summary.avg[i]);
            assert!(summary.avg[i] <= summary.max[i]);
        }
    }

    // a second refresh with the same view reuses the cache
    aggregator.summary(&store, view);
    assert_eq!(aggregator.recompute_count(), 1);
}

#[test]
fn histogram_over_loaded_store_counts_every_sample() {
    let start = 1_620_000_000;
    let (file, _) = la_file(start, 24 * 60);
    let store = load(&file, &local_config());

    let mut binner = HistogramBinner::new();
    let fp = HistogramFingerprint {
        time_range: [i64::MIN, i64::MAX],
        day_offset: 0,
        bins_x: snap_bins_x(24),
        bins_y: 16,
    };
    let histogram = binner.histogram(&store, fp);

    assert_eq!(histogram.total(), store.len() as u64);
    let (lowest, highest) = histogram.value_range.unwrap();
    assert!(lowest >= 10.0 && highest <= 20.0);
    assert!(histogram.max_count >= 1);
}

#[test]
fn yearly_compare_over_two_years() {
    // Samples in June 2020 and June 2021 at the same wall-clock hour
    let mut content = String::from(HEADER_C);
    for (start, value) in [(1_591_038_000i64, 10.0), (1_622_574_000i64, 20.0)] {
        for i in 0..60 {
            let local = DateTime::from_timestamp(start + i * 60, 0)
                .unwrap()
                .with_timezone(&Los_Angeles);
            content.push_str(&format!(
                "{},\"{:.4}\",\"50.0000\"\n",
                local.format("\"%Y-%m-%d %H:%M\""),
                value
            ));
        }
    }
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();

    let config = local_config();
    let store = load(&file, &config);
    let resolver = TimeResolver::from_config(&config).unwrap();
    let mut compare = YearlyCompare::new(resolver);

    let view = ViewFingerprint {
        use_celsius: true,
        window_lo: f64::MIN,
        window_hi: f64::MAX,
        pixel_width: 800.0,
        bucket_width: 3600.0,
    };
    let summaries = compare.summaries(&store, view);
    assert_eq!(summaries.keys().copied().collect::<Vec<_>>(), vec![2020, 2021]);
    for summary in summaries.values() {
        assert!(!summary.is_empty());
    }
}

#[test]
fn progress_is_observable_while_loading() {
    let (file, _) = la_file(1_620_000_000, 500);
    let mut handle = load_file(file.path(), &local_config()).unwrap();

    let outcome = loop {
        let progress = handle.progress();
        assert!(progress.bytes_loaded <= progress.bytes_total);
        if let Some(result) = handle.try_join() {
            break result.unwrap();
        }
        std::thread::yield_now();
    };

    assert!(handle.progress().is_complete());
    assert_eq!(outcome.store().len(), 500);
}
