//! Test-data generator for the sensor log format.
//!
//! Writes minute-spaced records with a daily temperature sinusoid:
//!
//! ```text
//! gen_csv [count] [path] [timezone] [start_unix_secs]
//! ```

use anyhow::Context;
use chrono::DateTime;
use chrono_tz::Tz;
use sensorvis::types::{celsius_to_fahrenheit, MIN_PER_DAY, SEC_PER_MIN};
use std::f64::consts::TAU;
use std::io::{BufWriter, Write};
use tracing_subscriber::EnvFilter;

// 2021-01-21 00:00 UTC, just past the calibration cutoff
const DEFAULT_START: i64 = 1_611_187_200;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let count: u64 = args
        .next()
        .map(|s| s.parse())
        .transpose()
        .context("invalid record count")?
        .unwrap_or(10);
    let path = args.next().unwrap_or_else(|| "./test.csv".to_string());
    let tz: Tz = args
        .next()
        .map(|s| s.parse())
        .transpose()
        .map_err(anyhow::Error::msg)
        .context("invalid timezone")?
        .unwrap_or(chrono_tz::America::Los_Angeles);
    let start: i64 = args
        .next()
        .map(|s| s.parse())
        .transpose()
        .context("invalid start time")?
        .unwrap_or(DEFAULT_START);

    tracing::info!(count, path = %path, %tz, start, "generating");

    let file = std::fs::File::create(&path).with_context(|| format!("creating {}", path))?;
    let mut out = BufWriter::with_capacity(1024 * 1024, file);

    out.write_all("\"Timestamp\",\"Temperature (\u{b0}F)\",\"Relative Humidity (%)\"\n".as_bytes())?;

    for i in 0..count {
        let t = start + i as i64 * SEC_PER_MIN;
        let local = DateTime::from_timestamp(t, 0)
            .context("timestamp out of range")?
            .with_timezone(&tz);

        // daily cycle around 15 °C with a slow seasonal drift
        let minute_of_day = (t / SEC_PER_MIN).rem_euclid(MIN_PER_DAY) as f64;
        let daily = 10.0 * (TAU * minute_of_day / MIN_PER_DAY as f64).sin();
        let seasonal = 5.0 * (TAU * i as f64 / (MIN_PER_DAY as f64 * 365.0)).sin();
        let celsius = 15.0 + daily + seasonal;
        let humidity = 55.0 + 20.0 * (TAU * minute_of_day / MIN_PER_DAY as f64).cos();

        writeln!(
            out,
            "{},\"{:.4}\",\"{:.4}\"",
            local.format("\"%Y-%m-%d %H:%M\""),
            celsius_to_fahrenheit(celsius),
            humidity
        )?;

        if i > 0 && i % 1_000_000 == 0 {
            tracing::info!(written = i, "still generating");
        }
    }

    out.flush()?;
    tracing::info!(count, path = %path, "done");
    Ok(())
}
