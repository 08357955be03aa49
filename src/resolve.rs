//! Wall-clock to absolute time resolution
//!
//! CSV records carry naive calendar fields with no offset. Under a local
//! timezone those fields can map to two absolute instants (fall-back
//! overlap) or to none (spring-forward gap). This module turns the naive
//! fields into a single absolute time using candidate construction plus a
//! continuity tie-break against the previous sample.
//!
//! # Main Types
//! - [`TimeMode`]: UTC or a named IANA timezone
//! - [`TimeResolver`]: Stateless resolver; callers carry the previous
//!   absolute time between calls

use crate::config::AppConfig;
use crate::error::Result;
use chrono::{DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone};
use chrono_tz::Tz;

/// How naive calendar fields are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMode {
    /// Fields are already UTC; resolution is a plain conversion
    Utc,
    /// Fields are wall-clock time in this zone, DST rules included
    Local(Tz),
}

/// Resolves naive wall-clock fields to absolute Unix times.
#[derive(Debug, Clone, Copy)]
pub struct TimeResolver {
    mode: TimeMode,
    tolerance_secs: i64,
}

impl TimeResolver {
    pub fn new(mode: TimeMode, tolerance_secs: i64) -> Self {
        Self {
            mode,
            tolerance_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            config.time.time_mode()?,
            config.loader.tie_break_tolerance_secs,
        ))
    }

    pub fn mode(&self) -> TimeMode {
        self.mode
    }

    /// Resolve naive fields to an absolute time.
    ///
    /// When the zone's DST rules make the fields ambiguous (or place them
    /// in a skipped hour), two candidates are built, one per
    /// interpretation. If the zone itself settles which applies, that one
    /// wins. Otherwise the candidate within the continuity tolerance of
    /// `previous` wins; with no previous sample, or with neither candidate
    /// continuous, the daylight-saving candidate is used (an apparent
    /// overlap in the series is preferable to a coverage gap).
    pub fn resolve_absolute(&self, naive: NaiveDateTime, previous: Option<i64>) -> i64 {
        let tz = match self.mode {
            TimeMode::Utc => return naive.and_utc().timestamp(),
            TimeMode::Local(tz) => tz,
        };

        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt.timestamp(),
            // earliest instant is the one still on daylight time
            LocalResult::Ambiguous(earliest, latest) => {
                self.pick_candidate(earliest.timestamp(), latest.timestamp(), previous, naive)
            }
            LocalResult::None => {
                let (dst, std) = self.gap_candidates(tz, naive);
                self.pick_candidate(dst, std, previous, naive)
            }
        }
    }

    /// Candidates for a wall-clock time inside a spring-forward gap.
    ///
    /// Iterates the offset lookup to a fixed point from both sides of the
    /// transition; the larger offset is the daylight interpretation.
    fn gap_candidates(&self, tz: Tz, naive: NaiveDateTime) -> (i64, i64) {
        let naive_ts = naive.and_utc().timestamp();
        let first = offset_at(tz, naive_ts);
        let a = offset_at(tz, naive_ts - first);
        let b = offset_at(tz, naive_ts - a);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        (naive_ts - hi, naive_ts - lo)
    }

    fn pick_candidate(
        &self,
        dst: i64,
        std: i64,
        previous: Option<i64>,
        naive: NaiveDateTime,
    ) -> i64 {
        let Some(prev) = previous else {
            return dst;
        };
        if (dst - prev).abs() <= self.tolerance_secs {
            return dst;
        }
        if (std - prev).abs() <= self.tolerance_secs {
            return std;
        }
        tracing::warn!(
            time = %naive,
            previous = prev,
            "ambiguous wall-clock time has no candidate continuous with the previous sample; assuming daylight saving"
        );
        dst
    }

    /// Wall-clock fields of an absolute time under the current mode.
    fn to_naive(&self, time: i64) -> NaiveDateTime {
        let utc = DateTime::from_timestamp(time, 0).unwrap_or_default();
        match self.mode {
            TimeMode::Utc => utc.naive_utc(),
            TimeMode::Local(tz) => utc.with_timezone(&tz).naive_local(),
        }
    }

    /// Absolute time for naive fields, taking the earliest interpretation
    /// when the zone makes them ambiguous.
    fn from_naive_earliest(&self, naive: NaiveDateTime) -> i64 {
        let tz = match self.mode {
            TimeMode::Utc => return naive.and_utc().timestamp(),
            TimeMode::Local(tz) => tz,
        };
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt.timestamp(),
            LocalResult::Ambiguous(earliest, _) => earliest.timestamp(),
            LocalResult::None => self.gap_candidates(tz, naive).0,
        }
    }

    /// Move an absolute time to the same wall-clock date/time in
    /// `target_year`. A target of 0 is a no-op; February 29th maps to
    /// March 1st in non-leap years.
    pub fn shift_to_year(&self, time: i64, target_year: i32) -> i64 {
        if target_year == 0 {
            return time;
        }
        let naive = self.to_naive(time);
        let date = NaiveDate::from_ymd_opt(target_year, naive.month(), naive.day())
            .or_else(|| NaiveDate::from_ymd_opt(target_year, 3, 1));
        match date {
            Some(d) => self.from_naive_earliest(d.and_time(naive.time())),
            None => time,
        }
    }

    /// Calendar year an absolute time falls in under the current mode.
    pub fn year_of(&self, time: i64) -> i32 {
        self.to_naive(time).year()
    }

    /// Absolute time of January 1st, 00:00 of `year`.
    pub fn year_start(&self, year: i32) -> i64 {
        match NaiveDate::from_ymd_opt(year, 1, 1) {
            Some(d) => self.from_naive_earliest(d.and_time(NaiveTime::MIN)),
            None => i64::MIN,
        }
    }
}

fn offset_at(tz: Tz, utc_ts: i64) -> i64 {
    match DateTime::from_timestamp(utc_ts, 0) {
        Some(utc) => i64::from(
            tz.offset_from_utc_datetime(&utc.naive_utc())
                .fix()
                .local_minus_utc(),
        ),
        None => 0,
    }
}
