//! Streaming CSV line parser
//!
//! Stateless byte-window parsing for the sensor log format: a fixed quoted
//! header naming the temperature unit, followed by minute-stamped records
//! `"YYYY-MM-DD HH:MM","±DDD.DDDD","DDD.DDDD"`.
//!
//! The parser never performs I/O. Each function inspects one byte window
//! and reports a tri-state outcome:
//!
//! - `Complete` with the parsed value and the exact byte count consumed
//! - `NeedMore` when the window ends before the line can resolve; the
//!   caller must append more bytes and retry
//! - `Malformed` when the bytes present already contradict the grammar
//!
//! `NeedMore` is never proof of corruption; splitting the same bytes at
//! any boundary across two windows yields identical results.
//!
//! # Main Types
//! - [`ParseOutcome`]: Tri-state result of one parse attempt
//! - [`RawRecord`]: One data line before time resolution

use crate::types::{CalendarFields, TemperatureUnit};

/// Longest digit run accepted inside a numeric field. Anything longer is
/// corrupt input, not a record still streaming in.
const MAX_NUMBER_DIGITS: usize = 9;

const HEADER_PREFIX: &[u8] = "\"Timestamp\",\"Temperature (\u{b0}".as_bytes();
const HEADER_SUFFIX: &[u8] = b")\",\"Relative Humidity (%)\"";

/// Result of one parse attempt against a byte window.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// One full line was recognized; `consumed` bytes belong to it
    Complete { value: T, consumed: usize },
    /// The window ended before the line could resolve either way
    NeedMore,
    /// The bytes present are provably inconsistent with the grammar
    Malformed(String),
}

/// One parsed data line, still carrying raw wall-clock fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRecord {
    pub fields: CalendarFields,
    /// Temperature in the unit declared by the header
    pub temperature: f64,
    pub humidity: f64,
}

enum Fail {
    NeedMore,
    Malformed(String),
}

type Step<T> = std::result::Result<T, Fail>;

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Step<()> {
        match self.peek() {
            None => Err(Fail::NeedMore),
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(Fail::Malformed(format!(
                "expected '{}', found '{}'",
                byte.escape_ascii(),
                b.escape_ascii()
            ))),
        }
    }

    fn expect_slice(&mut self, expected: &[u8]) -> Step<()> {
        for &byte in expected {
            self.expect(byte)?;
        }
        Ok(())
    }

    /// Exactly `n` ASCII digits, as an unsigned value.
    fn fixed_digits(&mut self, n: usize, what: &str) -> Step<u32> {
        let mut value: u32 = 0;
        for _ in 0..n {
            match self.peek() {
                None => return Err(Fail::NeedMore),
                Some(b @ b'0'..=b'9') => {
                    value = value * 10 + u32::from(b - b'0');
                    self.pos += 1;
                }
                Some(b) => {
                    return Err(Fail::Malformed(format!(
                        "expected digit in {}, found '{}'",
                        what,
                        b.escape_ascii()
                    )))
                }
            }
        }
        Ok(value)
    }

    /// At least one digit, stopping at the first non-digit. Reaching the
    /// end of the window mid-run is `NeedMore`: more digits may follow.
    fn digit_run(&mut self, what: &str) -> Step<(u64, u32)> {
        let mut value: u64 = 0;
        let mut count: u32 = 0;
        loop {
            match self.peek() {
                None => return Err(Fail::NeedMore),
                Some(b @ b'0'..=b'9') => {
                    if count as usize >= MAX_NUMBER_DIGITS {
                        return Err(Fail::Malformed(format!("{} has too many digits", what)));
                    }
                    value = value * 10 + u64::from(b - b'0');
                    count += 1;
                    self.pos += 1;
                }
                Some(_) if count == 0 => {
                    return Err(Fail::Malformed(format!("expected digit in {}", what)))
                }
                Some(_) => return Ok((value, count)),
            }
        }
    }

    /// Plain decimal number: optional leading '-' (temperature only),
    /// integer digits, optional '.' and fraction digits. No exponents.
    fn decimal(&mut self, allow_sign: bool, what: &str) -> Step<f64> {
        let negative = if allow_sign && self.peek() == Some(b'-') {
            self.pos += 1;
            true
        } else {
            false
        };

        let (int_part, _) = self.digit_run(what)?;
        let mut value = int_part as f64;

        if self.peek() == Some(b'.') {
            self.pos += 1;
            let (frac, digits) = self.digit_run(what)?;
            value += frac as f64 / 10f64.powi(digits as i32);
        }

        Ok(if negative { -value } else { value })
    }

    /// Optional '\r' followed by a mandatory '\n'.
    fn line_end(&mut self) -> Step<()> {
        if self.peek() == Some(b'\r') {
            self.pos += 1;
        }
        self.expect(b'\n')
    }
}

fn finish<T>(value: T, cursor: Cursor<'_>) -> ParseOutcome<T> {
    ParseOutcome::Complete {
        value,
        consumed: cursor.pos,
    }
}

fn fail<T>(fail: Fail) -> ParseOutcome<T> {
    match fail {
        Fail::NeedMore => ParseOutcome::NeedMore,
        Fail::Malformed(reason) => ParseOutcome::Malformed(reason),
    }
}

/// Attempt to consume the header line from the front of `window`.
///
/// Recognizes the fixed column labels and extracts the temperature unit
/// letter (C or F, case-insensitive). A window that already holds a full
/// line that is not this header is `Malformed`; the loader treats that as
/// fatal rather than retryable.
pub fn parse_header(window: &[u8]) -> ParseOutcome<TemperatureUnit> {
    let mut cur = Cursor::new(window);
    match parse_header_inner(&mut cur) {
        Ok(unit) => finish(unit, cur),
        Err(e) => fail(e),
    }
}

fn parse_header_inner(cur: &mut Cursor<'_>) -> Step<TemperatureUnit> {
    cur.expect_slice(HEADER_PREFIX)?;
    let unit = match cur.peek() {
        None => return Err(Fail::NeedMore),
        Some(b'C') | Some(b'c') => TemperatureUnit::Celsius,
        Some(b'F') | Some(b'f') => TemperatureUnit::Fahrenheit,
        Some(b) => {
            return Err(Fail::Malformed(format!(
                "unrecognized temperature unit '{}'",
                b.escape_ascii()
            )))
        }
    };
    cur.pos += 1;
    cur.expect_slice(HEADER_SUFFIX)?;
    cur.line_end()?;
    Ok(unit)
}

/// Attempt to consume one data record from the front of `window`.
///
/// The calendar fields are validated against the real calendar here, so a
/// `Complete` record always converts to a `NaiveDateTime`.
pub fn parse_record(window: &[u8]) -> ParseOutcome<RawRecord> {
    let mut cur = Cursor::new(window);
    match parse_record_inner(&mut cur) {
        Ok(record) => finish(record, cur),
        Err(e) => fail(e),
    }
}

fn parse_record_inner(cur: &mut Cursor<'_>) -> Step<RawRecord> {
    cur.expect(b'"')?;
    let year = cur.fixed_digits(4, "year")? as i32;
    cur.expect(b'-')?;
    let month = cur.fixed_digits(2, "month")?;
    cur.expect(b'-')?;
    let day = cur.fixed_digits(2, "day")?;
    cur.expect(b' ')?;
    let hour = cur.fixed_digits(2, "hour")?;
    cur.expect(b':')?;
    let minute = cur.fixed_digits(2, "minute")?;
    cur.expect_slice(b"\",\"")?;
    let temperature = cur.decimal(true, "temperature")?;
    cur.expect_slice(b"\",\"")?;
    let humidity = cur.decimal(false, "humidity")?;
    cur.expect(b'"')?;
    cur.line_end()?;

    let fields = CalendarFields {
        year,
        month,
        day,
        hour,
        minute,
    };
    if fields.to_naive().is_none() {
        return Err(Fail::Malformed(format!("impossible date/time {}", fields)));
    }

    Ok(RawRecord {
        fields,
        temperature,
        humidity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HEADER_C: &[u8] = "\"Timestamp\",\"Temperature (\u{b0}C)\",\"Relative Humidity (%)\"\n"
        .as_bytes();
    const RECORD: &[u8] = b"\"2021-03-07 09:05\",\"17.5000\",\"45.2000\"\n";

    fn complete<T: Clone>(outcome: &ParseOutcome<T>) -> (T, usize) {
        match outcome {
            ParseOutcome::Complete { value, consumed } => (value.clone(), *consumed),
            other => panic!("expected Complete, got {:?}", std::mem::discriminant(other)),
        }
    }

    #[test]
    fn test_header_celsius() {
        let (unit, consumed) = complete(&parse_header(HEADER_C));
        assert_eq!(unit, TemperatureUnit::Celsius);
        assert_eq!(consumed, HEADER_C.len());
    }

    #[test]
    fn test_header_fahrenheit_lowercase() {
        let line = "\"Timestamp\",\"Temperature (\u{b0}f)\",\"Relative Humidity (%)\"\r\n";
        let (unit, consumed) = complete(&parse_header(line.as_bytes()));
        assert_eq!(unit, TemperatureUnit::Fahrenheit);
        assert_eq!(consumed, line.len());
    }

    #[test]
    fn test_header_unknown_unit() {
        let line = "\"Timestamp\",\"Temperature (\u{b0}K)\",\"Relative Humidity (%)\"\n";
        assert!(matches!(
            parse_header(line.as_bytes()),
            ParseOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_header_needs_more_on_every_prefix() {
        for cut in 0..HEADER_C.len() {
            assert_eq!(
                parse_header(&HEADER_C[..cut]),
                ParseOutcome::NeedMore,
                "cut at {}",
                cut
            );
        }
    }

    #[test]
    fn test_record_basic() {
        let (record, consumed) = complete(&parse_record(RECORD));
        assert_eq!(consumed, RECORD.len());
        assert_eq!(record.fields.to_string(), "2021-03-07 09:05");
        assert_eq!(record.temperature, 17.5);
        assert_eq!(record.humidity, 45.2);
    }

    #[test]
    fn test_record_negative_temperature() {
        let line = b"\"2021-01-02 00:00\",\"-12.2500\",\"80.0000\"\n";
        let (record, _) = complete(&parse_record(line.as_slice()));
        assert_eq!(record.temperature, -12.25);
    }

    #[test]
    fn test_record_negative_humidity_rejected() {
        let line = b"\"2021-01-02 00:00\",\"12.2500\",\"-80.0000\"\n";
        assert!(matches!(
            parse_record(line.as_slice()),
            ParseOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_record_crlf() {
        let line = b"\"2021-03-07 09:05\",\"17.5000\",\"45.2000\"\r\n";
        let (_, consumed) = complete(&parse_record(line.as_slice()));
        assert_eq!(consumed, line.len());
    }

    #[test]
    fn test_record_consumes_only_one_line() {
        let mut two = RECORD.to_vec();
        two.extend_from_slice(b"\"2021-03-07 09:06\",\"17.6000\",\"45.0000\"\n");
        let (_, consumed) = complete(&parse_record(&two));
        assert_eq!(consumed, RECORD.len());

        let (second, consumed2) = complete(&parse_record(&two[consumed..]));
        assert_eq!(second.fields.minute, 6);
        assert_eq!(consumed + consumed2, two.len());
    }

    #[test]
    fn test_record_needs_more_on_every_prefix() {
        for cut in 0..RECORD.len() {
            assert_eq!(
                parse_record(&RECORD[..cut]),
                ParseOutcome::NeedMore,
                "cut at {}",
                cut
            );
        }
    }

    #[test]
    fn test_record_impossible_date() {
        let line = b"\"2021-02-30 09:05\",\"17.5000\",\"45.2000\"\n";
        assert!(matches!(
            parse_record(line.as_slice()),
            ParseOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_record_garbage_line() {
        let line = b"not,a,record\n";
        assert!(matches!(
            parse_record(line.as_slice()),
            ParseOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_record_rejects_scientific_notation() {
        let line = b"\"2021-03-07 09:05\",\"1.7e1\",\"45.2000\"\n";
        assert!(matches!(
            parse_record(line.as_slice()),
            ParseOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_record_rejects_digit_flood() {
        let line = b"\"2021-03-07 09:05\",\"17.500000000000000\",\"45.2000\"\n";
        assert!(matches!(
            parse_record(line.as_slice()),
            ParseOutcome::Malformed(_)
        ));
    }

    proptest! {
        #[test]
        fn prop_record_roundtrip_any_split(
            year in 1990i32..2100,
            month in 1u32..=12,
            day in 1u32..=28,
            hour in 0u32..24,
            minute in 0u32..60,
            temp_milli in -90_000i64..150_000,
            hum_milli in 0i64..100_000,
        ) {
            let temperature = temp_milli as f64 / 1000.0;
            let humidity = hum_milli as f64 / 1000.0;
            let line = format!(
                "\"{:04}-{:02}-{:02} {:02}:{:02}\",\"{:.4}\",\"{:.4}\"\n",
                year, month, day, hour, minute, temperature, humidity
            );
            let bytes = line.as_bytes();

            let (full, consumed) = match parse_record(bytes) {
                ParseOutcome::Complete { value, consumed } => (value, consumed),
                other => panic!("unexpected outcome {:?}", other),
            };
            prop_assert_eq!(consumed, bytes.len());
            prop_assert_eq!(full.fields.year, year);
            prop_assert!((full.temperature - temperature).abs() < 1e-4);
            prop_assert!((full.humidity - humidity).abs() < 1e-4);

            // every prefix must be NeedMore, never Malformed
            for cut in 0..bytes.len() {
                prop_assert_eq!(parse_record(&bytes[..cut]), ParseOutcome::NeedMore);
            }
        }
    }
}
