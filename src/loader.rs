//! Streaming file loader with a background worker thread
//!
//! The loader reads the CSV source through a fixed-size buffer, feeding
//! the parser one window at a time and compacting unconsumed tail bytes to
//! the front between reads. Memory stays bounded regardless of file size;
//! a single record longer than the buffer fails the load.
//!
//! Loading runs on a dedicated worker thread. The caller keeps a
//! [`LoaderHandle`] to poll byte progress, request cancellation, and
//! collect the frozen [`SeriesStore`] when the worker finishes. A load
//! that exceeds the configured wall-clock ceiling completes with whatever
//! was parsed so far rather than failing.
//!
//! # Main Types
//! - [`LoaderHandle`]: Caller-side handle to a running load
//! - [`LoadOutcome`]: Completed (possibly truncated) or aborted result

use crate::config::{AppConfig, LoaderConfig};
use crate::error::{Result, SensorVisError};
use crate::parser::{self, ParseOutcome, RawRecord};
use crate::resolve::TimeResolver;
use crate::types::{LoadProgress, Sample, SeriesStore, TemperatureUnit};
use crossbeam_channel::{bounded, Receiver};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Terminal result of a load.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The source was consumed, or the time ceiling was hit; the store
    /// holds everything parsed up to that point
    Completed(Arc<SeriesStore>),
    /// Cancellation was requested; the store holds the partial series
    Aborted(Arc<SeriesStore>),
}

impl LoadOutcome {
    pub fn store(&self) -> &Arc<SeriesStore> {
        match self {
            LoadOutcome::Completed(s) | LoadOutcome::Aborted(s) => s,
        }
    }
}

/// Single-writer progress cell shared with concurrent observers.
///
/// Readers only need the latest published value, so relaxed atomics are
/// enough; staleness by one update is acceptable.
#[derive(Debug, Default)]
struct ProgressCounter {
    loaded: AtomicU64,
    total: AtomicU64,
}

impl ProgressCounter {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    fn add_loaded(&self, n: u64) {
        self.loaded.fetch_add(n, Ordering::Relaxed);
    }

    /// Pin `total` to what was actually consumed so observers see the
    /// load as finished even when it stopped early.
    fn freeze(&self) {
        self.total
            .store(self.loaded.load(Ordering::Relaxed), Ordering::Relaxed);
    }

    fn snapshot(&self) -> LoadProgress {
        LoadProgress {
            bytes_loaded: self.loaded.load(Ordering::Relaxed),
            bytes_total: self.total.load(Ordering::Relaxed),
        }
    }
}

/// Caller-side handle to a load running on a worker thread.
pub struct LoaderHandle {
    progress: Arc<ProgressCounter>,
    cancel: Arc<AtomicBool>,
    rx: Receiver<Result<LoadOutcome>>,
    thread: Option<JoinHandle<()>>,
}

impl LoaderHandle {
    /// Latest published byte progress.
    pub fn progress(&self) -> LoadProgress {
        self.progress.snapshot()
    }

    /// Ask the worker to stop at the next record boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Whether the worker has published its result.
    pub fn is_finished(&self) -> bool {
        !self.rx.is_empty() || self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Non-blocking poll for the result.
    pub fn try_join(&mut self) -> Option<Result<LoadOutcome>> {
        let result = self.rx.try_recv().ok()?;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        Some(result)
    }

    /// Block until the worker finishes and return its result.
    pub fn join(mut self) -> Result<LoadOutcome> {
        let result = self.rx.recv().map_err(|_| {
            SensorVisError::Channel("loader worker disconnected without a result".to_string())
        })?;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        result
    }
}

/// Start loading `path` on a background worker thread.
pub fn load_file(path: impl AsRef<Path>, config: &AppConfig) -> Result<LoaderHandle> {
    let path = path.as_ref().to_path_buf();
    let file = File::open(&path)?;
    let total = file.metadata()?.len();

    let resolver = TimeResolver::from_config(config)?;
    let progress = Arc::new(ProgressCounter::default());
    progress.set_total(total);
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = bounded(1);

    let worker = Worker {
        config: config.loader.clone(),
        resolver,
        progress: Arc::clone(&progress),
        cancel: Arc::clone(&cancel),
    };

    let thread = std::thread::Builder::new()
        .name("sensorvis-loader".to_string())
        .spawn(move || {
            tracing::debug!(path = %path.display(), "load started");
            let result = worker.run(file);
            if let Err(e) = &result {
                tracing::error!(path = %path.display(), "load failed: {}", e);
            }
            // the receiver may already be gone; nothing to do then
            let _ = tx.send(result);
        })?;

    Ok(LoaderHandle {
        progress,
        cancel,
        rx,
        thread: Some(thread),
    })
}

/// Run a load to completion on the calling thread. Cancellation does not
/// apply; the time ceiling and every policy from `config` still do.
pub fn load_file_blocking(path: impl AsRef<Path>, config: &AppConfig) -> Result<Arc<SeriesStore>> {
    let file = File::open(path.as_ref())?;
    let total = file.metadata()?.len();
    let progress = Arc::new(ProgressCounter::default());
    progress.set_total(total);

    let worker = Worker {
        config: config.loader.clone(),
        resolver: TimeResolver::from_config(config)?,
        progress,
        cancel: Arc::new(AtomicBool::new(false)),
    };
    match worker.run(file)? {
        LoadOutcome::Completed(store) | LoadOutcome::Aborted(store) => Ok(store),
    }
}

struct Worker {
    config: LoaderConfig,
    resolver: TimeResolver,
    progress: Arc<ProgressCounter>,
    cancel: Arc<AtomicBool>,
}

impl Worker {
    fn run(self, mut reader: impl Read) -> Result<LoadOutcome> {
        let result = self.run_inner(&mut reader);
        // all exits leave progress stable, truncation included
        self.progress.freeze();
        result
    }

    fn run_inner(&self, reader: &mut impl Read) -> Result<LoadOutcome> {
        let start = Instant::now();
        let deadline = Duration::from_secs(self.config.load_timeout_secs);
        let mut buf = vec![0u8; self.config.read_buffer_bytes];
        let mut valid = 0usize;
        let mut eof = false;
        let mut unit = TemperatureUnit::Unknown;
        let mut records = 0usize;
        let mut acc = Accumulator::new(&self.config, self.resolver);

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                tracing::info!(records, "load cancelled");
                return Ok(LoadOutcome::Aborted(acc.freeze()));
            }
            if start.elapsed() >= deadline {
                tracing::warn!(
                    records,
                    timeout_secs = self.config.load_timeout_secs,
                    "load exceeded the time ceiling, keeping the partial series"
                );
                return Ok(LoadOutcome::Completed(acc.freeze()));
            }

            if !eof {
                let n = reader.read(&mut buf[valid..])?;
                if n == 0 {
                    eof = true;
                } else {
                    valid += n;
                    self.progress.add_loaded(n as u64);
                }
            }

            let mut pos = 0usize;

            if unit == TemperatureUnit::Unknown {
                match parser::parse_header(&buf[pos..valid]) {
                    ParseOutcome::Complete { value, consumed } => {
                        tracing::debug!(unit = value.label(), "header recognized");
                        unit = value;
                        pos += consumed;
                    }
                    ParseOutcome::NeedMore if eof => {
                        return Err(SensorVisError::Header(
                            "stream ended before a complete header".to_string(),
                        ));
                    }
                    // wait for more bytes before judging the header
                    ParseOutcome::NeedMore => {}
                    ParseOutcome::Malformed(reason) => {
                        return Err(SensorVisError::Header(reason));
                    }
                }
            }

            if unit != TemperatureUnit::Unknown {
                loop {
                    match parser::parse_record(&buf[pos..valid]) {
                        ParseOutcome::Complete { value, consumed } => {
                            pos += consumed;
                            records += 1;
                            acc.accept(value, unit);
                        }
                        ParseOutcome::NeedMore => break,
                        ParseOutcome::Malformed(reason) => {
                            // line 1 is the header
                            return Err(SensorVisError::MalformedRecord {
                                line: records + 2,
                                reason,
                            });
                        }
                    }
                }
            }

            // move the unconsumed tail to the front so the next read
            // appends after it
            buf.copy_within(pos..valid, 0);
            valid -= pos;

            if eof {
                if valid == 0 {
                    tracing::info!(records, samples = acc.len(), "load complete");
                    return Ok(LoadOutcome::Completed(acc.freeze()));
                }
                return Err(SensorVisError::TruncatedInput(format!(
                    "{} trailing bytes do not form a complete record",
                    valid
                )));
            }
            if valid == buf.len() {
                if unit == TemperatureUnit::Unknown {
                    return Err(SensorVisError::Header(
                        "header exceeds the read buffer".to_string(),
                    ));
                }
                return Err(SensorVisError::MalformedRecord {
                    line: records + 2,
                    reason: "record exceeds the read buffer".to_string(),
                });
            }
        }
    }
}

/// Applies the acceptance policy to parsed records and builds the series.
struct Accumulator<'a> {
    config: &'a LoaderConfig,
    resolver: TimeResolver,
    previous: Option<i64>,
    samples: Vec<Sample>,
}

impl<'a> Accumulator<'a> {
    fn new(config: &'a LoaderConfig, resolver: TimeResolver) -> Self {
        Self {
            config,
            resolver,
            previous: None,
            samples: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn accept(&mut self, record: RawRecord, unit: TemperatureUnit) {
        // the parser only emits calendar-valid fields
        let Some(naive) = record.fields.to_naive() else {
            debug_assert!(false, "parser emitted invalid calendar fields");
            return;
        };

        let time = self.resolver.resolve_absolute(naive, self.previous);
        let prev = self.previous.replace(time);

        // pre-calibration data is discarded but still anchors continuity
        if self.config.calibration_cutoff.excludes(&record.fields) {
            return;
        }

        let mut celsius = unit.to_celsius(record.temperature);
        if celsius <= self.config.fault_floor_celsius {
            celsius = f64::NAN;
        }

        if let Some(prev) = prev {
            let expected = prev + self.config.nominal_interval_secs;
            if time != expected {
                tracing::warn!(
                    record = %record.fields,
                    expected,
                    actual = time,
                    "sample interval anomaly"
                );
            }
        }

        self.samples.push(Sample {
            time,
            temperature: celsius,
        });
    }

    /// Freeze the accumulated series into an immutable store.
    fn freeze(mut self) -> Arc<SeriesStore> {
        if !self.samples.windows(2).all(|w| w[0].time <= w[1].time) {
            tracing::warn!("series arrived out of order, sorting before freeze");
            self.samples.sort_by_key(|s| s.time);
        }
        Arc::new(SeriesStore::from_samples(self.samples))
    }
}
