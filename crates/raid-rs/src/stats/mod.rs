//! Per-disk operation statistics.
//!
//! A [`StatsRecord`] only observes: it never touches sector storage and never holds the disk
//! lock, so recording cannot stall a writer beyond one short history push.


use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::Serialize;

use crate::metrics::IoOpType;

/// Default number of latency samples and error events kept per disk.
pub const DEFAULT_HISTORY: usize = 1024;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    OutOfRange,
    PayloadTooLarge,
    DiskFailed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub at: SystemTime,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorSample {
    pub kind: ErrorKind,
    pub unix_seconds: f64,
}

/// Point-in-time copy of a [`StatsRecord`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub reads: u64,
    pub writes: u64,
    pub errors: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub average_latency_seconds: f64,
    pub latency_history_seconds: Vec<f64>,
    pub throughput_bytes_per_second: f64,
    pub error_rate: f64,
    pub elapsed_seconds: f64,
    pub error_history: Vec<ErrorSample>,
}

struct History {
    latencies: VecDeque<Duration>,
    errors: VecDeque<ErrorEvent>,
    since: Instant,
}

pub struct StatsRecord {
    reads: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    capacity: usize,
    history: Mutex<History>,
}

impl Default for StatsRecord {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

impl StatsRecord {
    /// `new` creates an empty record keeping at most `capacity` latency samples and error events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            capacity: capacity.max(1),
            history: Mutex::new(History {
                latencies: VecDeque::new(),
                errors: VecDeque::new(),
                since: Instant::now(),
            }),
        }
    }

    /// `record_op` accounts one completed (or rejected) operation.
    ///
    /// # Arguments
    /// * `op` - Whether the operation read or wrote.
    /// * `bytes` - Bytes actually moved; rejected operations pass 0.
    /// * `latency` - Wall time spent inside the disk call.
    pub fn record_op(&self, op: IoOpType, bytes: usize, latency: Duration) {
        let bytes = bytes as u64;
        match op {
            IoOpType::Read => {
                self.reads.fetch_add(1, Ordering::Relaxed);
                self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
            }
            IoOpType::Write => {
                self.writes.fetch_add(1, Ordering::Relaxed);
                self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
            }
        }
        let mut history = self.history.lock();
        if history.latencies.len() == self.capacity {
            history.latencies.pop_front();
        }
        history.latencies.push_back(latency);
    }

    pub fn record_error(&self, kind: ErrorKind) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        let mut history = self.history.lock();
        if history.errors.len() == self.capacity {
            history.errors.pop_front();
        }
        history.errors.push_back(ErrorEvent {
            kind,
            at: SystemTime::now(),
        });
    }

    /// `reset` zeroes every counter, drops the histories and restarts the throughput clock.
    pub fn reset(&self) {
        let mut history = self.history.lock();
        for counter in [
            &self.reads,
            &self.writes,
            &self.errors,
            &self.bytes_read,
            &self.bytes_written,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        history.latencies.clear();
        history.errors.clear();
        history.since = Instant::now();
    }

    #[must_use]
    pub fn error_events(&self) -> Vec<ErrorEvent> {
        self.history.lock().errors.iter().copied().collect()
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let history = self.history.lock();
        let reads = self.reads.load(Ordering::Relaxed);
        let writes = self.writes.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        let bytes_read = self.bytes_read.load(Ordering::Relaxed);
        let bytes_written = self.bytes_written.load(Ordering::Relaxed);

        let latency_history_seconds: Vec<f64> = history
            .latencies
            .iter()
            .map(Duration::as_secs_f64)
            .collect();
        let average_latency_seconds = if latency_history_seconds.is_empty() {
            0.0
        } else {
            latency_history_seconds.iter().sum::<f64>() / latency_history_seconds.len() as f64
        };

        let elapsed_seconds = history.since.elapsed().as_secs_f64();
        let throughput_bytes_per_second = if elapsed_seconds > 0.0 {
            (bytes_read + bytes_written) as f64 / elapsed_seconds
        } else {
            0.0
        };

        let ops = reads + writes;
        let error_rate = if ops == 0 {
            0.0
        } else {
            errors as f64 / ops as f64
        };

        let error_history = history
            .errors
            .iter()
            .map(|e| ErrorSample {
                kind: e.kind,
                unix_seconds: e
                    .at
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs_f64(),
            })
            .collect();

        StatsSnapshot {
            reads,
            writes,
            errors,
            bytes_read,
            bytes_written,
            average_latency_seconds,
            latency_history_seconds,
            throughput_bytes_per_second,
            error_rate,
            elapsed_seconds,
            error_history,
        }
    }
}
