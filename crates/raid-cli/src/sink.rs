use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Value, json};
use tracing::trace;

use raid_rs::metrics::{DiskOp, IoOpType, MetricsSink, RaidOp};

/// TracingSink counts array operations and emits every operation as a `trace!` event.
#[derive(Default)]
pub struct TracingSink {
    disk_ops: AtomicU64,
    disk_errors: AtomicU64,
    raid_reads: AtomicU64,
    raid_writes: AtomicU64,
    raid_errors: AtomicU64,
    degraded_reads: AtomicU64,
}

impl TracingSink {
    pub fn summary(&self) -> Value {
        json!({
            "disk_ops": self.disk_ops.load(Ordering::Relaxed),
            "disk_errors": self.disk_errors.load(Ordering::Relaxed),
            "raid_reads": self.raid_reads.load(Ordering::Relaxed),
            "raid_writes": self.raid_writes.load(Ordering::Relaxed),
            "raid_errors": self.raid_errors.load(Ordering::Relaxed),
            "degraded_reads": self.degraded_reads.load(Ordering::Relaxed),
        })
    }
}

impl MetricsSink for TracingSink {
    fn record_disk_op(&self, op: DiskOp) {
        self.disk_ops.fetch_add(1, Ordering::Relaxed);
        if op.error {
            self.disk_errors.fetch_add(1, Ordering::Relaxed);
        }
        trace!(
            disk = op.disk_id,
            sector = op.sector,
            op = ?op.op,
            bytes = op.bytes,
            latency_seconds = op.latency_seconds,
            error = op.error,
            "disk op"
        );
    }

    fn record_raid_op(&self, op: RaidOp) {
        match op.op {
            IoOpType::Read => self.raid_reads.fetch_add(1, Ordering::Relaxed),
            IoOpType::Write => self.raid_writes.fetch_add(1, Ordering::Relaxed),
        };
        if op.error {
            self.raid_errors.fetch_add(1, Ordering::Relaxed);
        }
        if op.degraded {
            self.degraded_reads.fetch_add(1, Ordering::Relaxed);
        }
        trace!(
            raid_type = %op.raid_type,
            sector = op.sector,
            op = ?op.op,
            bytes = op.bytes,
            latency_seconds = op.latency_seconds,
            error = op.error,
            degraded = op.degraded,
            "raid op"
        );
    }
}
