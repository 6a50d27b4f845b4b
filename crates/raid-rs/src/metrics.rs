//! Process-wide export hook for disk- and array-level operations.
//!
//! Nothing is recorded until a sink is installed; the per-disk [`crate::stats`] records
//! are always maintained regardless.

use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::layout::stripe::RaidType;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IoOpType {
    Read,
    Write,
}

#[derive(Clone, Debug)]
pub struct DiskOp {
    pub disk_id: usize,
    pub sector: usize,
    pub op: IoOpType,
    pub bytes: u64,
    pub latency_seconds: f64,
    pub error: bool,
}

#[derive(Copy, Clone, Debug)]
pub struct RaidOp {
    pub raid_type: RaidType,
    pub sector: usize,
    pub op: IoOpType,
    pub bytes: u64,
    pub latency_seconds: f64,
    pub error: bool,
    /// The read was served by reconstruction or a mirror fallback.
    pub degraded: bool,
}

pub trait MetricsSink: Send + Sync + 'static {
    fn record_disk_op(&self, op: DiskOp);
    fn record_raid_op(&self, op: RaidOp);
}

static SINK: OnceLock<Arc<dyn MetricsSink>> = OnceLock::new();

/// `install` registers the process-wide sink; only the first call wins.
pub fn install(sink: Arc<dyn MetricsSink>) -> bool {
    SINK.set(sink).is_ok()
}

#[must_use]
pub fn installed() -> bool {
    SINK.get().is_some()
}

/// `emit` hands the installed sink to `f`. Without a sink `f` never runs, so ops are built lazily.
pub fn emit(f: impl FnOnce(&dyn MetricsSink)) {
    if let Some(sink) = SINK.get() {
        f(sink.as_ref());
    }
}
