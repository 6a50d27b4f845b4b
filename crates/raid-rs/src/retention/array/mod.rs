#[cfg(test)]
mod array_proptests;

use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use crate::error::{FaultError, RaidError, Result};
use crate::layout::stripe::traits::stripe::{ReadOutcome, Stripe, WriteOutcome};
use crate::layout::stripe::{RaidLayout, RaidType};
use crate::metrics::{self, IoOpType, RaidOp};
use crate::retention::disk::{Health, VirtualDisk};
use crate::retention::fault::{FaultManager, HealthTransition, RepairReport, ScrubReport};
use crate::stats::{DEFAULT_HISTORY, StatsRecord, StatsSnapshot};

/// ArrayConfig fixes the layout and geometry of an array at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayConfig {
    pub raid_type: RaidType,
    pub disks: usize,
    pub sector_size: usize,
    pub sector_count: usize,
    /// Latency samples and error events kept per disk.
    pub latency_history: usize,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            raid_type: RaidType::Parity,
            disks: 4,
            sector_size: 32,
            sector_count: 128,
            latency_history: DEFAULT_HISTORY,
        }
    }
}

impl ArrayConfig {
    /// `validate` checks the geometry and the member count of the chosen layout.
    ///
    /// # Errors
    /// `InvalidArgument` describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.sector_size == 0 || self.sector_count == 0 {
            return Err(RaidError::InvalidArgument(format!(
                "geometry must be non-zero (sector_size={}, sector_count={})",
                self.sector_size, self.sector_count
            )));
        }
        let min = self.raid_type.min_disks();
        if self.disks < min {
            return Err(RaidError::InvalidArgument(format!(
                "{} needs at least {min} disks, got {}",
                self.raid_type, self.disks
            )));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskRole {
    Data,
    Parity,
    Mirror,
}

impl fmt::Display for DiskRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => f.write_str("data"),
            Self::Parity => f.write_str("parity"),
            Self::Mirror => f.write_str("mirror"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiskStatus {
    pub id: usize,
    pub role: DiskRole,
    pub health: Health,
    pub stats: StatsSnapshot,
}

/// ArrayStatus is the polled view of an array: layout, geometry and every member.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArrayStatus {
    pub raid_type: RaidType,
    pub sector_size: usize,
    pub sector_count: usize,
    pub degraded: bool,
    pub disks: Vec<DiskStatus>,
}

impl fmt::Display for ArrayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        let state = if self.degraded { "DEGRADED" } else { "OK" };
        let _ = writeln!(
            out,
            "{} {state} (sector_size={}, sector_count={})",
            self.raid_type, self.sector_size, self.sector_count
        );
        for d in &self.disks {
            let _ = writeln!(
                out,
                "disk {}: {} (role={}, reads={}, writes={}, errors={}, error_rate={:.3})",
                d.id,
                d.health,
                d.role,
                d.stats.reads,
                d.stats.writes,
                d.stats.errors,
                d.stats.error_rate
            );
        }
        f.write_str(&out)
    }
}

/// Array composes N virtual disks under one RAID layout.
///
/// Every logical operation touches the members in ascending index order and holds at most
/// one disk lock at a time; there is no array-wide lock, so writes to the same sector from
/// different callers may interleave across members.
pub struct Array {
    layout: RaidLayout,
    sector_size: usize,
    sector_count: usize,
    disks: Vec<VirtualDisk>,
    faults: FaultManager,
}

impl Array {
    /// `new` builds an array of healthy, empty disks.
    ///
    /// # Errors
    /// `InvalidArgument` when the configuration does not validate.
    pub fn new(config: &ArrayConfig) -> Result<Self> {
        config.validate()?;
        let disks = (0..config.disks)
            .map(|id| {
                VirtualDisk::new(
                    id,
                    config.sector_size,
                    config.sector_count,
                    Arc::new(StatsRecord::new(config.latency_history)),
                )
            })
            .collect();
        info!(
            raid_type = %config.raid_type,
            disks = config.disks,
            sector_size = config.sector_size,
            sector_count = config.sector_count,
            "array created"
        );
        Ok(Self {
            layout: RaidLayout::for_type(config.raid_type),
            sector_size: config.sector_size,
            sector_count: config.sector_count,
            disks,
            faults: FaultManager::default(),
        })
    }

    #[must_use]
    pub const fn raid_type(&self) -> RaidType {
        self.layout.raid_type()
    }

    #[must_use]
    pub const fn sector_size(&self) -> usize {
        self.sector_size
    }

    #[must_use]
    pub const fn sector_count(&self) -> usize {
        self.sector_count
    }

    #[must_use]
    pub fn disks(&self) -> &[VirtualDisk] {
        &self.disks
    }

    #[must_use]
    pub fn disk(&self, id: usize) -> Option<&VirtualDisk> {
        self.disks.get(id)
    }

    /// `data_disks` is the number of members carrying distinct chunks of one logical sector.
    #[must_use]
    pub fn data_disks(&self) -> usize {
        self.layout.data_disks(self.disks.len())
    }

    /// `stripe_width` is the largest payload one logical sector accepts.
    #[must_use]
    pub fn stripe_width(&self) -> usize {
        self.data_disks() * self.sector_size
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.disks.iter().any(VirtualDisk::is_failed)
    }

    /// `write` stores `payload` at logical sector `sector` across the members.
    ///
    /// # Errors
    /// `InvalidArgument` for a bad sector, an empty or oversized payload, or a payload that does
    /// not split evenly; `PartialWriteFailure` when some members rejected their chunk;
    /// `Unrecoverable` when none accepted it.
    pub fn write(&self, sector: usize, payload: &[u8]) -> Result<WriteOutcome> {
        let started = Instant::now();
        let res = self
            .check_write(sector, payload)
            .and_then(|()| self.layout.write(&self.disks, sector, payload));
        let bytes = if res.is_ok() { payload.len() } else { 0 };
        self.observe(IoOpType::Write, sector, bytes, started, res.is_err(), false);
        if let Err(err) = &res {
            warn!(raid_type = %self.raid_type(), sector, %err, "array write failed");
        }
        res
    }

    /// `read` returns the logical bytes of `sector`, reconstructing around one lost member when
    /// the layout allows it.
    ///
    /// # Errors
    /// `InvalidArgument` for a bad sector, `Unrecoverable` when losses exceed the redundancy.
    pub fn read(&self, sector: usize) -> Result<ReadOutcome> {
        let started = Instant::now();
        let res = self
            .check_sector(sector)
            .and_then(|()| self.layout.read(&self.disks, sector));
        let (bytes, degraded) = res
            .as_ref()
            .map_or((0, false), |out| (out.bytes.len(), out.reconstructed));
        self.observe(IoOpType::Read, sector, bytes, started, res.is_err(), degraded);
        match &res {
            Ok(out) if out.reconstructed => {
                warn!(raid_type = %self.raid_type(), sector, "degraded read");
            }
            Err(err) => warn!(raid_type = %self.raid_type(), sector, %err, "array read failed"),
            Ok(_) => {}
        }
        res
    }

    /// `read_raw` reads one member's slot directly, bypassing the layout.
    ///
    /// # Errors
    /// `InvalidArgument` for a bad disk id or sector, `DiskUnavailable` when the disk is failed.
    pub fn read_raw(&self, disk_id: usize, sector: usize) -> Result<Vec<u8>> {
        let disk = self.disks.get(disk_id).ok_or_else(|| {
            RaidError::InvalidArgument(format!(
                "disk {disk_id} does not exist (array has {} disks)",
                self.disks.len()
            ))
        })?;
        Ok(disk.read(sector)?)
    }

    /// # Errors
    /// `UnknownDisk` for a bad id.
    pub fn inject_fault(&self, disk_id: usize) -> Result<(), FaultError> {
        self.faults.inject_fault(&self.disks, disk_id)
    }

    /// # Errors
    /// `UnknownDisk`, `NoRedundancy` or `Unrecoverable`; see [`FaultManager::repair`].
    pub fn repair(&self, disk_id: usize) -> Result<RepairReport, FaultError> {
        self.faults.repair(&self.layout, &self.disks, disk_id)
    }

    pub fn scrub(&self) -> ScrubReport {
        self.faults.scrub(&self.layout, &self.disks)
    }

    #[must_use]
    pub fn health_history(&self) -> Vec<HealthTransition> {
        self.faults.history()
    }

    pub fn reset_stats(&self) {
        for disk in &self.disks {
            disk.stats().reset();
        }
    }

    #[must_use]
    pub fn get_status(&self) -> ArrayStatus {
        ArrayStatus {
            raid_type: self.raid_type(),
            sector_size: self.sector_size,
            sector_count: self.sector_count,
            degraded: self.is_degraded(),
            disks: self
                .disks
                .iter()
                .map(|d| DiskStatus {
                    id: d.id(),
                    role: self.role_of(d.id()),
                    health: d.health(),
                    stats: d.stats().snapshot(),
                })
                .collect(),
        }
    }

    fn role_of(&self, id: usize) -> DiskRole {
        match self.layout.raid_type() {
            RaidType::Stripe => DiskRole::Data,
            RaidType::Mirror => DiskRole::Mirror,
            RaidType::Parity if id + 1 == self.disks.len() => DiskRole::Parity,
            RaidType::Parity => DiskRole::Data,
        }
    }

    fn check_sector(&self, sector: usize) -> Result<()> {
        if sector >= self.sector_count {
            return Err(RaidError::InvalidArgument(format!(
                "sector {sector} out of range (sector_count={})",
                self.sector_count
            )));
        }
        Ok(())
    }

    fn check_write(&self, sector: usize, payload: &[u8]) -> Result<()> {
        self.check_sector(sector)?;
        if payload.is_empty() {
            return Err(RaidError::InvalidArgument("empty payload".to_string()));
        }
        let width = self.stripe_width();
        if payload.len() > width {
            return Err(RaidError::InvalidArgument(format!(
                "payload of {} bytes exceeds stripe width {width} ({} x {})",
                payload.len(),
                self.data_disks(),
                self.sector_size
            )));
        }
        Ok(())
    }

    fn observe(
        &self,
        op: IoOpType,
        sector: usize,
        bytes: usize,
        started: Instant,
        error: bool,
        degraded: bool,
    ) {
        let latency = started.elapsed();
        trace!(?op, sector, bytes, error, degraded, "array op");
        metrics::emit(|sink| {
            sink.record_raid_op(RaidOp {
                raid_type: self.raid_type(),
                sector,
                op,
                bytes: bytes as u64,
                latency_seconds: latency.as_secs_f64(),
                error,
                degraded,
            });
        });
    }
}
