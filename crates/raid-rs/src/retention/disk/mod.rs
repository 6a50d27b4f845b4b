
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::DiskError;
use crate::metrics::{self, DiskOp, IoOpType};
use crate::stats::StatsRecord;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Healthy,
    Failed,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => f.write_str("OK"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}

/// Sector is the content of one written slot together with its integrity checksum.
///
/// The checksum is informational: reconstruction never consults it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sector {
    index: usize,
    data: Vec<u8>,
    checksum: [u8; 32],
}

impl Sector {
    fn new(index: usize, data: Vec<u8>) -> Self {
        let checksum = compute_checksum(&data);
        Self {
            index,
            data,
            checksum,
        }
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub const fn checksum(&self) -> &[u8; 32] {
        &self.checksum
    }

    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// `verify` recomputes the checksum and compares it to the stored one.
    #[must_use]
    pub fn verify(&self) -> bool {
        compute_checksum(&self.data) == self.checksum
    }
}

/// VirtualDisk is a fixed-geometry in-memory sector store.
///
/// All slot access goes through one exclusive lock held only for a single sector copy.
/// Health is kept outside the lock so status queries never wait on I/O.
pub struct VirtualDisk {
    id: usize,
    sector_size: usize,
    sector_count: usize,
    sectors: Mutex<Vec<Option<Sector>>>,
    failed: AtomicBool,
    stats: Arc<StatsRecord>,
}

impl VirtualDisk {
    #[must_use]
    pub fn new(id: usize, sector_size: usize, sector_count: usize, stats: Arc<StatsRecord>) -> Self {
        Self {
            id,
            sector_size,
            sector_count,
            sectors: Mutex::new(vec![None; sector_count]),
            failed: AtomicBool::new(false),
            stats,
        }
    }

    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
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
    pub fn stats(&self) -> &Arc<StatsRecord> {
        &self.stats
    }

    #[must_use]
    pub fn health(&self) -> Health {
        if self.is_failed() {
            Health::Failed
        } else {
            Health::Healthy
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// `set_health` flips the health flag and returns the previous state.
    pub fn set_health(&self, health: Health) -> Health {
        let was_failed = self.failed.swap(health == Health::Failed, Ordering::AcqRel);
        if was_failed {
            Health::Failed
        } else {
            Health::Healthy
        }
    }

    /// `write` stores `data` at `index`, replacing whatever the slot held.
    ///
    /// # Errors
    /// `OutOfRange` for a bad index, `PayloadTooLarge` when `data` exceeds the sector size,
    /// then `Failed` when the disk is marked failed.
    pub fn write(&self, index: usize, data: &[u8]) -> Result<(), DiskError> {
        let started = Instant::now();
        let res = self
            .check_write(index, data.len())
            .and_then(|()| self.check_available())
            .map(|()| self.store(index, data));
        let moved = if res.is_ok() { data.len() } else { 0 };
        self.observe(IoOpType::Write, index, moved, started, res.as_ref().err());
        res
    }

    /// `read` returns the bytes of the slot at `index`; a never-written slot reads as zeros.
    ///
    /// # Errors
    /// `OutOfRange` for a bad index, `Failed` when the disk is marked failed.
    pub fn read(&self, index: usize) -> Result<Vec<u8>, DiskError> {
        self.read_sector(index).map(|slot| {
            slot.map_or_else(|| vec![0u8; self.sector_size], Sector::into_data)
        })
    }

    /// `read_sector` returns the raw slot, keeping never-written slots distinguishable.
    ///
    /// # Errors
    /// `OutOfRange` for a bad index, `Failed` when the disk is marked failed.
    pub fn read_sector(&self, index: usize) -> Result<Option<Sector>, DiskError> {
        let started = Instant::now();
        let res = self
            .check_index(index)
            .and_then(|()| self.check_available())
            .map(|()| self.sectors.lock()[index].clone());
        let bytes = match &res {
            Ok(Some(sector)) => sector.data.len(),
            Ok(None) => self.sector_size,
            Err(_) => 0,
        };
        self.observe(IoOpType::Read, index, bytes, started, res.as_ref().err());
        res
    }

    /// `restore_sector` writes rebuilt content while the disk may still be marked failed.
    ///
    /// # Errors
    /// `OutOfRange` for a bad index, `PayloadTooLarge` when `data` exceeds the sector size.
    pub fn restore_sector(&self, index: usize, data: &[u8]) -> Result<(), DiskError> {
        let started = Instant::now();
        let res = self
            .check_write(index, data.len())
            .map(|()| self.store(index, data));
        let moved = if res.is_ok() { data.len() } else { 0 };
        self.observe(IoOpType::Write, index, moved, started, res.as_ref().err());
        res
    }

    /// `verify_sector` checks the stored checksum of a slot; empty slots verify trivially.
    ///
    /// # Errors
    /// `OutOfRange` for a bad index.
    pub fn verify_sector(&self, index: usize) -> Result<bool, DiskError> {
        self.check_index(index)?;
        Ok(self.sectors.lock()[index]
            .as_ref()
            .is_none_or(Sector::verify))
    }

    /// `written_sectors` counts slots that hold data.
    #[must_use]
    pub fn written_sectors(&self) -> usize {
        self.sectors.lock().iter().filter(|s| s.is_some()).count()
    }

    fn store(&self, index: usize, data: &[u8]) {
        let sector = Sector::new(index, data.to_vec());
        self.sectors.lock()[index] = Some(sector);
    }

    fn check_available(&self) -> Result<(), DiskError> {
        if self.is_failed() {
            return Err(DiskError::Failed { disk_id: self.id });
        }
        Ok(())
    }

    const fn check_index(&self, index: usize) -> Result<(), DiskError> {
        if index >= self.sector_count {
            return Err(DiskError::OutOfRange {
                sector: index,
                sector_count: self.sector_count,
            });
        }
        Ok(())
    }

    fn check_write(&self, index: usize, len: usize) -> Result<(), DiskError> {
        self.check_index(index)?;
        if len > self.sector_size {
            return Err(DiskError::PayloadTooLarge {
                len,
                sector_size: self.sector_size,
            });
        }
        Ok(())
    }

    fn observe(
        &self,
        op: IoOpType,
        sector: usize,
        bytes: usize,
        started: Instant,
        err: Option<&DiskError>,
    ) {
        let latency = started.elapsed();
        self.stats.record_op(op, bytes, latency);
        if let Some(e) = err {
            self.stats.record_error(e.kind());
        }
        metrics::emit(|sink| {
            sink.record_disk_op(DiskOp {
                disk_id: self.id,
                sector,
                op,
                bytes: bytes as u64,
                latency_seconds: latency.as_secs_f64(),
                error: err.is_some(),
            });
        });
    }

    #[cfg(test)]
    pub(crate) fn corrupt(&self, index: usize, data: &[u8]) {
        if let Some(sector) = self.sectors.lock()[index].as_mut() {
            sector.data = data.to_vec();
        }
    }
}

fn compute_checksum(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
