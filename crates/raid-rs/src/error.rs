//! Error taxonomy shared by disks, layouts and the fault manager.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::layout::stripe::RaidType;
use crate::stats::ErrorKind;

/// Result type alias for array-level operations.
pub type Result<T, E = RaidError> = std::result::Result<T, E>;

/// Errors raised by a single virtual disk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiskError {
    /// The sector index is outside the disk geometry.
    #[error("sector {sector} out of range (sector_count={sector_count})")]
    OutOfRange { sector: usize, sector_count: usize },

    /// The buffer does not fit into one sector.
    #[error("payload of {len} bytes exceeds sector size {sector_size}")]
    PayloadTooLarge { len: usize, sector_size: usize },

    /// The disk is marked failed and refuses data movement.
    #[error("disk {disk_id} is failed")]
    Failed { disk_id: usize },
}

impl DiskError {
    /// `kind` returns the statistics bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::Failed { .. } => ErrorKind::DiskFailed,
        }
    }
}

/// Errors raised by fault injection and repair.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FaultError {
    #[error("disk {disk_id} does not exist (array has {disks} disks)")]
    UnknownDisk { disk_id: usize, disks: usize },

    /// The layout keeps no redundancy to rebuild from.
    #[error("disk {disk_id} is unrecoverable: {raid_type} keeps no redundancy")]
    NoRedundancy { disk_id: usize, raid_type: RaidType },

    /// Too many members are down to rebuild the disk.
    #[error("disk {disk_id} is unrecoverable: peers {failed:?} are unavailable")]
    Unrecoverable { disk_id: usize, failed: Vec<usize> },

    #[error(transparent)]
    Disk(#[from] DiskError),
}

/// Errors raised by array-level reads and writes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RaidError {
    /// Bad sector index, empty payload, or a payload that does not split into the chunk count.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("disk {disk_id} is unavailable")]
    DiskUnavailable { disk_id: usize },

    /// Losses exceed the redundancy of the layout.
    #[error("sector {sector} is unrecoverable: disks {unavailable:?} are unavailable")]
    Unrecoverable {
        sector: usize,
        unavailable: Vec<usize>,
    },

    /// The write landed on a strict subset of the members; nothing was rolled back.
    #[error("partial write at sector {sector}: disks {failed_disk_ids:?} rejected the write")]
    PartialWriteFailure {
        sector: usize,
        failed_disk_ids: BTreeSet<usize>,
    },

    #[error(transparent)]
    Fault(#[from] FaultError),
}

impl From<DiskError> for RaidError {
    fn from(err: DiskError) -> Self {
        match err {
            DiskError::Failed { disk_id } => Self::DiskUnavailable { disk_id },
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}
