//! Stripe layout implementations for supported RAID modes.

pub mod raid0;
pub mod raid1;
pub mod raid3;
pub mod traits;


use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FaultError, RaidError, Result};
use crate::layout::stripe::raid0::RAID0;
use crate::layout::stripe::raid1::RAID1;
use crate::layout::stripe::raid3::RAID3;
use crate::layout::stripe::traits::restore::Restore;
use crate::layout::stripe::traits::stripe::{ReadOutcome, Stripe, WriteOutcome};
use crate::retention::disk::VirtualDisk;

/// RaidType is the redundancy scheme of an array.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaidType {
    /// RAID0: striping without redundancy.
    Stripe,
    /// RAID1: full copies on every member.
    Mirror,
    /// RAID3: striping with a dedicated parity member at the last index.
    Parity,
}

impl RaidType {
    /// `min_disks` is the smallest member count the scheme can be built with.
    #[must_use]
    pub const fn min_disks(self) -> usize {
        match self {
            Self::Stripe => 1,
            Self::Mirror | Self::Parity => 2,
        }
    }
}

impl fmt::Display for RaidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stripe => f.write_str("RAID0"),
            Self::Mirror => f.write_str("RAID1"),
            Self::Parity => f.write_str("RAID3"),
        }
    }
}

/// RaidLayout is the closed set of layouts an array can be configured with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RaidLayout {
    Raid0(RAID0),
    Raid1(RAID1),
    Raid3(RAID3),
}

impl RaidLayout {
    #[must_use]
    pub const fn for_type(raid_type: RaidType) -> Self {
        match raid_type {
            RaidType::Stripe => Self::Raid0(RAID0),
            RaidType::Mirror => Self::Raid1(RAID1),
            RaidType::Parity => Self::Raid3(RAID3),
        }
    }

    #[must_use]
    pub const fn raid_type(&self) -> RaidType {
        match self {
            Self::Raid0(_) => RaidType::Stripe,
            Self::Raid1(_) => RaidType::Mirror,
            Self::Raid3(_) => RaidType::Parity,
        }
    }
}

impl Stripe for RaidLayout {
    fn data_disks(&self, disks: usize) -> usize {
        match self {
            Self::Raid0(l) => l.data_disks(disks),
            Self::Raid1(l) => l.data_disks(disks),
            Self::Raid3(l) => l.data_disks(disks),
        }
    }

    fn write(&self, disks: &[VirtualDisk], sector: usize, payload: &[u8]) -> Result<WriteOutcome> {
        match self {
            Self::Raid0(l) => l.write(disks, sector, payload),
            Self::Raid1(l) => l.write(disks, sector, payload),
            Self::Raid3(l) => l.write(disks, sector, payload),
        }
    }

    fn read(&self, disks: &[VirtualDisk], sector: usize) -> Result<ReadOutcome> {
        match self {
            Self::Raid0(l) => l.read(disks, sector),
            Self::Raid1(l) => l.read(disks, sector),
            Self::Raid3(l) => l.read(disks, sector),
        }
    }

    fn as_restore(&self) -> Option<&dyn Restore> {
        match self {
            Self::Raid0(l) => l.as_restore(),
            Self::Raid1(l) => l.as_restore(),
            Self::Raid3(l) => l.as_restore(),
        }
    }
}

/// `write_members` writes each `(disk index, chunk)` pair in the given order and returns the
/// indices of the members that rejected their chunk.
pub(crate) fn write_members<'a, I>(disks: &[VirtualDisk], sector: usize, chunks: I) -> BTreeSet<usize>
where
    I: IntoIterator<Item = (usize, &'a [u8])>,
{
    let mut failed = BTreeSet::new();
    for (i, chunk) in chunks {
        if let Err(err) = disks[i].write(sector, chunk) {
            warn!(disk = i, sector, %err, "member write failed");
            failed.insert(i);
        }
    }
    failed
}

/// `settle_write` turns the failed member set of an all-or-nothing layout into a result.
pub(crate) fn settle_write(
    sector: usize,
    failed: BTreeSet<usize>,
    members: usize,
) -> Result<WriteOutcome> {
    if failed.is_empty() {
        Ok(WriteOutcome::default())
    } else if failed.len() == members {
        Err(RaidError::Unrecoverable {
            sector,
            unavailable: failed.into_iter().collect(),
        })
    } else {
        Err(RaidError::PartialWriteFailure {
            sector,
            failed_disk_ids: failed,
        })
    }
}

/// `peers` yields every member other than `target` together with its position in the array.
pub(crate) fn peers(
    disks: &[VirtualDisk],
    target: usize,
) -> impl Iterator<Item = (usize, &VirtualDisk)> {
    disks.iter().enumerate().filter(move |(i, _)| *i != target)
}

/// `rebuild_target` returns the member to rebuild, rejecting positions outside the array.
pub(crate) fn rebuild_target(
    disks: &[VirtualDisk],
    target: usize,
) -> std::result::Result<&VirtualDisk, FaultError> {
    disks.get(target).ok_or(FaultError::UnknownDisk {
        disk_id: target,
        disks: disks.len(),
    })
}

/// `read_member` reads one member, treating a failed disk as missing without touching it.
pub(crate) fn read_member(disk: &VirtualDisk, sector: usize) -> Option<Vec<u8>> {
    if disk.is_failed() {
        return None;
    }
    match disk.read(sector) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            warn!(disk = disk.id(), sector, %err, "member read failed");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::sync::Arc;

    use crate::retention::disk::{Health, VirtualDisk};
    use crate::stats::StatsRecord;

    /// `disks` builds `n` healthy members sharing one geometry.
    pub fn disks(n: usize, sector_size: usize, sector_count: usize) -> Vec<VirtualDisk> {
        disks_with_ids(0..n, sector_size, sector_count)
    }

    /// `disks_with_ids` builds healthy members whose ids differ from their positions.
    pub fn disks_with_ids(
        ids: impl IntoIterator<Item = usize>,
        sector_size: usize,
        sector_count: usize,
    ) -> Vec<VirtualDisk> {
        ids.into_iter()
            .map(|id| {
                VirtualDisk::new(id, sector_size, sector_count, Arc::new(StatsRecord::default()))
            })
            .collect()
    }

    /// `fail` marks the listed members failed.
    pub fn fail(disks: &[VirtualDisk], ids: &[usize]) {
        for &i in ids {
            disks[i].set_health(Health::Failed);
        }
    }
}
