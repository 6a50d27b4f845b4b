use tracing::debug;

use crate::error::{RaidError, Result};
use crate::layout::stripe::raid1::RAID1;
use crate::layout::stripe::traits::restore::Restore;
use crate::layout::stripe::traits::stripe::{ReadOutcome, Stripe, WriteOutcome};
use crate::layout::stripe::{read_member, write_members};
use crate::retention::disk::VirtualDisk;

impl Stripe for RAID1 {
    fn data_disks(&self, _disks: usize) -> usize {
        1
    }

    fn write(&self, disks: &[VirtualDisk], sector: usize, payload: &[u8]) -> Result<WriteOutcome> {
        if payload.is_empty() {
            return Err(RaidError::InvalidArgument("empty payload".to_string()));
        }
        let failed = write_members(disks, sector, (0..disks.len()).map(|i| (i, payload)));
        // One accepted copy is enough for the write to count.
        if failed.len() == disks.len() {
            return Err(RaidError::Unrecoverable {
                sector,
                unavailable: failed.into_iter().collect(),
            });
        }
        Ok(WriteOutcome {
            failed_disk_ids: failed,
        })
    }

    fn read(&self, disks: &[VirtualDisk], sector: usize) -> Result<ReadOutcome> {
        let mut unavailable = Vec::new();
        for (i, disk) in disks.iter().enumerate() {
            if let Some(bytes) = read_member(disk, sector) {
                if !unavailable.is_empty() {
                    debug!(disk = i, sector, skipped = ?unavailable, "mirror fallback read");
                }
                return Ok(ReadOutcome {
                    bytes,
                    reconstructed: !unavailable.is_empty(),
                });
            }
            unavailable.push(i);
        }
        Err(RaidError::Unrecoverable {
            sector,
            unavailable,
        })
    }

    fn as_restore(&self) -> Option<&dyn Restore> {
        Some(self)
    }
}
