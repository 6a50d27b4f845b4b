use tracing::debug;

use crate::error::FaultError;
use crate::layout::chunk::{Chunk, parity_of};
use crate::layout::stripe::raid3::RAID3;
use crate::layout::stripe::{peers, rebuild_target};
use crate::layout::stripe::traits::restore::Restore;
use crate::retention::disk::VirtualDisk;

impl Restore for RAID3 {
    // Data and parity members rebuild the same way: the XOR of every other member.
    fn restore(
        &self,
        disks: &[VirtualDisk],
        target: usize,
        sector: usize,
    ) -> Result<bool, FaultError> {
        let rebuilt_disk = rebuild_target(disks, target)?;
        let failed: Vec<usize> = peers(disks, target)
            .filter(|(_, d)| d.is_failed())
            .map(|(i, _)| i)
            .collect();
        if !failed.is_empty() {
            return Err(FaultError::Unrecoverable {
                disk_id: target,
                failed,
            });
        }

        let mut rebuilt: Option<Chunk> = None;
        for (_, disk) in peers(disks, target) {
            if let Some(slot) = disk.read_sector(sector)? {
                *rebuilt.get_or_insert_with(Chunk::default) ^= slot.data();
            }
        }

        match rebuilt {
            Some(chunk) => {
                rebuilt_disk.restore_sector(sector, chunk.as_bytes())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn scrub(&self, disks: &[VirtualDisk], sector: usize) -> Vec<usize> {
        // Parity can only be trusted to be re-derived while every member is present.
        if disks.iter().any(VirtualDisk::is_failed) {
            return Vec::new();
        }
        let Ok(parity_idx) = Self::checked_parity_idx(disks.len()) else {
            return Vec::new();
        };

        let mut data = Vec::with_capacity(parity_idx);
        for disk in &disks[..parity_idx] {
            match disk.read_sector(sector) {
                Ok(slot) => data.push(slot),
                Err(_) => return Vec::new(),
            }
        }
        let Ok(stored) = disks[parity_idx].read_sector(sector) else {
            return Vec::new();
        };
        if data.iter().all(Option::is_none) {
            return Vec::new();
        }

        let expected = parity_of(data.iter().flatten().map(|s| s.data()));
        if stored.as_ref().map(|s| s.data()) == Some(expected.as_bytes()) {
            return Vec::new();
        }
        if disks[parity_idx]
            .restore_sector(sector, expected.as_bytes())
            .is_err()
        {
            return Vec::new();
        }
        debug!(sector, "parity rewritten by scrub");
        vec![parity_idx]
    }
}
