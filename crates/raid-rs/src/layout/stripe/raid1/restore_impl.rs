use std::collections::HashMap;

use tracing::debug;

use crate::error::FaultError;
use crate::layout::stripe::raid1::RAID1;
use crate::layout::stripe::{peers, rebuild_target};
use crate::layout::stripe::traits::restore::Restore;
use crate::retention::disk::VirtualDisk;

impl Restore for RAID1 {
    fn restore(
        &self,
        disks: &[VirtualDisk],
        target: usize,
        sector: usize,
    ) -> Result<bool, FaultError> {
        let rebuilt = rebuild_target(disks, target)?;
        let (_, source) = peers(disks, target)
            .find(|(_, d)| !d.is_failed())
            .ok_or_else(|| FaultError::Unrecoverable {
                disk_id: target,
                failed: peers(disks, target).map(|(i, _)| i).collect(),
            })?;

        match source.read_sector(sector)? {
            Some(copy) => {
                rebuilt.restore_sector(sector, copy.data())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn scrub(&self, disks: &[VirtualDisk], sector: usize) -> Vec<usize> {
        let mut copies = Vec::new();
        for (i, disk) in disks.iter().enumerate().filter(|(_, d)| !d.is_failed()) {
            if let Ok(slot) = disk.read_sector(sector) {
                copies.push((i, slot.map(|s| s.into_data())));
            }
        }

        // Majority vote; ties go to the copy seen first in index order.
        let mut counts: HashMap<&Option<Vec<u8>>, usize> = HashMap::new();
        let mut best: Option<(&Option<Vec<u8>>, usize)> = None;
        for (_, copy) in &copies {
            let c = counts.entry(copy).or_insert(0);
            *c += 1;
            if best.is_none_or(|(_, n)| *c > n) {
                best = Some((copy, *c));
            }
        }
        let Some((Some(winner), _)) = best else {
            return Vec::new();
        };

        let mut to_rewrite = Vec::new();
        for (id, copy) in &copies {
            if copy.as_ref() != Some(winner) && disks[*id].restore_sector(sector, winner).is_ok() {
                debug!(disk = id, sector, "mirror copy rewritten by scrub");
                to_rewrite.push(*id);
            }
        }
        to_rewrite
    }
}
