use std::iter;

use tracing::debug;

use crate::error::{RaidError, Result};
use crate::layout::chunk::{Chunk, parity_of, split_even};
use crate::layout::stripe::raid3::RAID3;
use crate::layout::stripe::traits::restore::Restore;
use crate::layout::stripe::traits::stripe::{ReadOutcome, Stripe, WriteOutcome};
use crate::layout::stripe::{read_member, settle_write, write_members};
use crate::retention::disk::VirtualDisk;

impl Stripe for RAID3 {
    fn data_disks(&self, disks: usize) -> usize {
        disks.saturating_sub(1)
    }

    fn write(&self, disks: &[VirtualDisk], sector: usize, payload: &[u8]) -> Result<WriteOutcome> {
        let parity_idx = Self::checked_parity_idx(disks.len())?;
        let chunks = split_even(payload, parity_idx)?;
        // Parity is fixed before any member is touched.
        let parity = parity_of(chunks.iter().copied());

        let members = chunks
            .into_iter()
            .enumerate()
            .chain(iter::once((parity_idx, parity.as_bytes())));
        let failed = write_members(disks, sector, members);
        settle_write(sector, failed, disks.len())
    }

    fn read(&self, disks: &[VirtualDisk], sector: usize) -> Result<ReadOutcome> {
        let parity_idx = Self::checked_parity_idx(disks.len())?;
        let (data_disks, parity_disk) = disks.split_at(parity_idx);

        let mut chunks: Vec<Option<Vec<u8>>> = Vec::with_capacity(data_disks.len());
        let mut missing = Vec::new();
        for (i, disk) in data_disks.iter().enumerate() {
            let chunk = read_member(disk, sector);
            if chunk.is_none() {
                missing.push(i);
            }
            chunks.push(chunk);
        }

        let reconstructed = match missing.len() {
            0 => false,
            1 => {
                let lost = missing[0];
                let Some(parity) = read_member(&parity_disk[0], sector) else {
                    return Err(RaidError::Unrecoverable {
                        sector,
                        unavailable: vec![lost, parity_idx],
                    });
                };
                let mut rebuilt = Chunk::from(parity);
                for survivor in chunks.iter().flatten() {
                    rebuilt ^= survivor.as_slice();
                }
                debug!(disk = lost, sector, "chunk reconstructed from parity");
                chunks[lost] = Some(rebuilt.into_bytes());
                true
            }
            _ => {
                return Err(RaidError::Unrecoverable {
                    sector,
                    unavailable: missing,
                });
            }
        };

        Ok(ReadOutcome {
            bytes: chunks.into_iter().flatten().flatten().collect(),
            reconstructed,
        })
    }

    fn as_restore(&self) -> Option<&dyn Restore> {
        Some(self)
    }
}
