use crate::error::{RaidError, Result};
use crate::layout::chunk::split_even;
use crate::layout::stripe::raid0::RAID0;
use crate::layout::stripe::traits::stripe::{ReadOutcome, Stripe, WriteOutcome};
use crate::layout::stripe::{read_member, settle_write, write_members};
use crate::retention::disk::VirtualDisk;

impl Stripe for RAID0 {
    fn data_disks(&self, disks: usize) -> usize {
        disks
    }

    fn write(&self, disks: &[VirtualDisk], sector: usize, payload: &[u8]) -> Result<WriteOutcome> {
        let chunks = split_even(payload, disks.len())?;
        let failed = write_members(disks, sector, chunks.into_iter().enumerate());
        settle_write(sector, failed, disks.len())
    }

    fn read(&self, disks: &[VirtualDisk], sector: usize) -> Result<ReadOutcome> {
        let mut bytes = Vec::new();
        let mut unavailable = Vec::new();
        for (i, disk) in disks.iter().enumerate() {
            match read_member(disk, sector) {
                Some(chunk) => bytes.extend_from_slice(&chunk),
                None => unavailable.push(i),
            }
        }
        if !unavailable.is_empty() {
            return Err(RaidError::Unrecoverable {
                sector,
                unavailable,
            });
        }
        Ok(ReadOutcome {
            bytes,
            reconstructed: false,
        })
    }
}
