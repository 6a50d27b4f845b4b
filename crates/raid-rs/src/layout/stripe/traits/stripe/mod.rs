//! Stripe trait definitions for reading and writing RAID layouts.


use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::Result;
use crate::layout::stripe::traits::restore::Restore;
use crate::retention::disk::VirtualDisk;

/// WriteOutcome describes a write that the layout accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    /// Members that rejected the write even though the layout still counts it as a success.
    pub failed_disk_ids: BTreeSet<usize>,
}

/// ReadOutcome carries the logical bytes of one sector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReadOutcome {
    pub bytes: Vec<u8>,
    /// The bytes were rebuilt from parity or served by a fallback mirror.
    pub reconstructed: bool,
}

/// Stripe describes how one logical sector maps onto the members of an array.
///
/// Implementations touch members strictly in ascending index order, one disk lock at a time.
pub trait Stripe {
    /// data_disks is the number of members that carry distinct payload chunks.
    ///
    /// # Arguments
    /// * `disks` - The total member count of the array.
    fn data_disks(&self, disks: usize) -> usize;

    /// write fans `payload` out to the members at `sector`.
    ///
    /// # Arguments
    /// * `disks` - The array members, in index order.
    /// * `sector` - The sector number on every member.
    /// * `payload` - The logical bytes to store.
    ///
    /// # Errors
    /// `InvalidArgument` when the payload does not split into the chunk count,
    /// `PartialWriteFailure` or `Unrecoverable` when members reject the write.
    fn write(&self, disks: &[VirtualDisk], sector: usize, payload: &[u8]) -> Result<WriteOutcome>;

    /// read gathers the logical bytes of `sector` from the members.
    ///
    /// # Errors
    /// `Unrecoverable` when more members are unavailable than the layout tolerates.
    fn read(&self, disks: &[VirtualDisk], sector: usize) -> Result<ReadOutcome>;

    /// as_restore returns a restoration trait object if supported.
    fn as_restore(&self) -> Option<&dyn Restore> {
        None
    }
}
