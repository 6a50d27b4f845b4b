//! Restoration helpers for rebuilding failed or stale disks.

use crate::error::FaultError;
use crate::retention::disk::VirtualDisk;

/// Restore defines hooks for rebuilding missing or stale stripe members.
pub trait Restore {
    /// restore rebuilds one sector of the member at `target` from its peers.
    ///
    /// # Arguments
    /// * `disks` - The array members, in index order.
    /// * `target` - The disk index to rebuild; it may still be marked failed.
    /// * `sector` - The sector to rebuild.
    ///
    /// # Returns
    /// `true` when content was written, `false` when every source slot was empty.
    ///
    /// # Errors
    /// `Unrecoverable` when the peers needed for the rebuild are unavailable.
    fn restore(&self, disks: &[VirtualDisk], target: usize, sector: usize)
    -> Result<bool, FaultError>;

    /// scrub re-derives redundancy for `sector` and rewrites members that disagree.
    ///
    /// # Returns
    /// A list of disk indices that were rewritten.
    fn scrub(&self, _disks: &[VirtualDisk], _sector: usize) -> Vec<usize> {
        Vec::new()
    }
}
