//! RAID3 stripe layout implementation.

use crate::error::{RaidError, Result};

mod restore_impl;
mod stripe_impl;
#[cfg(test)]
mod stripe_trait_tests;

/// RAID3 stripes data over members `0..N-1` and keeps their XOR on member `N-1`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RAID3;

impl RAID3 {
    /// `parity_idx` is the index of the dedicated parity member in an array of `disks`.
    #[must_use]
    pub const fn parity_idx(disks: usize) -> usize {
        disks.saturating_sub(1)
    }

    /// `checked_parity_idx` rejects arrays too small to hold a data member and a parity member.
    pub(crate) fn checked_parity_idx(disks: usize) -> Result<usize> {
        if disks < 2 {
            return Err(RaidError::InvalidArgument(format!(
                "RAID3 needs at least 2 disks, got {disks}"
            )));
        }
        Ok(disks - 1)
    }
}
