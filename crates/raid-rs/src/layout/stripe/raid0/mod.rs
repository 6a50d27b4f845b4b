//! RAID0 stripe layout implementation.

mod stripe_impl;

/// RAID0 splits each sector evenly across all members without redundancy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RAID0;
