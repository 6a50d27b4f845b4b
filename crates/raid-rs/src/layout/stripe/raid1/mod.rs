//! RAID1 stripe layout implementation.

mod restore_impl;
mod stripe_impl;

/// RAID1 stores a full copy of each sector on every member.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RAID1;
