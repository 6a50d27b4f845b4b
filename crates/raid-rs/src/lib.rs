//! Core RAID layout, retention and fault-handling primitives for the array simulator.
#![allow(clippy::cargo_common_metadata)]

pub mod error;
pub mod layout;
pub mod metrics;
pub mod relay;
pub mod retention;
pub mod stats;
