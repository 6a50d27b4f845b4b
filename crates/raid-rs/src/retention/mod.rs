//! Retention layer primitives: virtual disks, the array that composes them, and fault handling.

pub mod array;
pub mod disk;
pub mod fault;
