//! Chunk arithmetic and per-level stripe layouts.

pub mod chunk;
pub mod stripe;
