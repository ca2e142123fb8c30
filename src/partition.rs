//! Hostname to worker assignment.

use std::num::NonZeroUsize;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over raw bytes.
pub fn fnv1a_32(data: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in data {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Index of the worker that owns `hostname`.
///
/// Stable across processes, so every run routes a host to the same worker and
/// that worker sees the host's items in dispatch order.
pub fn assign(hostname: &str, workers: NonZeroUsize) -> usize {
    fnv1a_32(hostname.as_bytes()) as usize % workers.get()
}
