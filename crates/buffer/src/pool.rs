// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Size-tiered recycling pool for byte buffers.
//!
//! Mirrors TDLib's `BuffersStorage` (`td/tdnet/td/net/BuffersStorage.h`,
//! `.cpp`): a fixed set of capacity tiers, each with its own cap on the
//! number of recycled instances it retains. A request is rounded up to the
//! smallest tier that fits; a request bigger than the largest tier allocates
//! outside the pool and is simply dropped instead of recycled.

use parking_lot::Mutex;
use std::sync::OnceLock;

/// Capacity tiers, smallest first.
const TIERS: [usize; 7] = [8, 128, 1224, 4296, 16584, 40000, 160000];

/// Max recycled-instance count retained per tier (same order as [`TIERS`]).
const TIER_CAPS: [usize; 7] = [80, 80, 10, 10, 10, 10, 10];

fn tier_for(size: usize) -> Option<usize> {
    TIERS.iter().position(|&t| size <= t)
}

#[derive(Default)]
struct Tier {
    free: Vec<Vec<u8>>,
}

/// A pool of recyclable byte buffers, shared across the process behind one
/// mutex.
///
/// # Example
///
/// ```rust
/// use rustgram_buffer::BufferPool;
///
/// let pool = BufferPool::new();
/// let buf = pool.get_free_buffer(64);
/// assert_eq!(buf.len(), 64);
/// assert_eq!(buf.capacity(), 128); // rounded up to the next tier
/// pool.reuse(buf);
/// assert_eq!(pool.tier_len(1), 1);
/// ```
pub struct BufferPool {
    tiers: Mutex<[Tier; 7]>,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool {
    /// Creates a fresh, empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tiers: Mutex::new(Default::default()),
        }
    }

    /// Returns the process-wide singleton pool.
    ///
    /// `rustgram-net`'s connection read/write paths share this instance so a
    /// buffer freed while handling DC 2 traffic can be reused for DC 4.
    pub fn global() -> &'static BufferPool {
        static POOL: OnceLock<BufferPool> = OnceLock::new();
        POOL.get_or_init(BufferPool::new)
    }

    /// Returns a zero-filled buffer of exactly `size` bytes.
    ///
    /// If a recycled buffer exists in the tier that fits `size`, it is
    /// reused (and its capacity is therefore the *tier's* size, not `size`
    /// itself). Requests larger than the biggest tier allocate outside the
    /// pool with exact capacity.
    pub fn get_free_buffer(&self, size: usize) -> Vec<u8> {
        let Some(idx) = tier_for(size) else {
            return vec![0u8; size];
        };

        let mut buf = {
            let mut tiers = self.tiers.lock();
            tiers[idx].free.pop()
        }
        .unwrap_or_else(|| Vec::with_capacity(TIERS[idx]));

        buf.clear();
        buf.resize(size, 0);
        buf
    }

    /// Returns a buffer to the pool for future reuse.
    ///
    /// A buffer recycles only if its capacity exactly matches one of the
    /// tiers (i.e. it was originally handed out by [`Self::get_free_buffer`])
    /// and that tier hasn't hit its recycling cap; otherwise it is dropped.
    pub fn reuse(&self, mut buf: Vec<u8>) {
        let Some(idx) = TIERS.iter().position(|&t| buf.capacity() == t) else {
            return;
        };

        let mut tiers = self.tiers.lock();
        if tiers[idx].free.len() < TIER_CAPS[idx] {
            buf.clear();
            tiers[idx].free.push(buf);
        }
    }

    /// Number of recycled buffers currently held in tier `idx` (test/debug
    /// helper).
    #[doc(hidden)]
    pub fn tier_len(&self, idx: usize) -> usize {
        self.tiers.lock()[idx].free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallest_fitting_tier_is_chosen() {
        assert_eq!(tier_for(1), Some(0));
        assert_eq!(tier_for(8), Some(0));
        assert_eq!(tier_for(9), Some(1));
        assert_eq!(tier_for(128), Some(1));
        assert_eq!(tier_for(129), Some(2));
        assert_eq!(tier_for(160_000), Some(6));
        assert_eq!(tier_for(160_001), None);
    }

    #[test]
    fn get_free_buffer_rounds_capacity_to_tier() {
        let pool = BufferPool::new();
        let buf = pool.get_free_buffer(10);
        assert_eq!(buf.len(), 10);
        assert_eq!(buf.capacity(), 128);
    }

    #[test]
    fn reuse_then_get_recycles_instance() {
        let pool = BufferPool::new();
        let buf = pool.get_free_buffer(100);
        let ptr = buf.as_ptr();
        pool.reuse(buf);
        assert_eq!(pool.tier_len(1), 1);

        let buf2 = pool.get_free_buffer(50);
        assert_eq!(buf2.as_ptr(), ptr, "expected the recycled allocation");
        assert_eq!(pool.tier_len(1), 0);
    }

    #[test]
    fn oversized_request_bypasses_pool() {
        let pool = BufferPool::new();
        let buf = pool.get_free_buffer(200_000);
        assert_eq!(buf.len(), 200_000);
        pool.reuse(buf);
        for idx in 0..7 {
            assert_eq!(pool.tier_len(idx), 0);
        }
    }

    #[test]
    fn tier_cap_is_enforced() {
        let pool = BufferPool::new();
        // Tier 0 (8 bytes) caps at 80 recycled instances.
        for _ in 0..90 {
            let buf = pool.get_free_buffer(8);
            pool.reuse(buf);
        }
        assert_eq!(pool.tier_len(0), 80);
    }

    #[test]
    fn recycled_buffer_is_zeroed_and_resized() {
        let pool = BufferPool::new();
        let mut buf = pool.get_free_buffer(8);
        buf.copy_from_slice(&[0xAAu8; 8]);
        pool.reuse(buf);

        let buf2 = pool.get_free_buffer(4);
        assert_eq!(buf2, vec![0u8; 4]);
    }
}
