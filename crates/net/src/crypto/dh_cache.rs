// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Diffie-Hellman prime validation cache.
//!
//! Caches the result of expensive primality checks on server-supplied
//! `dh_prime` values so a prime seen once (good or bad) is never re-checked.
//! The cache itself lives in `rustgram-dh-cache`; this module re-exports it
//! under the path the handshake code already imports from.

pub use rustgram_dh_cache::{DhCache, PrimeCheckResult};
