// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Test configuration for MTProto servers.
//!
//! This module provides configuration for switching between production and test
//! Telegram data centers. It manages DC IP addresses and RSA keys for both
//! environments.
//!
//! # Example
//!
//! ```ignore
//! use rustgram_net::{set_test_mode, is_test_dc, get_dc_options};
//!
//! // Switch to test DC
//! set_test_mode(true);
//! assert!(is_test_dc());
//!
//! // Get test DC options
//! let dc_options = get_dc_options();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(dead_code)]
#![deny(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::dc::{DcId, DcOption, DcOptions};
use crate::rsa_key_shared::RsaKey;

/// Global state for environment (production/test).
static IS_TEST_DC: AtomicBool = AtomicBool::new(false);

/// Sets the mode for test DC.
///
/// When `is_test` is `true`, all subsequent calls to [`get_dc_options`] and
/// [`get_rsa_keys`] will return test environment configuration.
///
/// # Arguments
///
/// * `is_test` - `true` for test environment, `false` for production
///
/// # Example
///
/// ```
/// use rustgram_net::set_test_mode;
///
/// // Enable test DC mode
/// set_test_mode(true);
///
/// // Switch back to production
/// set_test_mode(false);
/// ```
pub fn set_test_mode(is_test: bool) {
    IS_TEST_DC.store(is_test, Ordering::SeqCst);
}

/// Returns `true` if test DC mode is enabled.
///
/// # Example
///
/// ```
/// use rustgram_net::{is_test_dc, set_test_mode};
///
/// assert!(!is_test_dc());
/// set_test_mode(true);
/// assert!(is_test_dc());
/// ```
pub fn is_test_dc() -> bool {
    IS_TEST_DC.load(Ordering::SeqCst)
}

/// Returns DC options for the current environment.
///
/// Returns test DC options if [`is_test_dc`] is `true`, otherwise returns
/// production DC options.
///
/// # Example
///
/// ```
/// use rustgram_net::{get_dc_options, set_test_mode, DcId};
///
/// // Get production DC options
/// set_test_mode(false);
/// let prod_options = get_dc_options();
///
/// // Get test DC options
/// set_test_mode(true);
/// let test_options = get_dc_options();
/// ```
pub fn get_dc_options() -> DcOptions {
    if is_test_dc() {
        test_dc_options()
    } else {
        production_dc_options()
    }
}

/// Parses a single DC option from an environment variable.
///
/// Reads the `RUSTGRAM_DC{N}` environment variable (e.g., `RUSTGRAM_DC2`)
/// and parses it in the format `IP:PORT`.
///
/// # Arguments
///
/// * `dc_id` - The numeric DC ID (1-5)
///
/// # Returns
///
/// * `Some(DcOption)` if the environment variable is set and valid
/// * `None` if the variable is not set or contains invalid data
///
/// # Example
///
/// ```ignore
/// std::env::set_var("RUSTGRAM_DC2", "149.154.167.51:443");
/// let dc2 = parse_dc_from_env(2);
/// assert!(dc2.is_some());
/// ```
fn parse_dc_from_env(dc_id: i32) -> Option<DcOption> {
    let env_var = format!("RUSTGRAM_DC{}", dc_id);
    std::env::var(&env_var).ok().and_then(|value| {
        // Handle IPv6 addresses which contain colons
        // Format: IP:PORT where IP can be IPv4 or IPv6
        // For IPv6, we look for the last colon which separates IP from PORT
        if let Some(last_colon_pos) = value.rfind(':') {
            let ip_str = &value[..last_colon_pos];
            let port_str = &value[last_colon_pos + 1..];

            // Strip brackets from IPv6 addresses if present
            let ip_str = ip_str.strip_prefix('[').unwrap_or(ip_str);
            let ip_str = ip_str.strip_suffix(']').unwrap_or(ip_str);

            let ip: IpAddr = ip_str.parse().ok()?;
            let port: u16 = port_str.parse().ok()?;
            Some(DcOption::new(DcId::internal(dc_id), ip, port))
        } else {
            None
        }
    })
}

/// Returns RSA keys for the current environment.
///
/// Returns test RSA keys if [`is_test_dc`] is `true`, otherwise returns
/// production RSA keys.
///
/// # Example
///
/// ```
/// use rustgram_net::{get_rsa_keys, set_test_mode};
///
/// // Get production RSA keys
/// set_test_mode(false);
/// let prod_keys = get_rsa_keys();
///
/// // Get test RSA keys
/// set_test_mode(true);
/// let test_keys = get_rsa_keys();
/// ```
pub fn get_rsa_keys() -> Vec<RsaKey> {
    if is_test_dc() {
        test_rsa_keys()
    } else {
        production_rsa_keys()
    }
}

/// Production DC options from TDLib.
///
/// Returns the default Data Centers that Telegram uses for production connections.
/// These are the official Telegram production servers.
///
/// Environment variables (`RUSTGRAM_DC1` through `RUSTGRAM_DC5`) override
/// the hardcoded defaults. The format is `IP:PORT` (e.g., `149.154.167.51:443`).
///
/// # Production DCs (defaults)
///
/// - DC 1: `149.154.175.50:443`
/// - DC 2: `149.154.167.51:443` (default for new auth)
/// - DC 3: `149.154.175.100:443`
/// - DC 4: `149.154.167.91:443`
/// - DC 5: `149.154.171.5:443`
fn production_dc_options() -> DcOptions {
    let mut options = DcOptions::new();

    // Try to load from environment variables, fall back to hardcoded defaults
    for dc_id in 1..=5 {
        if let Some(opt) = parse_dc_from_env(dc_id) {
            options.add(opt);
        } else {
            // Fall back to hardcoded defaults
            match dc_id {
                1 => options.add(DcOption::new(
                    DcId::internal(1),
                    IpAddr::V4(Ipv4Addr::new(149, 154, 175, 50)),
                    443,
                )),
                2 => options.add(DcOption::new(
                    DcId::internal(2),
                    IpAddr::V4(Ipv4Addr::new(149, 154, 167, 51)),
                    443,
                )),
                3 => options.add(DcOption::new(
                    DcId::internal(3),
                    IpAddr::V4(Ipv4Addr::new(149, 154, 175, 100)),
                    443,
                )),
                4 => options.add(DcOption::new(
                    DcId::internal(4),
                    IpAddr::V4(Ipv4Addr::new(149, 154, 167, 91)),
                    443,
                )),
                5 => options.add(DcOption::new(
                    DcId::internal(5),
                    IpAddr::V4(Ipv4Addr::new(149, 154, 171, 5)),
                    443,
                )),
                _ => {}
            }
        }
    }

    options
}

/// Test DC options from TDLib.
///
/// Returns the Data Centers that Telegram uses for test environment.
/// These are the official Telegram test servers.
///
/// Environment variables (`RUSTGRAM_DC1` through `RUSTGRAM_DC5`) override
/// the hardcoded defaults. The format is `IP:PORT` (e.g., `149.154.167.40:443`).
///
/// # Test DCs (defaults)
///
/// - Test DC 1: `149.154.175.10:443`
/// - Test DC 2: `149.154.167.40:443`
/// - Test DC 3: `149.154.175.117:443`
fn test_dc_options() -> DcOptions {
    let mut options = DcOptions::new();

    // Try to load from environment variables, fall back to hardcoded defaults
    for dc_id in 1..=3 {
        if let Some(opt) = parse_dc_from_env(dc_id) {
            options.add(opt);
        } else {
            // Fall back to hardcoded defaults
            match dc_id {
                1 => options.add(DcOption::new(
                    DcId::internal(1),
                    IpAddr::V4(Ipv4Addr::new(149, 154, 175, 10)),
                    443,
                )),
                2 => options.add(DcOption::new(
                    DcId::internal(2),
                    IpAddr::V4(Ipv4Addr::new(149, 154, 167, 40)),
                    443,
                )),
                3 => options.add(DcOption::new(
                    DcId::internal(3),
                    IpAddr::V4(Ipv4Addr::new(149, 154, 175, 117)),
                    443,
                )),
                _ => {}
            }
        }
    }

    options
}

/// Production RSA public keys.
///
/// These are the four 2048-bit RSA public keys Telegram production servers
/// advertise in `resPQ.server_public_key_fingerprints`; the fingerprint on
/// each entry is the exact value the server sends, not derived locally,
/// since [`RsaKey::compute_fingerprint`] hashes the PEM text rather than the
/// MTProto `(n, e)` TL-serialization and would not match the wire value.
fn production_rsa_keys() -> Vec<RsaKey> {
    vec![
        RsaKey::new(
            "-----BEGIN RSA PUBLIC KEY-----\n\
             MIIBCgKCAQEAruw2yP/BCcsJliRoW5eBVBVle9dtjJw+OYED160Wybum9SXtBBLX\n\
             riwt4rROd9csv0t0OHCaTmRqBcQ0J8fxhN6/cpR1GWgOZRUAiQxoMnlt0R93LCX/\n\
             j1dnVa/gVbCjdSxpbrfY2g2L4frzjJvdl84Kd9ORYjDEAyFnEA7dD556OptgLQQ2\n\
             e2iVNq8NZLYTzLp5YpOdO1doK+ttrltggTCy5SrKeLoCPPbOgGsdxJxyz5KKcZnS\n\
             Lj16yE5HvJQn0CNpRdENvRUXe6tBP78O39oJ8BTHp9oIjd6XWXAsp2CvK45Ol8wF\n\
             XGF710w9lwCGNbmNxNYhtIkdqfsEcwR5JwIDAQAB\n\
             -----END RSA PUBLIC KEY-----"
                .to_string(),
            0x0bc35f3509f7b7a5u64 as i64,
            2048,
        ),
        RsaKey::new(
            "-----BEGIN RSA PUBLIC KEY-----\n\
             MIIBCgKCAQEAvfLHfYH2r9R70w8prHblWt/nDkh+XkgpflqQVcnAfSuTtO05lNPs\n\
             pQmL8Y2XjVT4t8cT6xAkdgfmmvnvRPOOKPi0OfJXoRVylFzAQG/j83u5K3kRLbae\n\
             7fLccVhKZhY46lvsueI1hQdLgNV9n1cQ3TDS2pQOCtovG4eDl9wacrXOJTG2990V\n\
             jgnIKNA0UMoP+KF03qzryqIt3oTvZq03DyWdGK+AZjgBLaDKSnC6qD2cFY81UryR\n\
             WOab8zKkWAnhw2kFpcqhI0jdV5QaSCExvnsjVaX0Y1N0870931/5Jb9ICe4nweZ9\n\
             kSDF/gip3kWLG0o8XQpChDfyvsqB9OLV/wIDAQAB\n\
             -----END RSA PUBLIC KEY-----"
                .to_string(),
            0x15ae5fa8b5529542u64 as i64,
            2048,
        ),
        RsaKey::new(
            "-----BEGIN RSA PUBLIC KEY-----\n\
             MIIBCgKCAQEAs/ditzm+mPND6xkhzwFIz6J/968CtkcSE/7Z2qAJiXbmZ3UDJPGr\n\
             zqTDHkO30R8VeRM/Kz2f4nR05GIFiITl4bEjvpy7xqRDspJcCFIOcyXm8abVDhF+\n\
             th6knSU0yLtNKuQVP6voMrnt9MV1X92LGZQLgdHZbPQz0Z5qIpaKhdyA8DEvWWvS\n\
             Uwwc+yi1/gGaybwlzZwqXYoPOhwMebzKUk0xW14htcJrRrq+PXXQbRzTMynseCoP\n\
             Ioke0dtCodbA3qQxQovE16q9zz4Otv2k4j63cz53J+mhkVWAeWxVGI0lltJmWtEY\n\
             K6er8VqqWot3nqmWMXogrgRLggv/NbbooQIDAQAB\n\
             -----END RSA PUBLIC KEY-----"
                .to_string(),
            0xaeae98e13cd7f94fu64 as i64,
            2048,
        ),
        RsaKey::new(
            "-----BEGIN RSA PUBLIC KEY-----\n\
             MIIBCgKCAQEAvmpxVY7ld/8DAjz6F6q05shjg8/4p6047bn6/m8yPy1RBsvIyvuD\n\
             uGnP/RzPEhzXQ9UJ5Ynmh2XJZgHoE9xbnfxL5BXHplJhMtADXKM9bWB11PU1Eioc\n\
             3+AXBB8QiNFBn2XI5UkO5hPhbb9mJpjA9Uhw8EdfqJP8QetVsI/xrCEbwEXe0xvi\n\
             fRLJbY08/Gp66KpQvy7g8w7VB8wlgePexW3pT13Ap6vuC+mQuJPyiHvSxjEKHgqe\n\
             Pji9NP3tJUFQjcECqcm0yV7/2d0t/pbCm+ZH1sadZspQCEPPrtbkQBlvHb4OLiIW\n\
             PGHKSMeRFvp3IWcmdJqXahxLCUS1Eh6MAQIDAQAB\n\
             -----END RSA PUBLIC KEY-----"
                .to_string(),
            0x5a181b2235057d98u64 as i64,
            2048,
        ),
    ]
}

/// Test-environment RSA public keys.
///
/// The source tree does not declare a distinct key table for the test
/// backend (DCs 1-3 on port 80/443 with the "test" flag) — Telegram's test
/// DCs accept the same production key set, so this reuses
/// [`production_rsa_keys`] rather than inventing a second table.
fn test_rsa_keys() -> Vec<RsaKey> {
    production_rsa_keys()
}
