// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! HMAC (Hash-based Message Authentication Code) functions for MTProto.
//!
//! This module provides HMAC-SHA256 and HMAC-SHA512 implementations
//! as specified in MTProto 2.0.
//!
//! # References
//!
//! - RFC 2104: HMAC: Keyed-Hashing for Message Authentication
//! - TDLib: `td/utils/crypto.h`

use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::{Sha256, Sha512};
use thiserror::Error;

/// Error types for HMAC operations.
#[derive(Debug, Error)]
pub enum HmacError {
    /// Invalid key length
    #[error("Invalid key length: {0}")]
    InvalidKeyLength(String),

    /// HMAC operation failed
    #[error("HMAC operation failed: {0}")]
    OperationFailed(String),
}

/// Type alias for HMAC-SHA256.
pub type HmacSha256 = Hmac<Sha256>;

/// Type alias for HMAC-SHA512.
pub type HmacSha512 = Hmac<Sha512>;

/// Computes HMAC-SHA256 of the given data with the provided key.
///
/// # Arguments
///
/// * `key` - The secret key (any length)
/// * `data` - The data to authenticate
///
/// # Returns
///
/// A 32-byte HMAC-SHA256 result
///
/// # Example
///
/// ```ignore
/// use rustgram_net::crypto::hmac_sha256;
///
/// let key = b"secret_key";
/// let data = b"message to authenticate";
/// let result = hmac_sha256(key, data);
/// assert_eq!(result.len(), 32);
/// ```
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    use hmac::Mac;
    let mut mac = HmacSha256::new_from_slice(key)
        .expect("HMAC can accept keys of any size");
    mac.update(data);
    let result = mac.finalize().into_bytes();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Computes HMAC-SHA512 of the given data with the provided key.
///
/// # Arguments
///
/// * `key` - The secret key (any length)
/// * `data` - The data to authenticate
///
/// # Returns
///
/// A 64-byte HMAC-SHA512 result
///
/// # Example
///
/// ```ignore
/// use rustgram_net::crypto::hmac_sha512;
///
/// let key = b"secret_key";
/// let data = b"message to authenticate";
/// let result = hmac_sha512(key, data);
/// assert_eq!(result.len(), 64);
/// ```
pub fn hmac_sha512(key: &[u8], data: &[u8]) -> [u8; 64] {
    use hmac::Mac;
    let mut mac = HmacSha512::new_from_slice(key)
        .expect("HMAC can accept keys of any size");
    mac.update(data);
    let result = mac.finalize().into_bytes();
    let mut output = [0u8; 64];
    output.copy_from_slice(&result);
    output
}

/// Computes PBKDF2-HMAC-SHA256 derived key.
///
/// This is used for key derivation in MTProto 2.0.
///
/// # Arguments
///
/// * `password` - The password bytes
/// * `salt` - The salt bytes
/// * `iterations` - Number of iterations (recommended: 100000+)
/// * `output` - Output buffer for the derived key
///
/// # Example
///
/// ```ignore
/// use rustgram_net::crypto::pbkdf2_hmac_sha256;
///
/// let password = b"my_password";
/// let salt = b"random_salt";
/// let mut key = [0u8; 32];
/// pbkdf2_hmac_sha256(password, salt, 100_000, &mut key);
/// ```
pub fn pbkdf2_hmac_sha256(password: &[u8], salt: &[u8], iterations: u32, output: &mut [u8]) {
    let _ = pbkdf2::<HmacSha256>(password, salt, iterations, output);
}

/// Computes PBKDF2-HMAC-SHA512 derived key.
///
/// # Arguments
///
/// * `password` - The password bytes
/// * `salt` - The salt bytes
/// * `iterations` - Number of iterations
/// * `output` - Output buffer for the derived key
pub fn pbkdf2_hmac_sha512(password: &[u8], salt: &[u8], iterations: u32, output: &mut [u8]) {
    let _ = pbkdf2::<HmacSha512>(password, salt, iterations, output);
}
