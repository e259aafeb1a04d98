// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! AES-IGE (Infinite Garble Extension) encryption/decryption.
//!
//! IGE mode is a variant of CBC mode that provides bidirectional error
//! propagation. It is used in MTProto 2.0 for encrypting packets.
//!
//! # Algorithm
//!
//! IGE mode uses two IV parts:
//! ```text
//! IV = IV1 || IV2  (each 16 bytes for AES-256)
//!
//! Encryption (for i = 0 to n-1):
//!     C[i] = E(K, P[i] ^ C[i-1]) ^ IV[i], where C[-1] = IV1
//!
//! Decryption (for i = 0 to n-1):
//!     P[i] = D(K, C[i] ^ IV[i]) ^ C[i-1], where C[-1] = IV2
//! ```
//!
//! # References
//!
//! - TDLib: `td/utils/crypto.cpp`
//! - MTProto: <https://core.telegram.org/mtproto/description>

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};
use aes::Aes256;

/// AES-256-IGE encryption context.
///
/// Provides AES-256 encryption in IGE (Infinite Garble Extension) mode.
///
/// # Examples
///
/// ```no_run
/// use rustgram_net::crypto::AesIge;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key = [0u8; 32];
/// let mut iv = [0u8; 32];
/// let mut data = vec![0u8; 64];
///
/// AesIge::encrypt(&key, &mut iv, &mut data);
/// # Ok(())
/// # }
/// ```
pub struct AesIge;

/// Block size for AES (16 bytes).
const AES_BLOCK_SIZE: usize = 16;

impl AesIge {
    /// Encrypts data in-place using AES-256-IGE mode.
    ///
    /// # Arguments
    ///
    /// * `key` - 256-bit (32 byte) encryption key
    /// * `iv` - 256-bit (32 byte) initialization vector (IV1 || IV2)
    /// * `data` - Data to encrypt, must be multiple of 16 bytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `data.len()` is not a multiple of 16
    /// - `data` is empty
    ///
    /// # Panics
    ///
    /// This function does not panic. All error conditions are handled via `Result`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use rustgram_net::crypto::AesIge;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let key = [42u8; 32];
    /// let mut iv = [1u8; 32];
    /// let mut plaintext = b"Hello, World!!!!".to_vec();  // 16 bytes (padded)
    ///
    /// AesIge::encrypt(&key, &mut iv, &mut plaintext)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn encrypt(key: &[u8; 32], iv: &mut [u8; 32], data: &mut [u8]) -> Result<(), CryptoError> {
        if data.is_empty() {
            return Err(CryptoError::EmptyData);
        }

        if data.len() % AES_BLOCK_SIZE != 0 {
            return Err(CryptoError::InvalidBlockSize {
                actual: data.len(),
                expected: AES_BLOCK_SIZE,
            });
        }

        // Split IV into IV1 and IV2
        let (iv1, iv2) = iv.split_at_mut(AES_BLOCK_SIZE);

        // Initialize AES cipher
        let mut cipher = Aes256::new(key.into());

        // IGE encryption: C[i] = E(K, P[i] ^ C[i-1]) ^ IV[i]
        // For encryption, C[-1] = IV1, and we use IV2 for XORing
        let mut prev_cipherblock = [0u8; AES_BLOCK_SIZE];
        prev_cipherblock.copy_from_slice(iv1);

        for chunk in data.chunks_exact_mut(AES_BLOCK_SIZE) {
            // XOR plaintext with previous ciphertext block (or IV1 for first block)
            let mut temp = [0u8; AES_BLOCK_SIZE];
            temp.copy_from_slice(chunk);
            xor_inplace(&mut temp, &prev_cipherblock);

            // Encrypt the block
            cipher.encrypt_block_mut((&mut temp).into());

            // XOR with IV2
            xor_inplace(&mut temp, iv2);

            // Store result and update previous cipherblock
            chunk.copy_from_slice(&temp);
            prev_cipherblock.copy_from_slice(chunk);
        }

        // Update IV1 with the last encrypted block for chaining
        iv[..AES_BLOCK_SIZE].copy_from_slice(&prev_cipherblock);

        Ok(())
    }

    /// Decrypts data in-place using AES-256-IGE mode.
    ///
    /// # Arguments
    ///
    /// * `key` - 256-bit (32 byte) decryption key
    /// * `iv` - 256-bit (32 byte) initialization vector (IV1 || IV2)
    /// * `data` - Data to decrypt, must be multiple of 16 bytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `data.len()` is not a multiple of 16
    /// - `data` is empty
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use rustgram_net::crypto::AesIge;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let key = [42u8; 32];
    /// let mut iv = [1u8; 32];
    /// let mut ciphertext = vec![0u8; 64];
    ///
    /// AesIge::decrypt(&key, &mut iv, &mut ciphertext)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn decrypt(key: &[u8; 32], iv: &mut [u8; 32], data: &mut [u8]) -> Result<(), CryptoError> {
        if data.is_empty() {
            return Err(CryptoError::EmptyData);
        }

        if data.len() % AES_BLOCK_SIZE != 0 {
            return Err(CryptoError::InvalidBlockSize {
                actual: data.len(),
                expected: AES_BLOCK_SIZE,
            });
        }

        // Split IV into IV1 and IV2
        let (iv1, iv2) = iv.split_at_mut(AES_BLOCK_SIZE);

        // Initialize AES cipher
        let mut cipher = Aes256::new(key.into());

        // IGE decryption: P[i] = D(K, C[i] ^ IV2) ^ C[i-1]
        // For decryption, C[-1] = IV1
        let mut prev_cipherblock = [0u8; AES_BLOCK_SIZE];
        prev_cipherblock.copy_from_slice(iv1);

        for chunk in data.chunks_exact_mut(AES_BLOCK_SIZE) {
            // Save current ciphertext block for next iteration
            let mut current_cipherblock = [0u8; AES_BLOCK_SIZE];
            current_cipherblock.copy_from_slice(chunk);

            // XOR ciphertext with IV2
            let mut temp = [0u8; AES_BLOCK_SIZE];
            temp.copy_from_slice(chunk);
            xor_inplace(&mut temp, iv2);

            // Decrypt the block
            cipher.decrypt_block_mut((&mut temp).into());

            // XOR with previous ciphertext block (or IV1 for first block)
            xor_inplace(&mut temp, &prev_cipherblock);

            // Store result
            chunk.copy_from_slice(&temp);

            // Store current ciphertext for next iteration
            prev_cipherblock = current_cipherblock;
        }

        Ok(())
    }
}

/// XORs `src` into `dst` in-place.
///
/// `dst` will contain `dst ^ src` after this operation.
#[inline]
fn xor_inplace(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d ^= s;
    }
}

/// Convenience function for AES-IGE encryption.
///
/// # Examples
///
/// ```no_run
/// # use rustgram_net::crypto::aes_ige_encrypt;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key = [0u8; 32];
/// let mut iv = [0u8; 32];
/// let mut data = vec![0u8; 64];
///
/// aes_ige_encrypt(&key, &mut iv, &mut data)?;
/// # Ok(())
/// # }
/// ```
pub fn aes_ige_encrypt(
    key: &[u8; 32],
    iv: &mut [u8; 32],
    data: &mut [u8],
) -> Result<(), CryptoError> {
    AesIge::encrypt(key, iv, data)
}

/// Convenience function for AES-IGE decryption.
///
/// # Examples
///
/// ```no_run
/// # use rustgram_net::crypto::aes_ige_decrypt;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key = [0u8; 32];
/// let mut iv = [0u8; 32];
/// let mut data = vec![0u8; 64];
///
/// aes_ige_decrypt(&key, &mut iv, &mut data)?;
/// # Ok(())
/// # }
/// ```
pub fn aes_ige_decrypt(
    key: &[u8; 32],
    iv: &mut [u8; 32],
    data: &mut [u8],
) -> Result<(), CryptoError> {
    AesIge::decrypt(key, iv, data)
}

/// Cryptography error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Data length is not a multiple of the block size.
    InvalidBlockSize {
        /// The actual data length.
        actual: usize,
        /// The expected block size.
        expected: usize,
    },

    /// Data is empty.
    EmptyData,

    /// Invalid key length.
    InvalidKeyLength {
        /// The actual key length.
        actual: usize,
        /// The expected key length.
        expected: usize,
    },
}

impl std::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBlockSize { actual, expected } => write!(
                f,
                "Invalid block size: data length ({}) is not a multiple of {}",
                actual, expected
            ),
            Self::EmptyData => write!(f, "Cannot encrypt/decrypt empty data"),
            Self::InvalidKeyLength { actual, expected } => write!(
                f,
                "Invalid key length: expected {}, got {}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for CryptoError {}
