//! Cryptographic utilities for the SIP core.
//!
//! Provides low-level helpers shared by the engines:
//! - Hash functions (SHA-256, Keccak-256)
//! - Random number generation
//! - Intent ID generation
//! - Hex encoding with `0x` prefix

use rand::RngCore;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::error::{Error, Result};

/// Compute SHA-256 hash of data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute Keccak-256 hash of data (Ethereum-family addressing).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Generate cryptographically secure random bytes.
///
/// Uses the platform's secure random source.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate a fresh 32-byte intent identifier.
///
/// IDs are globally unique with negligible collision probability.
pub fn generate_intent_id() -> [u8; 32] {
    random_bytes::<32>()
}

/// Convert hex string (with or without `0x` prefix) to bytes.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(hex_str).map_err(|e| Error::InvalidHex(e.to_string()))
}

/// Convert hex string to a fixed-size array.
pub fn hex_to_array<const N: usize>(hex_str: &str) -> Result<[u8; N]> {
    let bytes = hex_to_bytes(hex_str)?;
    bytes
        .try_into()
        .map_err(|_| Error::InvalidHex(format!("expected {} bytes", N)))
}

/// Convert bytes to a lowercase hex string with `0x` prefix.
pub fn bytes_to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}
