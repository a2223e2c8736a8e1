//! Authenticated encryption for viewer payloads.
//!
//! XChaCha20-Poly1305 with 24-byte nonces. Any tampering of ciphertext,
//! nonce, or associated data surfaces as `ViewingKeyDecryptFailed`; the
//! plaintext is never partially released.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};

use crate::error::{Error, Result};

/// AEAD key length in bytes
pub const KEY_LEN: usize = 32;

/// XChaCha20 nonce length in bytes
pub const NONCE_LEN: usize = 24;

/// Encrypt `plaintext` under `key`, authenticating `aad` alongside it.
pub fn aead_seal(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| Error::InvalidInput(format!("bad AEAD key: {}", e)))?;

    cipher
        .encrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| Error::InvalidInput(format!("AEAD seal failed: {}", e)))
}

/// Decrypt and authenticate; fails closed on any mismatch.
pub fn aead_open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| Error::InvalidInput(format!("bad AEAD key: {}", e)))?;

    cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| Error::ViewingKeyDecryptFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::random_bytes;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = random_bytes::<32>();
        let nonce = random_bytes::<24>();
        let plaintext = b"per-payment metadata";

        let ciphertext = aead_seal(&key, &nonce, b"aad", plaintext).unwrap();
        let decrypted = aead_open(&key, &nonce, b"aad", &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_single_bit_tamper_detected() {
        let key = random_bytes::<32>();
        let nonce = random_bytes::<24>();

        let mut ciphertext = aead_seal(&key, &nonce, b"aad", b"secret").unwrap();
        ciphertext[0] ^= 0x01;

        assert!(matches!(
            aead_open(&key, &nonce, b"aad", &ciphertext),
            Err(Error::ViewingKeyDecryptFailed)
        ));
    }

    #[test]
    fn test_aad_mismatch_detected() {
        let key = random_bytes::<32>();
        let nonce = random_bytes::<24>();

        let ciphertext = aead_seal(&key, &nonce, b"intent-1", b"secret").unwrap();
        assert!(matches!(
            aead_open(&key, &nonce, b"intent-2", &ciphertext),
            Err(Error::ViewingKeyDecryptFailed)
        ));
    }

    #[test]
    fn test_nonce_mismatch_detected() {
        let key = random_bytes::<32>();
        let nonce = random_bytes::<24>();
        let mut wrong_nonce = nonce;
        wrong_nonce[23] ^= 0x80;

        let ciphertext = aead_seal(&key, &nonce, b"aad", b"secret").unwrap();
        assert!(matches!(
            aead_open(&key, &wrong_nonce, b"aad", &ciphertext),
            Err(Error::ViewingKeyDecryptFailed)
        ));
    }
}
