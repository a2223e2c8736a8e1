//! Error types for the SIP core.
//!
//! Every fallible operation returns a tagged error; there is no
//! exception-style control flow. Variants map onto the stable,
//! language-independent code taxonomy shared with the other SDKs
//! (`0100` input, `0200` stealth, `0300` commitment, `0400` viewing,
//! `0500` privacy level, `0600` proof, `0700` intent, `0800` oracle).

use thiserror::Error;

/// Result type for SIP core operations
pub type Result<T> = std::result::Result<T, Error>;

/// How a caller should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryHint {
    /// Not recoverable by retrying
    None,
    /// Retry immediately (e.g. regenerate with fresh randomness)
    Immediate,
    /// Retry after the given number of seconds
    Backoff(u64),
    /// Needs user action (refetch a quote, top up a balance)
    UserAction,
}

/// Error types for the SIP core
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed caller input that fits no more specific category
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid hex string format
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    /// Scalar encoding is non-canonical (>= group order)
    #[error("Invalid scalar: {0}")]
    InvalidScalar(String),

    /// Point encoding is the identity, off-curve, or in the wrong subgroup
    #[error("Invalid point: {0}")]
    InvalidPoint(String),

    /// Invalid stealth meta-address string
    #[error("Invalid stealth meta-address: {0}")]
    InvalidMetaAddress(String),

    /// Invalid derived stealth address
    #[error("Invalid stealth address: {0}")]
    InvalidStealthAddress(String),

    /// A derived public key degenerated to the identity point
    #[error("Degenerate key: {0}")]
    DegenerateKey(String),

    /// Operands belong to different curves / chains
    #[error("Chain mismatch: {0}")]
    ChainMismatch(String),

    /// Commitment failed to parse or open
    #[error("Invalid commitment: {0}")]
    InvalidCommitment(String),

    /// Value outside the permitted range
    #[error("Range violation: {0}")]
    RangeViolation(String),

    /// AEAD authentication failed while opening a viewer payload
    #[error("Viewing key decryption failed")]
    ViewingKeyDecryptFailed,

    /// A threshold share failed Feldman verification
    #[error("Invalid share: {0}")]
    InvalidShare(String),

    /// Fewer valid shares than the reconstruction threshold
    #[error("Below threshold: have {have}, need {need}")]
    BelowThreshold { have: usize, need: usize },

    /// Unknown privacy level string
    #[error("Invalid privacy level: {0}")]
    InvalidPrivacyLevel(String),

    /// A proof deserialized but did not verify
    #[error("Proof verification failed: {0}")]
    ProofVerificationFailed(String),

    /// A proof could not be deserialized at all
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    /// Nullifier already present in the spent set
    #[error("Nullifier reuse detected")]
    NullifierReuse,

    /// Intent past its expiry
    #[error("Intent expired: {0}")]
    IntentExpired(String),

    /// Event not defined for the intent's current state
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Oracle attestation malformed or signature invalid
    #[error("Oracle attestation invalid: {0}")]
    OracleAttestationInvalid(String),

    /// secp256k1 signature with high S rejected
    #[error("Malleable signature: s is not in the lower half of the order")]
    SignatureMalleable,

    /// Quote past its deadline; refetch from the adapter
    #[error("Quote expired at {deadline}")]
    QuoteExpired { deadline: u64 },

    /// Transient settlement-adapter failure (network, rate limit)
    #[error("Adapter error: {0}")]
    AdapterError(String),
}

impl Error {
    /// Stable numeric code shared across SDK implementations.
    pub fn code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) | Error::InvalidHex(_) | Error::InvalidScalar(_) => 0x0100,
            Error::InvalidPoint(_)
            | Error::InvalidMetaAddress(_)
            | Error::InvalidStealthAddress(_)
            | Error::DegenerateKey(_)
            | Error::ChainMismatch(_) => 0x0200,
            Error::InvalidCommitment(_) | Error::RangeViolation(_) => 0x0300,
            Error::ViewingKeyDecryptFailed
            | Error::InvalidShare(_)
            | Error::BelowThreshold { .. } => 0x0400,
            Error::InvalidPrivacyLevel(_) => 0x0500,
            Error::ProofVerificationFailed(_) | Error::MalformedProof(_) => 0x0600,
            Error::NullifierReuse
            | Error::IntentExpired(_)
            | Error::InvalidStateTransition(_)
            | Error::QuoteExpired { .. }
            | Error::AdapterError(_) => 0x0700,
            Error::OracleAttestationInvalid(_) | Error::SignatureMalleable => 0x0800,
        }
    }

    /// Recovery guidance surfaced to callers alongside the code.
    pub fn retry_hint(&self) -> RetryHint {
        match self {
            Error::AdapterError(_) => RetryHint::Backoff(1),
            Error::NullifierReuse => RetryHint::Immediate,
            Error::QuoteExpired { .. } | Error::RangeViolation(_) => RetryHint::UserAction,
            _ => RetryHint::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_families() {
        assert_eq!(Error::InvalidInput("x".into()).code(), 0x0100);
        assert_eq!(Error::InvalidMetaAddress("x".into()).code(), 0x0200);
        assert_eq!(Error::RangeViolation("x".into()).code(), 0x0300);
        assert_eq!(Error::ViewingKeyDecryptFailed.code(), 0x0400);
        assert_eq!(Error::InvalidPrivacyLevel("x".into()).code(), 0x0500);
        assert_eq!(Error::MalformedProof("x".into()).code(), 0x0600);
        assert_eq!(Error::NullifierReuse.code(), 0x0700);
        assert_eq!(Error::SignatureMalleable.code(), 0x0800);
    }

    #[test]
    fn test_retry_hints() {
        assert_eq!(
            Error::AdapterError("timeout".into()).retry_hint(),
            RetryHint::Backoff(1)
        );
        assert_eq!(Error::NullifierReuse.retry_hint(), RetryHint::Immediate);
        assert_eq!(
            Error::QuoteExpired { deadline: 7 }.retry_hint(),
            RetryHint::UserAction
        );
        assert_eq!(Error::SignatureMalleable.retry_hint(), RetryHint::None);
    }
}
