//! # SIP Core
//!
//! Privacy middleware for cross-chain value transfer. A sender expresses
//! an *intent* — convert asset A on chain X into asset B on chain Y,
//! delivered to a recipient — while the public ledger learns neither the
//! recipient, the amount, nor any link between payments.
//!
//! Three primitives, bound together by a three-proof protocol:
//!
//! - **Stealth addressing** — recipients publish a meta-address; every
//!   payment derives a fresh unlinkable one-time address
//! - **Amount hiding** — Pedersen commitments conceal values while
//!   permitting homomorphic combination and range assertions
//! - **Selective disclosure** — viewing keys decrypt per-payment metadata
//!   without granting spending authority
//!
//! ## Quick Start
//!
//! ```rust
//! use rand::rngs::OsRng;
//! use sip_core::{
//!     commitment::commit_random,
//!     stealth::{generate_stealth_address, StealthKeys},
//!     types::ChainTag,
//!     viewing::{ViewingKey, ViewingKeyType},
//! };
//!
//! // Recipient publishes a meta-address
//! let keys = StealthKeys::generate(ChainTag::Ethereum, &mut OsRng);
//! let meta = keys.meta_address().unwrap();
//!
//! // Sender derives a one-time stealth address
//! let stealth = generate_stealth_address(&meta, &mut OsRng).unwrap();
//!
//! // ... and hides the amount in a Pedersen commitment
//! let (commitment, blinding) = commit_random(
//!     ChainTag::Ethereum.curve(), 100, &mut OsRng).unwrap();
//!
//! // An auditor key can be derived for selective disclosure
//! let viewer = ViewingKey::derive(
//!     ChainTag::Ethereum.curve(), ViewingKeyType::Incoming, &[7u8; 32]).unwrap();
//! # let _ = (stealth, commitment, blinding, viewer);
//! ```

pub mod aead;
pub mod commitment;
pub mod crypto;
pub mod curve;
pub mod error;
pub mod intent;
pub mod ledger;
pub mod nullifier;
pub mod proof;
pub mod settlement;
pub mod stealth;
pub mod threshold;
pub mod types;
pub mod viewing;

pub use commitment::{
    bind_to_asset, blinding_add, blinding_sub, commit, commit_random, commit_zero,
    verify_opening, Commitment,
};
pub use curve::{hash_to_point, hash_to_scalar, Curve, Point, Scalar, SecretScalar};
pub use error::{Error, Result, RetryHint};
pub use intent::{Intent, IntentEngine, IntentState};
pub use nullifier::NullifierSet;
pub use proof::{
    Accumulator, FulfillmentProof, FulfillmentPublic, FulfillmentWitness, FundingProof,
    FundingPublic, FundingWitness, IntentSignature, OracleConfig, ProofKind, ValidityProof,
    ValidityPublic, ValidityWitness, Verdict,
};
pub use stealth::{
    derive_stealth_address, derive_stealth_spending_key, generate_stealth_address,
    StealthAddress, StealthAnnouncement, StealthKeys, StealthMetaAddress, StealthScanner,
};
pub use types::{
    ChainTag, DisclosurePolicy, DisclosurePurpose, FulfillmentEnvelope, IntentEnvelope,
    OracleAttestation, PrivacyLevel, ViewerPayload,
};
pub use viewing::{
    open_payment_record, seal_payment_record, PaymentRecord, ViewingKey, ViewingKeyType,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
