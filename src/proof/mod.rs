//! The three-circuit proof protocol.
//!
//! Three constraint systems cover the phases of an intent:
//!
//! 1. **Funding** — proves sufficient balance without revealing the amount
//! 2. **Validity** — proves intent authorization without revealing the sender
//! 3. **Fulfillment** — proves correct delivery against an oracle attestation
//!
//! Each circuit has typed public inputs and a typed witness. Proofs are
//! Fiat–Shamir sigma-protocol composites over a shared merlin transcript:
//! commitment openings use Schnorr and two-generator representation
//! proofs, ranges use 64-bit bit-decomposition arguments, and signatures
//! (sender authorization, oracle attestation) are carried in the proof
//! and re-verified natively. The prover evaluates all constraints against
//! the witness first and refuses to emit a proof for an unsatisfiable
//! statement, surfacing the precise typed error.
//!
//! Two relations are prover-side only: the nullifier and solver-id hash
//! derivations (`hash_to_scalar` preimages), which no sigma argument can
//! express. Their verifiers check knowledge of the underlying secret and
//! bind the public bytes into the transcript, but do not verify the hash
//! relation itself — the circuit-compiled rendition does. DESIGN.md
//! records this as the known gap of the baseline.
//!
//! Verification is deterministic: the same `(public inputs, proof bytes)`
//! always yield the same [`Verdict`]. Anything that fails to deserialize
//! is `Malformed`; anything that deserializes but fails a check is
//! `Invalid`.

pub mod accumulator;
pub mod fulfillment;
pub mod funding;
pub mod range;
pub mod sigma;
pub mod transcript;
pub mod validity;

use crate::curve::{Curve, Point, Scalar};
use crate::error::{Error, Result};
use crate::types::ByteReader;

pub use accumulator::Accumulator;
pub use fulfillment::{
    derive_solver_id, FulfillmentProof, FulfillmentPublic, FulfillmentWitness, OracleConfig,
};
pub use funding::{FundingProof, FundingPublic, FundingWitness};
pub use validity::{
    address_scalar, derive_nullifier, IntentSignature, ValidityProof, ValidityPublic,
    ValidityWitness,
};

/// Proof serialization format version
pub const PROOF_VERSION: u8 = 1;

/// The circuit a proof belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofKind {
    /// Funding proof - proves balance >= minimum
    Funding = 0,
    /// Validity proof - proves intent authorization
    Validity = 1,
    /// Fulfillment proof - proves correct delivery
    Fulfillment = 2,
}

impl ProofKind {
    /// Number of public inputs the circuit exposes.
    pub fn expected_public_inputs(&self) -> usize {
        match self {
            ProofKind::Funding => 3,
            ProofKind::Validity => 5,
            ProofKind::Fulfillment => 7,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProofKind::Funding => "funding",
            ProofKind::Validity => "validity",
            ProofKind::Fulfillment => "fulfillment",
        }
    }

    pub fn try_from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ProofKind::Funding),
            1 => Some(ProofKind::Validity),
            2 => Some(ProofKind::Fulfillment),
            _ => None,
        }
    }
}

/// Outcome of deterministic proof verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// Deserialized but failed a constraint; carries the failing check
    Invalid(String),
    /// Could not be deserialized
    Malformed(String),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

// ─── Shared codec helpers ─────────────────────────────────────────────────────

pub(crate) fn put_point(out: &mut Vec<u8>, point: &Point) {
    out.extend_from_slice(&point.to_bytes());
}

pub(crate) fn put_scalar(out: &mut Vec<u8>, scalar: &Scalar) {
    out.extend_from_slice(&scalar.to_bytes());
}

pub(crate) fn read_point(reader: &mut ByteReader<'_>, curve: Curve) -> Result<Point> {
    let bytes = reader.take(curve.point_len())?;
    Point::from_bytes(curve, bytes)
}

pub(crate) fn read_scalar(reader: &mut ByteReader<'_>, curve: Curve) -> Result<Scalar> {
    let bytes = reader.take_array::<32>()?;
    Scalar::from_bytes(curve, &bytes)
}

pub(crate) fn read_curve(reader: &mut ByteReader<'_>) -> Result<Curve> {
    match reader.take_u8()? {
        0x01 => Ok(Curve::Secp256k1),
        0x02 => Ok(Curve::Ed25519),
        other => Err(Error::MalformedProof(format!(
            "unknown curve id {}",
            other
        ))),
    }
}

/// Check the `(version, kind)` header all proof encodings start with.
pub(crate) fn read_header(reader: &mut ByteReader<'_>, expected: ProofKind) -> Result<()> {
    let version = reader.take_u8()?;
    if version != PROOF_VERSION {
        return Err(Error::MalformedProof(format!(
            "unsupported proof version {}",
            version
        )));
    }
    let kind = ProofKind::try_from_u8(reader.take_u8()?)
        .ok_or_else(|| Error::MalformedProof("unknown proof kind".into()))?;
    if kind != expected {
        return Err(Error::MalformedProof(format!(
            "expected a {} proof, got {}",
            expected.name(),
            kind.name()
        )));
    }
    Ok(())
}

pub(crate) fn write_header(out: &mut Vec<u8>, kind: ProofKind) {
    out.push(PROOF_VERSION);
    out.push(kind as u8);
}
