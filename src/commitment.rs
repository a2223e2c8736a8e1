//! Pedersen commitments for the SIP core.
//!
//! `C = v·G + r·H` on the tagged curve.
//!
//! # Security Properties
//!
//! - **Hiding (information-theoretic)**: with uniform `r`, `C` reveals
//!   nothing about `v`
//! - **Binding (computational)**: opening to a different `(v, r)` requires
//!   solving ECDLP
//! - **Homomorphic**: `C(v1, r1) + C(v2, r2) = C(v1+v2, r1+r2)`
//!
//! No range check happens here; the Funding proof enforces the 64-bit
//! range over the committed value.

use rand::{CryptoRng, RngCore};

use crate::curve::{Curve, Point, Scalar};
use crate::error::{Error, Result};

/// Domain separation tag binding a commitment to an asset
pub const COMMIT_BIND_DOMAIN: &str = "SIP-COMMIT-BIND-v1";

/// A Pedersen commitment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitment(Point);

impl Commitment {
    pub fn curve(&self) -> Curve {
        self.0.curve()
    }

    pub fn point(&self) -> &Point {
        &self.0
    }

    /// Parse a compressed commitment point.
    pub fn from_bytes(curve: Curve, bytes: &[u8]) -> Result<Self> {
        Point::from_bytes(curve, bytes)
            .map(Commitment)
            .map_err(|_| Error::InvalidCommitment("not a valid curve point".into()))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Homomorphic addition: commits to `v1 + v2` under `r1 + r2`.
    pub fn add(&self, other: &Commitment) -> Result<Commitment> {
        self.0.add(&other.0).map(Commitment)
    }

    /// Homomorphic subtraction: commits to `v1 - v2` under `r1 - r2`.
    pub fn sub(&self, other: &Commitment) -> Result<Commitment> {
        self.0.sub(&other.0).map(Commitment)
    }
}

/// Create a Pedersen commitment to `value` under the blinding factor `r`.
///
/// For `value = 0` the commitment degenerates to `r·H`, which is valid.
pub fn commit(curve: Curve, value: u64, blinding: &Scalar) -> Result<Commitment> {
    if blinding.curve() != curve {
        return Err(Error::ChainMismatch("blinding factor curve".into()));
    }
    let v = Scalar::from_u64(curve, value);
    let v_g = curve.generator().mul(&v)?;
    let r_h = curve.pedersen_h().mul(blinding)?;
    Ok(Commitment(v_g.add(&r_h)?))
}

/// Commit under a freshly sampled uniform blinding factor.
pub fn commit_random<R: RngCore + CryptoRng>(
    curve: Curve,
    value: u64,
    rng: &mut R,
) -> Result<(Commitment, Scalar)> {
    let blinding = Scalar::random(curve, rng);
    let commitment = commit(curve, value, &blinding)?;
    Ok((commitment, blinding))
}

/// Commit to zero: `C = r·H`.
pub fn commit_zero(curve: Curve, blinding: &Scalar) -> Result<Commitment> {
    commit(curve, 0, blinding)
}

/// Verify that a commitment opens to `(value, blinding)` by recomputation.
pub fn verify_opening(commitment: &Commitment, value: u64, blinding: &Scalar) -> Result<bool> {
    let recomputed = commit(commitment.curve(), value, blinding)?;
    Ok(recomputed == *commitment)
}

/// Add blinding factors mod the group order.
pub fn blinding_add(r1: &Scalar, r2: &Scalar) -> Result<Scalar> {
    r1.add(r2)
}

/// Subtract blinding factors mod the group order.
pub fn blinding_sub(r1: &Scalar, r2: &Scalar) -> Result<Scalar> {
    r1.sub(r2)
}

/// Hash-bind a commitment to an asset.
///
/// `hash_to_scalar(COMMIT_BIND_DOMAIN, C_x ‖ C_y ‖ asset_id)` — the public
/// input of the Funding proof. Binding the asset id prevents reusing one
/// commitment across assets.
pub fn bind_to_asset(commitment: &Commitment, asset_id: &[u8; 32]) -> [u8; 32] {
    let mut msg = commitment.0.binding_bytes();
    msg.extend_from_slice(asset_id);
    crate::curve::hash_to_scalar(COMMIT_BIND_DOMAIN, &msg, commitment.curve()).to_bytes()
}
