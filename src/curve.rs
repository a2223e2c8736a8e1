//! Tagged two-curve layer for the SIP core.
//!
//! Higher layers never touch `k256` or `curve25519-dalek` directly; they
//! work with the tagged [`Scalar`] and [`Point`] variants and get a
//! `ChainMismatch` error (never a panic) when operands disagree on the
//! curve.
//!
//! - secp256k1 backs the Ethereum family (EIP-5564 stealth, ECDSA).
//! - edwards25519 backs the Solana/NEAR family.
//!
//! Scalar multiplication is constant-time with respect to the scalar in
//! both backends. Compressed encodings are canonical: 33 bytes SEC1 for
//! secp256k1 (big-endian scalars), 32 bytes RFC 8032 for edwards25519
//! (little-endian scalars).

use blake2::Blake2b512;
use k256::elliptic_curve::{
    generic_array::GenericArray,
    group::GroupEncoding,
    ops::Reduce,
    sec1::ToEncodedPoint,
    Field, Group, PrimeField,
};
use k256::{AffinePoint, ProjectivePoint, Scalar as SecpScalar, U256};
use curve25519_dalek::{
    constants::ED25519_BASEPOINT_POINT,
    edwards::{CompressedEdwardsY, EdwardsPoint},
    scalar::Scalar as EdScalar,
    traits::{Identity, IsIdentity},
};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Domain separation tag for the independent Pedersen generator H
pub const H_DOMAIN: &str = "SIP-PEDERSEN-GENERATOR-H-v1";

/// The two curve domains the protocol runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    /// secp256k1 (Ethereum family)
    Secp256k1,
    /// edwards25519 (Solana / NEAR family)
    Ed25519,
}

impl Curve {
    /// One-byte identifier, used for domain separation in hash-to-point.
    pub fn id_byte(&self) -> u8 {
        match self {
            Curve::Secp256k1 => 0x01,
            Curve::Ed25519 => 0x02,
        }
    }

    /// Length of the canonical compressed point encoding.
    pub fn point_len(&self) -> usize {
        match self {
            Curve::Secp256k1 => 33,
            Curve::Ed25519 => 32,
        }
    }

    /// The base generator G.
    pub fn generator(&self) -> Point {
        match self {
            Curve::Secp256k1 => Point::Secp(ProjectivePoint::GENERATOR),
            Curve::Ed25519 => Point::Ed25519(ED25519_BASEPOINT_POINT),
        }
    }

    /// The independent Pedersen generator H.
    ///
    /// Derived by hash-to-curve from [`H_DOMAIN`] so that nobody knows
    /// `log_G(H)` (required for binding).
    pub fn pedersen_h(&self) -> Point {
        match self {
            Curve::Secp256k1 => Point::Secp(*H_SECP),
            Curve::Ed25519 => Point::Ed25519(*H_ED25519),
        }
    }
}

impl std::fmt::Display for Curve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Curve::Secp256k1 => write!(f, "secp256k1"),
            Curve::Ed25519 => write!(f, "ed25519"),
        }
    }
}

lazy_static::lazy_static! {
    static ref H_SECP: ProjectivePoint = match hash_to_point(H_DOMAIN, b"", Curve::Secp256k1) {
        Ok(Point::Secp(p)) => p,
        _ => panic!("failed to derive secp256k1 Pedersen generator - this should never happen"),
    };

    static ref H_ED25519: EdwardsPoint = match hash_to_point(H_DOMAIN, b"", Curve::Ed25519) {
        Ok(Point::Ed25519(p)) => p,
        _ => panic!("failed to derive ed25519 Pedersen generator - this should never happen"),
    };

    /// 2^256 mod n for secp256k1, used by the wide reduction.
    static ref SECP_WIDE_FACTOR: SecpScalar = {
        let mut f = SecpScalar::ONE;
        for _ in 0..256 {
            f = f + f;
        }
        f
    };
}

// ─── Scalar ───────────────────────────────────────────────────────────────────

/// A scalar in the curve's prime-order scalar field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Secp(SecpScalar),
    Ed25519(EdScalar),
}

impl Eq for Scalar {}

impl Scalar {
    pub fn curve(&self) -> Curve {
        match self {
            Scalar::Secp(_) => Curve::Secp256k1,
            Scalar::Ed25519(_) => Curve::Ed25519,
        }
    }

    pub fn zero(curve: Curve) -> Self {
        match curve {
            Curve::Secp256k1 => Scalar::Secp(SecpScalar::ZERO),
            Curve::Ed25519 => Scalar::Ed25519(EdScalar::ZERO),
        }
    }

    pub fn one(curve: Curve) -> Self {
        match curve {
            Curve::Secp256k1 => Scalar::Secp(SecpScalar::ONE),
            Curve::Ed25519 => Scalar::Ed25519(EdScalar::ONE),
        }
    }

    pub fn from_u64(curve: Curve, value: u64) -> Self {
        match curve {
            Curve::Secp256k1 => Scalar::Secp(SecpScalar::from(value)),
            Curve::Ed25519 => Scalar::Ed25519(EdScalar::from(value)),
        }
    }

    /// Parse a canonical 32-byte scalar encoding.
    ///
    /// Rejects encodings >= the group order with `InvalidScalar`. Byte
    /// order follows the curve convention: big-endian for secp256k1,
    /// little-endian for edwards25519.
    pub fn from_bytes(curve: Curve, bytes: &[u8; 32]) -> Result<Self> {
        match curve {
            Curve::Secp256k1 => {
                let repr = (*bytes).into();
                Option::from(SecpScalar::from_repr(repr))
                    .map(Scalar::Secp)
                    .ok_or_else(|| Error::InvalidScalar("non-canonical encoding".into()))
            }
            Curve::Ed25519 => Option::from(EdScalar::from_canonical_bytes(*bytes))
                .map(Scalar::Ed25519)
                .ok_or_else(|| Error::InvalidScalar("non-canonical encoding".into())),
        }
    }

    /// Canonical 32-byte encoding.
    pub fn to_bytes(&self) -> [u8; 32] {
        match self {
            Scalar::Secp(s) => s.to_bytes().into(),
            Scalar::Ed25519(s) => s.to_bytes(),
        }
    }

    /// Sample a uniform non-zero scalar.
    ///
    /// Rejection-sampled; zero is rejected so the result is always usable
    /// as a private key.
    pub fn random<R: RngCore + CryptoRng>(curve: Curve, rng: &mut R) -> Self {
        loop {
            let candidate = match curve {
                Curve::Secp256k1 => Scalar::Secp(SecpScalar::random(&mut *rng)),
                Curve::Ed25519 => Scalar::Ed25519(EdScalar::random(&mut *rng)),
            };
            if !candidate.is_zero() {
                return candidate;
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::Secp(s) => s.is_zero().into(),
            Scalar::Ed25519(s) => *s == EdScalar::ZERO,
        }
    }

    pub fn add(&self, other: &Scalar) -> Result<Scalar> {
        match (self, other) {
            (Scalar::Secp(a), Scalar::Secp(b)) => Ok(Scalar::Secp(a + b)),
            (Scalar::Ed25519(a), Scalar::Ed25519(b)) => Ok(Scalar::Ed25519(a + b)),
            _ => Err(curve_mismatch("scalar add")),
        }
    }

    pub fn sub(&self, other: &Scalar) -> Result<Scalar> {
        match (self, other) {
            (Scalar::Secp(a), Scalar::Secp(b)) => Ok(Scalar::Secp(a - b)),
            (Scalar::Ed25519(a), Scalar::Ed25519(b)) => Ok(Scalar::Ed25519(a - b)),
            _ => Err(curve_mismatch("scalar sub")),
        }
    }

    pub fn mul(&self, other: &Scalar) -> Result<Scalar> {
        match (self, other) {
            (Scalar::Secp(a), Scalar::Secp(b)) => Ok(Scalar::Secp(a * b)),
            (Scalar::Ed25519(a), Scalar::Ed25519(b)) => Ok(Scalar::Ed25519(a * b)),
            _ => Err(curve_mismatch("scalar mul")),
        }
    }

    pub fn neg(&self) -> Scalar {
        match self {
            Scalar::Secp(s) => Scalar::Secp(-s),
            Scalar::Ed25519(s) => Scalar::Ed25519(-s),
        }
    }

    /// Multiplicative inverse; zero has none.
    pub fn invert(&self) -> Result<Scalar> {
        if self.is_zero() {
            return Err(Error::InvalidScalar("zero has no inverse".into()));
        }
        match self {
            Scalar::Secp(s) => Option::from(s.invert())
                .map(Scalar::Secp)
                .ok_or_else(|| Error::InvalidScalar("zero has no inverse".into())),
            Scalar::Ed25519(s) => Ok(Scalar::Ed25519(s.invert())),
        }
    }
}

// ─── Point ────────────────────────────────────────────────────────────────────

/// A curve element. The identity is disallowed as a public key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Point {
    Secp(ProjectivePoint),
    Ed25519(EdwardsPoint),
}

impl Eq for Point {}

impl Point {
    pub fn curve(&self) -> Curve {
        match self {
            Point::Secp(_) => Curve::Secp256k1,
            Point::Ed25519(_) => Curve::Ed25519,
        }
    }

    pub fn identity(curve: Curve) -> Self {
        match curve {
            Curve::Secp256k1 => Point::Secp(ProjectivePoint::IDENTITY),
            Curve::Ed25519 => Point::Ed25519(EdwardsPoint::identity()),
        }
    }

    /// Parse a canonical compressed point encoding.
    ///
    /// Fails with `InvalidPoint` for the identity, off-curve encodings,
    /// wrong lengths, non-canonical encodings, and (on ed25519)
    /// torsioned points.
    pub fn from_bytes(curve: Curve, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != curve.point_len() {
            return Err(Error::InvalidPoint(format!(
                "expected {} bytes, got {}",
                curve.point_len(),
                bytes.len()
            )));
        }
        match curve {
            Curve::Secp256k1 => {
                if bytes[0] != 0x02 && bytes[0] != 0x03 {
                    return Err(Error::InvalidPoint("not a compressed SEC1 encoding".into()));
                }
                let affine: AffinePoint =
                    Option::from(AffinePoint::from_bytes(GenericArray::from_slice(bytes)))
                        .ok_or_else(|| Error::InvalidPoint("off-curve encoding".into()))?;
                let point = ProjectivePoint::from(affine);
                if bool::from(point.is_identity()) {
                    return Err(Error::InvalidPoint("identity point".into()));
                }
                Ok(Point::Secp(point))
            }
            Curve::Ed25519 => {
                let mut repr = [0u8; 32];
                repr.copy_from_slice(bytes);
                let compressed = CompressedEdwardsY(repr);
                let point = compressed
                    .decompress()
                    .ok_or_else(|| Error::InvalidPoint("off-curve encoding".into()))?;
                // Reject the few valid-looking but non-canonical sign encodings
                if point.compress().as_bytes() != &repr {
                    return Err(Error::InvalidPoint("non-canonical encoding".into()));
                }
                if point.is_identity() {
                    return Err(Error::InvalidPoint("identity point".into()));
                }
                if !point.is_torsion_free() {
                    return Err(Error::InvalidPoint("point has a torsion component".into()));
                }
                Ok(Point::Ed25519(point))
            }
        }
    }

    /// Canonical compressed encoding (33 bytes secp256k1, 32 bytes ed25519).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Point::Secp(p) => p.to_affine().to_bytes().to_vec(),
            Point::Ed25519(p) => p.compress().as_bytes().to_vec(),
        }
    }

    /// Uncompressed SEC1 encoding (65 bytes). secp256k1 only.
    pub fn to_uncompressed_sec1(&self) -> Result<[u8; 65]> {
        match self {
            Point::Secp(p) => {
                let encoded = p.to_affine().to_encoded_point(false);
                encoded
                    .as_bytes()
                    .try_into()
                    .map_err(|_| Error::InvalidPoint("identity has no SEC1 encoding".into()))
            }
            Point::Ed25519(_) => Err(curve_mismatch("uncompressed SEC1 encoding")),
        }
    }

    /// Coordinate bytes used when a hash must bind the point's position
    /// rather than its encoding: `x ‖ y` for secp256k1, the canonical
    /// compressed encoding for ed25519.
    pub fn binding_bytes(&self) -> Vec<u8> {
        match self {
            Point::Secp(p) => {
                let encoded = p.to_affine().to_encoded_point(false);
                // strip the 0x04 prefix
                encoded.as_bytes()[1..].to_vec()
            }
            Point::Ed25519(p) => p.compress().as_bytes().to_vec(),
        }
    }

    pub fn is_identity(&self) -> bool {
        match self {
            Point::Secp(p) => p.is_identity().into(),
            Point::Ed25519(p) => p.is_identity(),
        }
    }

    pub fn add(&self, other: &Point) -> Result<Point> {
        match (self, other) {
            (Point::Secp(a), Point::Secp(b)) => Ok(Point::Secp(a + b)),
            (Point::Ed25519(a), Point::Ed25519(b)) => Ok(Point::Ed25519(a + b)),
            _ => Err(curve_mismatch("point add")),
        }
    }

    pub fn sub(&self, other: &Point) -> Result<Point> {
        match (self, other) {
            (Point::Secp(a), Point::Secp(b)) => Ok(Point::Secp(a - b)),
            (Point::Ed25519(a), Point::Ed25519(b)) => Ok(Point::Ed25519(a - b)),
            _ => Err(curve_mismatch("point sub")),
        }
    }

    pub fn neg(&self) -> Point {
        match self {
            Point::Secp(p) => Point::Secp(-p),
            Point::Ed25519(p) => Point::Ed25519(-p),
        }
    }

    /// Scalar multiplication, constant-time w.r.t. the scalar.
    pub fn mul(&self, scalar: &Scalar) -> Result<Point> {
        match (self, scalar) {
            (Point::Secp(p), Scalar::Secp(s)) => Ok(Point::Secp(p * s)),
            (Point::Ed25519(p), Scalar::Ed25519(s)) => Ok(Point::Ed25519(p * s)),
            _ => Err(curve_mismatch("scalar-point mul")),
        }
    }

    /// Linear combination `Σ sᵢ·Pᵢ` over same-curve terms.
    ///
    /// Verifier-side helper; an empty term list yields the identity.
    pub fn lincomb(curve: Curve, terms: &[(Scalar, Point)]) -> Result<Point> {
        let mut acc = Point::identity(curve);
        for (s, p) in terms {
            acc = acc.add(&p.mul(s)?)?;
        }
        Ok(acc)
    }
}

fn curve_mismatch(op: &str) -> Error {
    Error::ChainMismatch(format!("mixed-curve operands in {}", op))
}

// ─── Hash-to-scalar / hash-to-point ───────────────────────────────────────────

/// Hash arbitrary data to a uniform scalar.
///
/// BLAKE2b-512 wide output reduced mod the group order. The domain tag is
/// length-prefixed so distinct tags can never collide.
pub fn hash_to_scalar(domain_tag: &str, msg: &[u8], curve: Curve) -> Scalar {
    let mut hasher = Blake2b512::new();
    hasher.update([domain_tag.len() as u8]);
    hasher.update(domain_tag.as_bytes());
    hasher.update(msg);
    let wide: [u8; 64] = hasher.finalize().into();
    scalar_from_wide_bytes(curve, &wide)
}

/// Reduce 64 uniform bytes to a uniform scalar.
///
/// Byte interpretation follows the curve convention (big-endian for
/// secp256k1, little-endian for edwards25519).
pub fn scalar_from_wide_bytes(curve: Curve, wide: &[u8; 64]) -> Scalar {
    match curve {
        Curve::Secp256k1 => Scalar::Secp(secp_wide_reduce(wide)),
        Curve::Ed25519 => Scalar::Ed25519(EdScalar::from_bytes_mod_order_wide(wide)),
    }
}

/// Reduce a 64-byte big-endian integer mod the secp256k1 order.
///
/// value = hi·2^256 + lo, so the result is reduce(hi)·(2^256 mod n) +
/// reduce(lo).
fn secp_wide_reduce(wide: &[u8; 64]) -> SecpScalar {
    let hi = <SecpScalar as Reduce<U256>>::reduce(U256::from_be_slice(&wide[..32]));
    let lo = <SecpScalar as Reduce<U256>>::reduce(U256::from_be_slice(&wide[32..]));
    hi * *SECP_WIDE_FACTOR + lo
}

/// Hash arbitrary data to a prime-subgroup point.
///
/// Try-and-increment with an 8-bit counter, domain-separated by the curve
/// id byte. On ed25519 the candidate is cofactor-cleared, so the result is
/// always torsion-free. The output is never the identity.
pub fn hash_to_point(domain_tag: &str, msg: &[u8], curve: Curve) -> Result<Point> {
    for counter in 0u8..=255 {
        let mut hasher = Sha256::new();
        hasher.update([domain_tag.len() as u8]);
        hasher.update(domain_tag.as_bytes());
        hasher.update([curve.id_byte(), counter]);
        hasher.update(msg);
        let digest: [u8; 32] = hasher.finalize().into();

        match curve {
            Curve::Secp256k1 => {
                let mut candidate = [0u8; 33];
                candidate[0] = 0x02;
                candidate[1..].copy_from_slice(&digest);
                if let Some(affine) = Option::<AffinePoint>::from(AffinePoint::from_bytes(
                    GenericArray::from_slice(&candidate),
                )) {
                    let point = ProjectivePoint::from(affine);
                    if !bool::from(point.is_identity()) {
                        return Ok(Point::Secp(point));
                    }
                }
            }
            Curve::Ed25519 => {
                if let Some(candidate) = CompressedEdwardsY(digest).decompress() {
                    let cleared = candidate.mul_by_cofactor();
                    if !cleared.is_identity() {
                        return Ok(Point::Ed25519(cleared));
                    }
                }
            }
        }
    }
    Err(Error::InvalidPoint(
        "hash-to-point counter exhausted".into(),
    ))
}

// ─── Zeroizing secret holder ──────────────────────────────────────────────────

/// A private scalar that zeroizes its bytes on drop.
///
/// Wallet-held secrets (master secrets, ephemeral keys, viewing secrets)
/// live in this wrapper; the raw [`Scalar`] is materialized only for the
/// duration of a computation.
pub struct SecretScalar {
    curve: Curve,
    bytes: [u8; 32],
}

impl SecretScalar {
    pub fn from_scalar(scalar: &Scalar) -> Self {
        Self {
            curve: scalar.curve(),
            bytes: scalar.to_bytes(),
        }
    }

    pub fn random<R: RngCore + CryptoRng>(curve: Curve, rng: &mut R) -> Self {
        Self::from_scalar(&Scalar::random(curve, rng))
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Materialize the scalar for a computation.
    pub fn to_scalar(&self) -> Result<Scalar> {
        Scalar::from_bytes(self.curve, &self.bytes)
    }

    /// The corresponding public point `secret·G`.
    pub fn public_point(&self) -> Result<Point> {
        self.curve.generator().mul(&self.to_scalar()?)
    }
}

impl Drop for SecretScalar {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_pedersen_h_independent_of_g() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let h = curve.pedersen_h();
            assert!(!h.is_identity());
            assert_ne!(h, curve.generator());
        }
    }

    #[test]
    fn test_scalar_roundtrip() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let s = Scalar::random(curve, &mut OsRng);
            let restored = Scalar::from_bytes(curve, &s.to_bytes()).unwrap();
            assert_eq!(s, restored);
        }
    }

    #[test]
    fn test_scalar_rejects_non_canonical() {
        // order - 1 is canonical, all-0xff is not, on either curve
        let all_ff = [0xffu8; 32];
        assert!(Scalar::from_bytes(Curve::Secp256k1, &all_ff).is_err());
        assert!(Scalar::from_bytes(Curve::Ed25519, &all_ff).is_err());
    }

    #[test]
    fn test_point_roundtrip() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let s = Scalar::random(curve, &mut OsRng);
            let p = curve.generator().mul(&s).unwrap();
            let restored = Point::from_bytes(curve, &p.to_bytes()).unwrap();
            assert_eq!(p, restored);
        }
    }

    #[test]
    fn test_point_rejects_identity() {
        let identity = Point::identity(Curve::Ed25519);
        assert!(Point::from_bytes(Curve::Ed25519, &identity.to_bytes()).is_err());
    }

    #[test]
    fn test_mixed_curve_rejected() {
        let a = Scalar::from_u64(Curve::Secp256k1, 7);
        let b = Scalar::from_u64(Curve::Ed25519, 7);
        assert!(matches!(a.add(&b), Err(Error::ChainMismatch(_))));

        let p = Curve::Secp256k1.generator();
        assert!(matches!(p.mul(&b), Err(Error::ChainMismatch(_))));
    }

    #[test]
    fn test_hash_to_scalar_deterministic_and_domain_separated() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let a = hash_to_scalar("SIP-TEST-v1", b"msg", curve);
            let b = hash_to_scalar("SIP-TEST-v1", b"msg", curve);
            let c = hash_to_scalar("SIP-TEST-v2", b"msg", curve);
            assert_eq!(a, b);
            assert_ne!(a, c);
        }
    }

    #[test]
    fn test_hash_to_point_subgroup() {
        let p = hash_to_point("SIP-TEST-v1", b"msg", Curve::Ed25519).unwrap();
        match p {
            Point::Ed25519(inner) => assert!(inner.is_torsion_free()),
            _ => unreachable!(),
        }
        assert!(!p.is_identity());
    }

    #[test]
    fn test_secp_wide_reduce_matches_small_values() {
        // A wide input below 2^256 must reduce like the canonical parse
        let mut wide = [0u8; 64];
        wide[63] = 42;
        let reduced = secp_wide_reduce(&wide);
        assert_eq!(reduced, SecpScalar::from(42u64));
    }

    #[test]
    fn test_lincomb_matches_naive() {
        let curve = Curve::Secp256k1;
        let g = curve.generator();
        let h = curve.pedersen_h();
        let a = Scalar::from_u64(curve, 3);
        let b = Scalar::from_u64(curve, 5);

        let combined = Point::lincomb(curve, &[(a, g), (b, h)]).unwrap();
        let naive = g.mul(&a).unwrap().add(&h.mul(&b).unwrap()).unwrap();
        assert_eq!(combined, naive);
    }

    #[test]
    fn test_secret_scalar_public_point() {
        let secret = SecretScalar::random(Curve::Ed25519, &mut OsRng);
        let public = secret.public_point().unwrap();
        assert!(!public.is_identity());
        assert_eq!(
            public,
            Curve::Ed25519
                .generator()
                .mul(&secret.to_scalar().unwrap())
                .unwrap()
        );
    }
}
