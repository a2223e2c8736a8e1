//! 64-bit range argument over Pedersen commitments.
//!
//! Proves that a commitment `C = v·G + r·H` opens to `v ∈ [0, 2^64)`
//! without revealing `v`:
//!
//! 1. The prover commits to each bit, `C_i = b_i·G + r_i·H`, with bit
//!    blindings chosen so `Σ 2^i·r_i = r`; the verifier checks
//!    `Σ 2^i·C_i = C`, which forces `v = Σ 2^i·b_i`.
//! 2. A two-branch OR proof per bit shows `C_i` commits to 0 or 1
//!    (either `C_i = r_i·H` or `C_i − G = r_i·H`) without revealing
//!    which; the simulated branch's challenge share hides the bit.
//!
//! Comparisons reduce to ranges: `v ≥ min` is a range proof over the
//! shifted commitment `C − min·G`, which shares the blinding `r`.

use rand::{CryptoRng, RngCore};

use crate::curve::{Curve, Point, Scalar};
use crate::error::{Error, Result};
use crate::types::ByteReader;

use super::transcript::ProofTranscript;
use super::{put_point, put_scalar, read_point, read_scalar};

/// Width of the range in bits
pub const RANGE_BITS: usize = 64;

/// OR proof that one bit commitment opens to 0 or 1.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BitProof {
    t0: Point,
    t1: Point,
    e0: Scalar,
    s0: Scalar,
    s1: Scalar,
}

/// Range proof for a 64-bit committed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeProof {
    bit_commitments: Vec<Point>,
    bit_proofs: Vec<BitProof>,
}

impl RangeProof {
    /// Prove `value ∈ [0, 2^64)` for `C = value·G + blinding·H`.
    pub fn prove<R: RngCore + CryptoRng>(
        transcript: &mut ProofTranscript,
        value: u64,
        blinding: &Scalar,
        rng: &mut R,
    ) -> Result<Self> {
        let curve = transcript.curve();
        let g = curve.generator();
        let h = curve.pedersen_h();

        // Bit blindings with Σ 2^i·r_i = blinding: sample all but r_0,
        // then solve for it.
        let mut bit_blindings = vec![Scalar::zero(curve); RANGE_BITS];
        let mut weighted_sum = Scalar::zero(curve);
        for (i, slot) in bit_blindings.iter_mut().enumerate().skip(1) {
            let r_i = Scalar::random(curve, rng);
            let weight = pow2_scalar(curve, i);
            weighted_sum = weighted_sum.add(&r_i.mul(&weight)?)?;
            *slot = r_i;
        }
        bit_blindings[0] = blinding.sub(&weighted_sum)?;

        let mut bit_commitments = Vec::with_capacity(RANGE_BITS);
        for (i, r_i) in bit_blindings.iter().enumerate() {
            let bit = (value >> i) & 1;
            let mut c_i = h.mul(r_i)?;
            if bit == 1 {
                c_i = c_i.add(&g)?;
            }
            bit_commitments.push(c_i);
        }

        let mut bit_proofs = Vec::with_capacity(RANGE_BITS);
        for (i, (c_i, r_i)) in bit_commitments.iter().zip(bit_blindings.iter()).enumerate() {
            let bit = (value >> i) & 1;
            bit_proofs.push(prove_bit(transcript, &g, &h, c_i, r_i, bit == 1, rng)?);
        }

        Ok(Self {
            bit_commitments,
            bit_proofs,
        })
    }

    /// Verify against the commitment `C` the statement ranges over.
    pub fn verify(&self, transcript: &mut ProofTranscript, commitment: &Point) -> Result<bool> {
        let curve = transcript.curve();
        if self.bit_commitments.len() != RANGE_BITS || self.bit_proofs.len() != RANGE_BITS {
            return Err(Error::MalformedProof("wrong bit count".into()));
        }

        // Σ 2^i·C_i must reassemble the commitment
        let terms: Vec<(Scalar, Point)> = self
            .bit_commitments
            .iter()
            .enumerate()
            .map(|(i, c_i)| (pow2_scalar(curve, i), *c_i))
            .collect();
        if Point::lincomb(curve, &terms)? != *commitment {
            return Ok(false);
        }

        let g = curve.generator();
        let h = curve.pedersen_h();
        for (c_i, bit_proof) in self.bit_commitments.iter().zip(self.bit_proofs.iter()) {
            if !verify_bit(transcript, &g, &h, c_i, bit_proof)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        for c_i in &self.bit_commitments {
            put_point(out, c_i);
        }
        for bit_proof in &self.bit_proofs {
            put_point(out, &bit_proof.t0);
            put_point(out, &bit_proof.t1);
            put_scalar(out, &bit_proof.e0);
            put_scalar(out, &bit_proof.s0);
            put_scalar(out, &bit_proof.s1);
        }
    }

    pub(crate) fn decode(reader: &mut ByteReader<'_>, curve: Curve) -> Result<Self> {
        let mut bit_commitments = Vec::with_capacity(RANGE_BITS);
        for _ in 0..RANGE_BITS {
            bit_commitments.push(read_point(reader, curve)?);
        }
        let mut bit_proofs = Vec::with_capacity(RANGE_BITS);
        for _ in 0..RANGE_BITS {
            bit_proofs.push(BitProof {
                t0: read_point(reader, curve)?,
                t1: read_point(reader, curve)?,
                e0: read_scalar(reader, curve)?,
                s0: read_scalar(reader, curve)?,
                s1: read_scalar(reader, curve)?,
            });
        }
        Ok(Self {
            bit_commitments,
            bit_proofs,
        })
    }
}

/// CDS OR proof for one bit.
///
/// Branch 0 states `C = r·H`; branch 1 states `C − G = r·H`. The real
/// branch runs honestly; the other is simulated with a chosen challenge
/// share, and the transcript challenge pins their sum.
fn prove_bit<R: RngCore + CryptoRng>(
    transcript: &mut ProofTranscript,
    g: &Point,
    h: &Point,
    c: &Point,
    r: &Scalar,
    bit: bool,
    rng: &mut R,
) -> Result<BitProof> {
    let curve = transcript.curve();
    let c_minus_g = c.sub(g)?;

    let w = Scalar::random(curve, rng);
    let e_sim = Scalar::random(curve, rng);
    let s_sim = Scalar::random(curve, rng);

    let (t0, t1) = if bit {
        // simulate branch 0: T0 = s0·H − e0·C
        let t0 = h.mul(&s_sim)?.sub(&c.mul(&e_sim)?)?;
        let t1 = h.mul(&w)?;
        (t0, t1)
    } else {
        // simulate branch 1: T1 = s1·H − e1·(C − G)
        let t0 = h.mul(&w)?;
        let t1 = h.mul(&s_sim)?.sub(&c_minus_g.mul(&e_sim)?)?;
        (t0, t1)
    };

    transcript.append_point(b"range.bit", c);
    transcript.append_point(b"range.t0", &t0);
    transcript.append_point(b"range.t1", &t1);
    let e = transcript.challenge_scalar(b"range.challenge");

    let e_real = e.sub(&e_sim)?;
    let s_real = w.add(&e_real.mul(r)?)?;

    let (e0, s0, s1) = if bit {
        (e_sim, s_sim, s_real)
    } else {
        (e_real, s_real, s_sim)
    };

    Ok(BitProof { t0, t1, e0, s0, s1 })
}

fn verify_bit(
    transcript: &mut ProofTranscript,
    g: &Point,
    h: &Point,
    c: &Point,
    proof: &BitProof,
) -> Result<bool> {
    transcript.append_point(b"range.bit", c);
    transcript.append_point(b"range.t0", &proof.t0);
    transcript.append_point(b"range.t1", &proof.t1);
    let e = transcript.challenge_scalar(b"range.challenge");
    let e1 = e.sub(&proof.e0)?;

    // s0·H == T0 + e0·C
    let lhs0 = h.mul(&proof.s0)?;
    let rhs0 = proof.t0.add(&c.mul(&proof.e0)?)?;
    if lhs0 != rhs0 {
        return Ok(false);
    }

    // s1·H == T1 + e1·(C − G)
    let c_minus_g = c.sub(g)?;
    let lhs1 = h.mul(&proof.s1)?;
    let rhs1 = proof.t1.add(&c_minus_g.mul(&e1)?)?;
    Ok(lhs1 == rhs1)
}

fn pow2_scalar(curve: Curve, exponent: usize) -> Scalar {
    debug_assert!(exponent < RANGE_BITS);
    Scalar::from_u64(curve, 1u64 << exponent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{commit, commit_random};
    use rand::rngs::OsRng;

    fn transcripts(curve: Curve) -> (ProofTranscript, ProofTranscript) {
        (
            ProofTranscript::new(b"range-test", curve),
            ProofTranscript::new(b"range-test", curve),
        )
    }

    #[test]
    fn test_range_roundtrip() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            for value in [0u64, 1, 255, 42_000, u64::MAX] {
                let (commitment, blinding) = commit_random(curve, value, &mut OsRng).unwrap();
                let (mut prover, mut verifier) = transcripts(curve);

                let proof =
                    RangeProof::prove(&mut prover, value, &blinding, &mut OsRng).unwrap();
                assert!(
                    proof.verify(&mut verifier, commitment.point()).unwrap(),
                    "value {} on {}",
                    value,
                    curve
                );
            }
        }
    }

    #[test]
    fn test_range_rejects_wrong_commitment() {
        let curve = Curve::Secp256k1;
        let (_, blinding) = commit_random(curve, 500, &mut OsRng).unwrap();
        let other = commit(curve, 501, &blinding).unwrap();

        let (mut prover, mut verifier) = transcripts(curve);
        let proof = RangeProof::prove(&mut prover, 500, &blinding, &mut OsRng).unwrap();
        assert!(!proof.verify(&mut verifier, other.point()).unwrap());
    }

    #[test]
    fn test_range_rejects_tampered_bit_proof() {
        let curve = Curve::Ed25519;
        let (commitment, blinding) = commit_random(curve, 7, &mut OsRng).unwrap();

        let (mut prover, mut verifier) = transcripts(curve);
        let mut proof = RangeProof::prove(&mut prover, 7, &blinding, &mut OsRng).unwrap();
        proof.bit_proofs[3].s0 = proof.bit_proofs[3].s0.add(&Scalar::one(curve)).unwrap();
        assert!(!proof.verify(&mut verifier, commitment.point()).unwrap());
    }

    #[test]
    fn test_shifted_commitment_proves_minimum() {
        // v ≥ min via a range proof over C − min·G
        let curve = Curve::Secp256k1;
        let value = 10_000u64;
        let minimum = 2_500u64;
        let (commitment, blinding) = commit_random(curve, value, &mut OsRng).unwrap();

        let shift = curve
            .generator()
            .mul(&Scalar::from_u64(curve, minimum))
            .unwrap();
        let shifted = commitment.point().sub(&shift).unwrap();

        let (mut prover, mut verifier) = transcripts(curve);
        let proof =
            RangeProof::prove(&mut prover, value - minimum, &blinding, &mut OsRng).unwrap();
        assert!(proof.verify(&mut verifier, &shifted).unwrap());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let curve = Curve::Ed25519;
        let (commitment, blinding) = commit_random(curve, 123_456, &mut OsRng).unwrap();

        let mut prover = ProofTranscript::new(b"range-test", curve);
        let proof = RangeProof::prove(&mut prover, 123_456, &blinding, &mut OsRng).unwrap();

        let mut bytes = Vec::new();
        proof.encode(&mut bytes);
        let decoded = RangeProof::decode(&mut ByteReader::new(&bytes), curve).unwrap();
        assert_eq!(proof, decoded);

        let mut verifier = ProofTranscript::new(b"range-test", curve);
        assert!(decoded.verify(&mut verifier, commitment.point()).unwrap());
    }
}
