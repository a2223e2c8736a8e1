//! Schnorr-style sigma arguments.
//!
//! Two shapes cover every algebraic relation in the protocol:
//!
//! - knowledge of `x` with `P = x·B` (discrete log)
//! - knowledge of `(a, b)` with `C = a·G + b·H` (two-generator
//!   representation, i.e. a Pedersen opening)
//!
//! Challenges come from the caller's transcript, so each sub-proof is
//! bound to everything appended before it. Verification equations are
//! also exposed as linear-combination terms for the batch accumulator.

use rand::{CryptoRng, RngCore};

use crate::curve::{Point, Scalar};
use crate::error::Result;
use crate::types::ByteReader;

use super::transcript::ProofTranscript;
use super::{put_point, put_scalar, read_point, read_scalar};

// ─── Discrete log ─────────────────────────────────────────────────────────────

/// Proof of knowledge of `x` such that `P = x·B`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchnorrProof {
    pub commitment: Point,
    pub response: Scalar,
}

impl SchnorrProof {
    /// Prove knowledge of `secret` for `public = secret·base`.
    pub fn prove<R: RngCore + CryptoRng>(
        transcript: &mut ProofTranscript,
        base: &Point,
        public: &Point,
        secret: &Scalar,
        rng: &mut R,
    ) -> Result<Self> {
        let curve = transcript.curve();
        let w = Scalar::random(curve, rng);
        let commitment = base.mul(&w)?;

        transcript.append_point(b"schnorr.base", base);
        transcript.append_point(b"schnorr.public", public);
        transcript.append_point(b"schnorr.commitment", &commitment);
        let challenge = transcript.challenge_scalar(b"schnorr.challenge");

        let response = w.add(&challenge.mul(secret)?)?;
        Ok(Self {
            commitment,
            response,
        })
    }

    /// Verify `response·base == commitment + challenge·public`.
    pub fn verify(
        &self,
        transcript: &mut ProofTranscript,
        base: &Point,
        public: &Point,
    ) -> Result<bool> {
        transcript.append_point(b"schnorr.base", base);
        transcript.append_point(b"schnorr.public", public);
        transcript.append_point(b"schnorr.commitment", &self.commitment);
        let challenge = transcript.challenge_scalar(b"schnorr.challenge");

        let lhs = base.mul(&self.response)?;
        let rhs = self.commitment.add(&public.mul(&challenge)?)?;
        Ok(lhs == rhs)
    }

    /// The verification equation as terms summing to the identity:
    /// `response·base − commitment − challenge·public = O`.
    ///
    /// The caller must drive the transcript exactly as [`Self::verify`]
    /// does to obtain the challenge.
    pub fn equation_terms(
        &self,
        transcript: &mut ProofTranscript,
        base: &Point,
        public: &Point,
    ) -> Result<Vec<(Scalar, Point)>> {
        let curve = transcript.curve();
        transcript.append_point(b"schnorr.base", base);
        transcript.append_point(b"schnorr.public", public);
        transcript.append_point(b"schnorr.commitment", &self.commitment);
        let challenge = transcript.challenge_scalar(b"schnorr.challenge");

        Ok(vec![
            (self.response, *base),
            (Scalar::one(curve).neg(), self.commitment),
            (challenge.neg(), *public),
        ])
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        put_point(out, &self.commitment);
        put_scalar(out, &self.response);
    }

    pub(crate) fn decode(
        reader: &mut ByteReader<'_>,
        curve: crate::curve::Curve,
    ) -> Result<Self> {
        Ok(Self {
            commitment: read_point(reader, curve)?,
            response: read_scalar(reader, curve)?,
        })
    }
}

// ─── Two-generator representation ─────────────────────────────────────────────

/// Proof of knowledge of `(a, b)` such that `C = a·G + b·H`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepresentationProof {
    pub commitment: Point,
    pub response_g: Scalar,
    pub response_h: Scalar,
}

impl RepresentationProof {
    pub fn prove<R: RngCore + CryptoRng>(
        transcript: &mut ProofTranscript,
        g: &Point,
        h: &Point,
        public: &Point,
        a: &Scalar,
        b: &Scalar,
        rng: &mut R,
    ) -> Result<Self> {
        let curve = transcript.curve();
        let w_g = Scalar::random(curve, rng);
        let w_h = Scalar::random(curve, rng);
        let commitment = g.mul(&w_g)?.add(&h.mul(&w_h)?)?;

        transcript.append_point(b"repr.public", public);
        transcript.append_point(b"repr.commitment", &commitment);
        let challenge = transcript.challenge_scalar(b"repr.challenge");

        Ok(Self {
            commitment,
            response_g: w_g.add(&challenge.mul(a)?)?,
            response_h: w_h.add(&challenge.mul(b)?)?,
        })
    }

    /// Verify `s_g·G + s_h·H == commitment + challenge·C`.
    pub fn verify(
        &self,
        transcript: &mut ProofTranscript,
        g: &Point,
        h: &Point,
        public: &Point,
    ) -> Result<bool> {
        transcript.append_point(b"repr.public", public);
        transcript.append_point(b"repr.commitment", &self.commitment);
        let challenge = transcript.challenge_scalar(b"repr.challenge");

        let lhs = g.mul(&self.response_g)?.add(&h.mul(&self.response_h)?)?;
        let rhs = self.commitment.add(&public.mul(&challenge)?)?;
        Ok(lhs == rhs)
    }

    /// Verification equation as identity-summing terms for accumulation.
    pub fn equation_terms(
        &self,
        transcript: &mut ProofTranscript,
        g: &Point,
        h: &Point,
        public: &Point,
    ) -> Result<Vec<(Scalar, Point)>> {
        let curve = transcript.curve();
        transcript.append_point(b"repr.public", public);
        transcript.append_point(b"repr.commitment", &self.commitment);
        let challenge = transcript.challenge_scalar(b"repr.challenge");

        Ok(vec![
            (self.response_g, *g),
            (self.response_h, *h),
            (Scalar::one(curve).neg(), self.commitment),
            (challenge.neg(), *public),
        ])
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        put_point(out, &self.commitment);
        put_scalar(out, &self.response_g);
        put_scalar(out, &self.response_h);
    }

    pub(crate) fn decode(
        reader: &mut ByteReader<'_>,
        curve: crate::curve::Curve,
    ) -> Result<Self> {
        Ok(Self {
            commitment: read_point(reader, curve)?,
            response_g: read_scalar(reader, curve)?,
            response_h: read_scalar(reader, curve)?,
        })
    }
}
