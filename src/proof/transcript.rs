//! Merlin transcript discipline shared by the three circuits.
//!
//! Every proof binds its public inputs, commitments, and sub-proof
//! commitments into one transcript; challenges are squeezed as wide bytes
//! and reduced to the circuit's scalar field. Prover and verifier must
//! append the exact same sequence or the challenges diverge and
//! verification fails.

use merlin::Transcript;

use crate::curve::{scalar_from_wide_bytes, Curve, Point, Scalar};

pub struct ProofTranscript {
    inner: Transcript,
    curve: Curve,
}

impl ProofTranscript {
    pub fn new(label: &'static [u8], curve: Curve) -> Self {
        let mut inner = Transcript::new(label);
        inner.append_message(b"curve", &[curve.id_byte()]);
        Self { inner, curve }
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    pub fn append_bytes(&mut self, label: &'static [u8], bytes: &[u8]) {
        self.inner.append_message(label, bytes);
    }

    pub fn append_u64(&mut self, label: &'static [u8], value: u64) {
        self.inner.append_u64(label, value);
    }

    pub fn append_point(&mut self, label: &'static [u8], point: &Point) {
        self.inner.append_message(label, &point.to_bytes());
    }

    pub fn append_scalar(&mut self, label: &'static [u8], scalar: &Scalar) {
        self.inner.append_message(label, &scalar.to_bytes());
    }

    /// Squeeze a uniform challenge scalar.
    pub fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar {
        let mut wide = [0u8; 64];
        self.inner.challenge_bytes(label, &mut wide);
        scalar_from_wide_bytes(self.curve, &wide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_inputs_same_challenge() {
        let mut a = ProofTranscript::new(b"test", Curve::Secp256k1);
        let mut b = ProofTranscript::new(b"test", Curve::Secp256k1);
        a.append_u64(b"n", 7);
        b.append_u64(b"n", 7);
        assert_eq!(a.challenge_scalar(b"c"), b.challenge_scalar(b"c"));
    }

    #[test]
    fn test_divergent_inputs_diverge() {
        let mut a = ProofTranscript::new(b"test", Curve::Secp256k1);
        let mut b = ProofTranscript::new(b"test", Curve::Secp256k1);
        a.append_u64(b"n", 7);
        b.append_u64(b"n", 8);
        assert_ne!(a.challenge_scalar(b"c"), b.challenge_scalar(b"c"));
    }

    #[test]
    fn test_curve_separates_transcripts() {
        let mut a = ProofTranscript::new(b"test", Curve::Secp256k1);
        let mut b = ProofTranscript::new(b"test", Curve::Ed25519);
        // same appends, different curve binding and field
        a.append_u64(b"n", 7);
        b.append_u64(b"n", 7);
        assert_ne!(
            a.challenge_scalar(b"c").to_bytes(),
            b.challenge_scalar(b"c").to_bytes()
        );
    }
}
