//! Proof-composition accumulator.
//!
//! Every sigma verification in the protocol reduces to a linear equation
//! `Σ sᵢ·Pᵢ = O`. Instead of checking each equation with its own curve
//! arithmetic, a verifier can fold N of them into one accumulated
//! equation using transcript-derived random weights and perform a single
//! multiscalar check at the end: if any folded equation fails, the
//! combined check fails except with negligible probability in the weight.
//!
//! This is the non-recursive baseline of composition: accumulation over
//! a curve cycle (verifying the accumulator itself in-circuit) layers on
//! top without changing this interface.

use crate::curve::{Curve, Point, Scalar};
use crate::error::{Error, Result};

use super::transcript::ProofTranscript;

/// Folds verification equations into one deferred multiscalar check.
pub struct Accumulator {
    curve: Curve,
    transcript: ProofTranscript,
    terms: Vec<(Scalar, Point)>,
    count: usize,
}

impl Accumulator {
    pub fn new(curve: Curve) -> Self {
        Self {
            curve,
            transcript: ProofTranscript::new(b"SIP-ACCUMULATOR-v1", curve),
            terms: Vec::new(),
            count: 0,
        }
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Number of equations absorbed so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fold one verification equation (terms that must sum to the
    /// identity) into the accumulator.
    ///
    /// The weight for each equation is squeezed from a transcript that
    /// has absorbed every prior equation, so an adversary cannot craft
    /// equations that cancel.
    pub fn absorb_equation(&mut self, equation: &[(Scalar, Point)]) -> Result<()> {
        for (scalar, point) in equation {
            if scalar.curve() != self.curve || point.curve() != self.curve {
                return Err(Error::ChainMismatch("accumulator equation curve".into()));
            }
            self.transcript.append_scalar(b"acc.scalar", scalar);
            self.transcript.append_point(b"acc.point", point);
        }
        let weight = self.transcript.challenge_scalar(b"acc.weight");

        for (scalar, point) in equation {
            self.terms.push((weight.mul(scalar)?, *point));
        }
        self.count += 1;
        Ok(())
    }

    /// One multiscalar check over everything absorbed.
    ///
    /// An empty accumulator is vacuously valid.
    pub fn finalize(self) -> Result<bool> {
        Ok(Point::lincomb(self.curve, &self.terms)?.is_identity())
    }
}
