//! Validity proof: intent authorization.
//!
//! Public inputs: `(intent_hash, sender_commitment, nullifier, timestamp,
//! expiry)`. Witness: `(sender_address, sender_blinding, sender_secret,
//! sender_pubkey, signature, nonce)`.
//!
//! The verifier independently re-checks the authorization constraints:
//! the proof carries the sender's public key, address, and signature, and
//! `verify` re-runs the signature check over the intent hash (secp256k1
//! signatures must be low-S), the mandatory key→address binding, and a
//! Schnorr proof that the sender commitment opens to exactly the carried
//! address (`C − address·G = blinding·H`, blinding never revealed).
//! Strict `timestamp < expiry` is checked on both sides.
//!
//! Carrying the authorization material makes those checks sound at the
//! cost of revealing the sender's key and address to whoever verifies the
//! proof; the circuit-compiled rendition keeps them inside the witness.
//!
//! One relation is enforced at proving time only: the nullifier hash
//! derivation `hash_to_scalar("SIP-NULLIFIER-v1", secret ‖ intent_hash ‖
//! nonce)`. A hash preimage cannot be proven with a sigma protocol; the
//! proof binds the nullifier bytes and a proof of knowledge of the
//! nullifier secret into its transcript, but the verifier does NOT check
//! that the public nullifier derives from that secret. See the known-gap
//! note in DESIGN.md; a hash-gadget circuit closes it.

use ed25519_dalek::Verifier;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::elliptic_curve::scalar::IsHigh;
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;

use crate::commitment::Commitment;
use crate::curve::{hash_to_point, hash_to_scalar, Curve, Point, Scalar};
use crate::error::{Error, Result};
use crate::stealth::eth_address;
use crate::types::ByteReader;

use super::funding::into_malformed;
use super::sigma::SchnorrProof;
use super::transcript::ProofTranscript;
use super::{read_curve, read_header, write_header, ProofKind, Verdict};

const TRANSCRIPT_LABEL: &[u8] = b"SIP-VALIDITY-v1";

/// Domain separation tag for nullifier derivation
pub const NULLIFIER_DOMAIN: &str = "SIP-NULLIFIER-v1";

/// Domain tag for the generator the nullifier-secret proof runs against
const NULLIFIER_GEN_DOMAIN: &str = "SIP-NULLIFIER-GEN-v1";

// ─── Signatures ───────────────────────────────────────────────────────────────

/// A sender's authorization signature over the intent hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentSignature {
    Ecdsa(k256::ecdsa::Signature),
    Ed25519(ed25519_dalek::Signature),
}

impl IntentSignature {
    /// Verify over a 32-byte message hash under `pubkey`.
    ///
    /// secp256k1 signatures with `s > order/2` are rejected as
    /// `SignatureMalleable` before any curve operation.
    pub fn verify(&self, msg_hash: &[u8; 32], pubkey: &Point) -> Result<()> {
        match (self, pubkey) {
            (IntentSignature::Ecdsa(sig), Point::Secp(_)) => {
                if bool::from(sig.s().is_high()) {
                    return Err(Error::SignatureMalleable);
                }
                let vk = k256::ecdsa::VerifyingKey::from_sec1_bytes(&pubkey.to_bytes())
                    .map_err(|_| Error::InvalidPoint("not a valid verifying key".into()))?;
                vk.verify_prehash(msg_hash, sig)
                    .map_err(|_| Error::ProofVerificationFailed("bad intent signature".into()))
            }
            (IntentSignature::Ed25519(sig), Point::Ed25519(_)) => {
                let key_bytes: [u8; 32] = pubkey
                    .to_bytes()
                    .try_into()
                    .map_err(|_| Error::InvalidPoint("bad key length".into()))?;
                let vk = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
                    .map_err(|_| Error::InvalidPoint("not a valid verifying key".into()))?;
                vk.verify(msg_hash, sig)
                    .map_err(|_| Error::ProofVerificationFailed("bad intent signature".into()))
            }
            _ => Err(Error::ChainMismatch(
                "signature scheme does not match key curve".into(),
            )),
        }
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        match self {
            IntentSignature::Ecdsa(sig) => {
                let mut out = [0u8; 64];
                out.copy_from_slice(&sig.to_bytes());
                out
            }
            IntentSignature::Ed25519(sig) => sig.to_bytes(),
        }
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        let scheme = match self {
            IntentSignature::Ecdsa(_) => 0u8,
            IntentSignature::Ed25519(_) => 1u8,
        };
        out.push(scheme);
        out.extend_from_slice(&self.to_bytes());
    }

    pub(crate) fn decode(reader: &mut ByteReader<'_>) -> Result<Self> {
        let scheme = reader.take_u8()?;
        let bytes = reader.take_array::<64>()?;
        match scheme {
            0 => k256::ecdsa::Signature::from_slice(&bytes)
                .map(IntentSignature::Ecdsa)
                .map_err(|_| Error::MalformedProof("bad ECDSA signature encoding".into())),
            1 => Ok(IntentSignature::Ed25519(ed25519_dalek::Signature::from_bytes(
                &bytes,
            ))),
            other => Err(Error::MalformedProof(format!(
                "unknown signature scheme {}",
                other
            ))),
        }
    }
}

// ─── Statement ────────────────────────────────────────────────────────────────

/// What the verifier sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityPublic {
    pub curve: Curve,
    pub intent_hash: [u8; 32],
    pub sender_commitment: Commitment,
    pub nullifier: [u8; 32],
    pub timestamp: u64,
    pub expiry: u64,
}

/// What the prover holds.
pub struct ValidityWitness {
    /// Chain-native sender address bytes
    pub sender_address: Vec<u8>,
    pub sender_blinding: Scalar,
    /// The nullifier secret
    pub sender_secret: Scalar,
    pub sender_pubkey: Point,
    pub signature: IntentSignature,
    pub nonce: [u8; 32],
}

/// A validity proof ready for verification or wire transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityProof {
    curve: Curve,
    sender_address: Vec<u8>,
    sender_pubkey: Point,
    signature: IntentSignature,
    blinding_proof: SchnorrProof,
    secret_tag: Point,
    secret_proof: SchnorrProof,
}

/// Derive the nullifier for a spend:
/// `hash_to_scalar("SIP-NULLIFIER-v1", secret ‖ intent_hash ‖ nonce)`.
pub fn derive_nullifier(
    sender_secret: &Scalar,
    intent_hash: &[u8; 32],
    nonce: &[u8; 32],
) -> [u8; 32] {
    let mut msg = Vec::with_capacity(96);
    msg.extend_from_slice(&sender_secret.to_bytes());
    msg.extend_from_slice(intent_hash);
    msg.extend_from_slice(nonce);
    hash_to_scalar(NULLIFIER_DOMAIN, &msg, sender_secret.curve()).to_bytes()
}

/// Interpret chain-native address bytes as a scalar for the sender
/// commitment `sender_address·G + sender_blinding·H`.
pub fn address_scalar(curve: Curve, address: &[u8]) -> Scalar {
    let mut wide = [0u8; 64];
    match curve {
        // big-endian scalars: low-order placement is the tail
        Curve::Secp256k1 => wide[64 - address.len()..].copy_from_slice(address),
        // little-endian scalars: low-order placement is the head
        Curve::Ed25519 => wide[..address.len()].copy_from_slice(address),
    }
    crate::curve::scalar_from_wide_bytes(curve, &wide)
}

impl ValidityProof {
    pub fn prove<R: RngCore + CryptoRng>(
        public: &ValidityPublic,
        witness: &ValidityWitness,
        rng: &mut R,
    ) -> Result<Self> {
        let curve = public.curve;
        check_witness_curves(curve, witness)?;

        // strict expiry window
        if public.timestamp >= public.expiry {
            return Err(Error::IntentExpired(format!(
                "timestamp {} not strictly before expiry {}",
                public.timestamp, public.expiry
            )));
        }

        // the commitment must recompute from the witness
        let addr_scalar = address_scalar(curve, &witness.sender_address);
        let recomputed = curve
            .generator()
            .mul(&addr_scalar)?
            .add(&curve.pedersen_h().mul(&witness.sender_blinding)?)?;
        if recomputed != *public.sender_commitment.point() {
            return Err(Error::InvalidCommitment(
                "witness does not open the sender commitment".into(),
            ));
        }

        // authorization signature over the intent hash (incl. low-S)
        witness
            .signature
            .verify(&public.intent_hash, &witness.sender_pubkey)?;

        // mandatory key-to-address binding
        verify_key_address_binding(curve, &witness.sender_pubkey, &witness.sender_address)?;

        // nullifier derivation; a hash preimage is outside what the sigma
        // arguments below can express, so this check does not recur in
        // `verify`
        let expected_nullifier =
            derive_nullifier(&witness.sender_secret, &public.intent_hash, &witness.nonce);
        if !bool::from(expected_nullifier.ct_eq(&public.nullifier)) {
            return Err(Error::ProofVerificationFailed(
                "nullifier does not derive from the witness".into(),
            ));
        }

        let mut transcript = ProofTranscript::new(TRANSCRIPT_LABEL, curve);
        absorb_public(&mut transcript, public);
        absorb_authorization(
            &mut transcript,
            &witness.sender_address,
            &witness.sender_pubkey,
            &witness.signature,
        );

        // C − address·G = blinding·H
        let h = curve.pedersen_h();
        let shifted = shifted_commitment(public, &witness.sender_address)?;
        let blinding_proof = SchnorrProof::prove(
            &mut transcript,
            &h,
            &shifted,
            &witness.sender_blinding,
            rng,
        )?;

        let nullifier_gen = hash_to_point(NULLIFIER_GEN_DOMAIN, b"", curve)?;
        let secret_tag = nullifier_gen.mul(&witness.sender_secret)?;
        transcript.append_point(b"secret_tag", &secret_tag);
        let secret_proof = SchnorrProof::prove(
            &mut transcript,
            &nullifier_gen,
            &secret_tag,
            &witness.sender_secret,
            rng,
        )?;

        Ok(Self {
            curve,
            sender_address: witness.sender_address.clone(),
            sender_pubkey: witness.sender_pubkey,
            signature: witness.signature.clone(),
            blinding_proof,
            secret_tag,
            secret_proof,
        })
    }

    pub fn verify(&self, public: &ValidityPublic) -> Verdict {
        match self.verify_inner(public) {
            Ok(()) => Verdict::Valid,
            Err(Error::MalformedProof(msg)) => Verdict::Malformed(msg),
            Err(e) => Verdict::Invalid(e.to_string()),
        }
    }

    fn verify_inner(&self, public: &ValidityPublic) -> Result<()> {
        let curve = public.curve;
        if self.curve != curve
            || public.sender_commitment.curve() != curve
            || self.sender_pubkey.curve() != curve
        {
            return Err(Error::ChainMismatch("proof curve".into()));
        }
        if public.timestamp >= public.expiry {
            return Err(Error::IntentExpired(format!(
                "timestamp {} not strictly before expiry {}",
                public.timestamp, public.expiry
            )));
        }

        // re-run the authorization checks against the carried material:
        // signature over the intent hash (incl. low-S rejection) and the
        // key-to-address binding
        self.signature
            .verify(&public.intent_hash, &self.sender_pubkey)?;
        verify_key_address_binding(curve, &self.sender_pubkey, &self.sender_address)?;

        let mut transcript = ProofTranscript::new(TRANSCRIPT_LABEL, curve);
        absorb_public(&mut transcript, public);
        absorb_authorization(
            &mut transcript,
            &self.sender_address,
            &self.sender_pubkey,
            &self.signature,
        );

        // the commitment opens to the carried address: knowledge of the
        // blinding for C − address·G over base H
        let h = curve.pedersen_h();
        let shifted = shifted_commitment(public, &self.sender_address)?;
        if !self.blinding_proof.verify(&mut transcript, &h, &shifted)? {
            return Err(Error::ProofVerificationFailed(
                "sender commitment does not open to the carried address".into(),
            ));
        }

        // knowledge of the nullifier secret behind the tag; the hash
        // derivation of `public.nullifier` itself is prover-side only
        let nullifier_gen = hash_to_point(NULLIFIER_GEN_DOMAIN, b"", curve)?;
        transcript.append_point(b"secret_tag", &self.secret_tag);
        if !self
            .secret_proof
            .verify(&mut transcript, &nullifier_gen, &self.secret_tag)?
        {
            return Err(Error::ProofVerificationFailed(
                "nullifier secret knowledge check failed".into(),
            ));
        }

        Ok(())
    }

    /// The sender address this proof authorizes for.
    pub fn sender_address(&self) -> &[u8] {
        &self.sender_address
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_header(&mut out, ProofKind::Validity);
        out.push(self.curve.id_byte());
        crate::types::put_vec(&mut out, &self.sender_address);
        out.extend_from_slice(&self.sender_pubkey.to_bytes());
        self.signature.encode(&mut out);
        self.blinding_proof.encode(&mut out);
        out.extend_from_slice(&self.secret_tag.to_bytes());
        self.secret_proof.encode(&mut out);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        (|| -> Result<Self> {
            read_header(&mut reader, ProofKind::Validity)?;
            let curve = read_curve(&mut reader)?;
            let sender_address = reader.take_vec()?;
            let sender_pubkey = Point::from_bytes(curve, reader.take(curve.point_len())?)?;
            let signature = IntentSignature::decode(&mut reader)?;
            let blinding_proof = SchnorrProof::decode(&mut reader, curve)?;
            let secret_tag = Point::from_bytes(curve, reader.take(curve.point_len())?)?;
            let secret_proof = SchnorrProof::decode(&mut reader, curve)?;
            reader.finish()?;
            Ok(Self {
                curve,
                sender_address,
                sender_pubkey,
                signature,
                blinding_proof,
                secret_tag,
                secret_proof,
            })
        })()
        .map_err(into_malformed)
    }
}

fn check_witness_curves(curve: Curve, witness: &ValidityWitness) -> Result<()> {
    if witness.sender_blinding.curve() != curve
        || witness.sender_secret.curve() != curve
        || witness.sender_pubkey.curve() != curve
    {
        return Err(Error::ChainMismatch("witness curve".into()));
    }
    Ok(())
}

/// The chain's canonical key→address rule.
fn verify_key_address_binding(curve: Curve, pubkey: &Point, address: &[u8]) -> Result<()> {
    let derived: Vec<u8> = match curve {
        Curve::Secp256k1 => eth_address(pubkey)?.to_vec(),
        Curve::Ed25519 => pubkey.to_bytes(),
    };
    if !bool::from(derived.ct_eq(address)) {
        return Err(Error::ProofVerificationFailed(
            "public key does not derive the sender address".into(),
        ));
    }
    Ok(())
}

fn shifted_commitment(public: &ValidityPublic, address: &[u8]) -> Result<Point> {
    let curve = public.curve;
    let shift = curve
        .generator()
        .mul(&address_scalar(curve, address))?;
    public.sender_commitment.point().sub(&shift)
}

fn absorb_public(transcript: &mut ProofTranscript, public: &ValidityPublic) {
    transcript.append_bytes(b"intent_hash", &public.intent_hash);
    transcript.append_point(b"sender_commitment", public.sender_commitment.point());
    transcript.append_bytes(b"nullifier", &public.nullifier);
    transcript.append_u64(b"timestamp", public.timestamp);
    transcript.append_u64(b"expiry", public.expiry);
}

fn absorb_authorization(
    transcript: &mut ProofTranscript,
    sender_address: &[u8],
    sender_pubkey: &Point,
    signature: &IntentSignature,
) {
    transcript.append_bytes(b"sender_address", sender_address);
    transcript.append_point(b"sender_pubkey", sender_pubkey);
    transcript.append_bytes(b"signature", &signature.to_bytes());
}
