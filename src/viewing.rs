//! Viewing keys and selective disclosure.
//!
//! A viewing key lets its holder decrypt per-payment metadata without
//! gaining spending authority. Keys derive deterministically from the
//! wallet master secret; per-payment metadata is sealed to the viewer's
//! public key with an ephemeral ECDH session and XChaCha20-Poly1305.

use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::aead::{aead_open, aead_seal, KEY_LEN, NONCE_LEN};
use crate::curve::{hash_to_scalar, Curve, Point, Scalar, SecretScalar};
use crate::error::{Error, Result};
use crate::types::{ByteReader, IntentId, ViewerPayload};

/// Domain prefix for viewing-key derivation; completed by the type tag
const VIEWING_KEY_DOMAIN_PREFIX: &str = "SIP-VIEWINGKEY-";

/// Domain tag for the viewer ECDH shared secret
pub const VIEW_AEAD_DOMAIN: &str = "SIP-VIEW-AEAD-v1";

const VIEW_AEAD_KEY_DOMAIN: &[u8] = b"SIP-VIEW-AEAD-KEY-v1";
const VIEW_AEAD_NONCE_DOMAIN: &[u8] = b"SIP-VIEW-AEAD-NONCE-v1";

// ─── Key types ────────────────────────────────────────────────────────────────

/// What a viewing key can decrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ViewingKeyType {
    /// Payments to the owner
    Incoming,
    /// Payments from the owner
    Outgoing,
    /// Both directions
    Full,
}

impl ViewingKeyType {
    fn tag(&self) -> &'static str {
        match self {
            ViewingKeyType::Incoming => "incoming",
            ViewingKeyType::Outgoing => "outgoing",
            ViewingKeyType::Full => "full",
        }
    }
}

/// A viewing key: private scalar, public point, and a 32-byte non-secret
/// identifier used for indexing and disclosure targeting.
pub struct ViewingKey {
    key_type: ViewingKeyType,
    secret: SecretScalar,
    public: Point,
    key_hash: [u8; 32],
}

impl ViewingKey {
    /// Derive a viewing key from the wallet master secret.
    ///
    /// Incoming and outgoing keys hash the master secret under a
    /// type-tagged domain; the full key is the combination of both, so
    /// holding it is equivalent to holding the pair.
    pub fn derive(curve: Curve, key_type: ViewingKeyType, master_secret: &[u8; 32]) -> Result<Self> {
        Self::derive_with_generation(curve, key_type, master_secret, 0)
    }

    /// Derive a specific rotation generation of a viewing key.
    ///
    /// Rotation is supersession: the new generation replaces the old one
    /// and the prior key hash is marked revoked in the wallet ledger.
    pub fn derive_with_generation(
        curve: Curve,
        key_type: ViewingKeyType,
        master_secret: &[u8; 32],
        generation: u32,
    ) -> Result<Self> {
        let scalar = match key_type {
            ViewingKeyType::Incoming | ViewingKeyType::Outgoing => {
                derive_scalar(curve, key_type, master_secret, generation)
            }
            ViewingKeyType::Full => {
                let incoming =
                    derive_scalar(curve, ViewingKeyType::Incoming, master_secret, generation);
                let outgoing =
                    derive_scalar(curve, ViewingKeyType::Outgoing, master_secret, generation);
                incoming.add(&outgoing)?
            }
        };
        Self::from_scalar(key_type, &scalar)
    }

    fn from_scalar(key_type: ViewingKeyType, scalar: &Scalar) -> Result<Self> {
        if scalar.is_zero() {
            return Err(Error::DegenerateKey("viewing secret is zero".into()));
        }
        let public = scalar.curve().generator().mul(scalar)?;
        let key_hash = key_hash(&public);
        Ok(Self {
            key_type,
            secret: SecretScalar::from_scalar(scalar),
            public,
            key_hash,
        })
    }

    pub fn key_type(&self) -> ViewingKeyType {
        self.key_type
    }

    pub fn secret(&self) -> &SecretScalar {
        &self.secret
    }

    pub fn public(&self) -> &Point {
        &self.public
    }

    /// Non-secret identifier: SHA-256 of the public-key encoding.
    pub fn key_hash(&self) -> [u8; 32] {
        self.key_hash
    }
}

fn derive_scalar(
    curve: Curve,
    key_type: ViewingKeyType,
    master_secret: &[u8; 32],
    generation: u32,
) -> Scalar {
    let domain = format!("{}{}", VIEWING_KEY_DOMAIN_PREFIX, key_type.tag());
    let mut msg = Vec::with_capacity(36);
    msg.extend_from_slice(master_secret);
    msg.extend_from_slice(&generation.to_le_bytes());
    hash_to_scalar(&domain, &msg, curve)
}

/// Identifier for any viewer public key.
pub fn key_hash(public: &Point) -> [u8; 32] {
    crate::crypto::sha256(&public.to_bytes())
}

// ─── Payment records ──────────────────────────────────────────────────────────

/// The per-payment metadata a viewer can decrypt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    /// Sender identity bytes (chain-native address)
    pub sender: Vec<u8>,
    /// One-time stealth address the payment went to
    pub recipient_stealth: Vec<u8>,
    /// Plaintext amount
    pub amount: u64,
    /// Blinding factor opening the amount commitment
    pub blinding: [u8; 32],
    /// Free-form memo
    pub memo: String,
    /// Unix seconds
    pub timestamp: u64,
}

impl PaymentRecord {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        crate::types::put_vec(&mut out, &self.sender);
        crate::types::put_vec(&mut out, &self.recipient_stealth);
        out.extend_from_slice(&self.amount.to_le_bytes());
        out.extend_from_slice(&self.blinding);
        crate::types::put_vec(&mut out, self.memo.as_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out
    }

    fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let sender = reader.take_vec()?;
        let recipient_stealth = reader.take_vec()?;
        let amount = reader.take_u64()?;
        let blinding = reader.take_array::<32>()?;
        let memo_bytes = reader.take_vec()?;
        let timestamp = reader.take_u64()?;
        reader.finish()?;

        let memo = String::from_utf8(memo_bytes)
            .map_err(|_| Error::InvalidInput("memo is not valid UTF-8".into()))?;
        Ok(Self {
            sender,
            recipient_stealth,
            amount,
            blinding,
            memo,
            timestamp,
        })
    }
}

// ─── Sealing / opening ────────────────────────────────────────────────────────

/// Seal a payment record to a viewer's public key.
///
/// A fresh viewing-session scalar `f` yields the shared secret
/// `s = hash_to_scalar("SIP-VIEW-AEAD-v1", f·V)`; the AEAD key and nonce
/// derive from `s` under separate tags, and the intent id plus timestamp
/// ride in the associated data so a payload cannot be replayed against a
/// different intent.
pub fn seal_payment_record<R: RngCore + CryptoRng>(
    record: &PaymentRecord,
    viewer_pub: &Point,
    intent_id: &IntentId,
    rng: &mut R,
) -> Result<ViewerPayload> {
    let curve = viewer_pub.curve();
    let f = Scalar::random(curve, rng);
    let session_pub = curve.generator().mul(&f)?;

    let ecdh = viewer_pub.mul(&f)?;
    let (key, nonce) = derive_key_nonce(&ecdh);

    let aad = build_aad(intent_id, record.timestamp);
    let ciphertext = aead_seal(&key, &nonce, &aad, &record.encode())?;

    Ok(ViewerPayload {
        ephemeral_pub: session_pub.to_bytes(),
        ciphertext,
        aad,
    })
}

/// Open a sealed payment record with the viewer's private scalar.
pub fn open_payment_record(
    payload: &ViewerPayload,
    viewer_secret: &SecretScalar,
) -> Result<PaymentRecord> {
    let curve = viewer_secret.curve();
    let session_pub = Point::from_bytes(curve, &payload.ephemeral_pub)?;

    let ecdh = session_pub.mul(&viewer_secret.to_scalar()?)?;
    let (key, nonce) = derive_key_nonce(&ecdh);

    let plaintext = aead_open(&key, &nonce, &payload.aad, &payload.ciphertext)?;
    PaymentRecord::decode(&plaintext)
}

fn derive_key_nonce(ecdh: &Point) -> ([u8; KEY_LEN], [u8; NONCE_LEN]) {
    let s = hash_to_scalar(VIEW_AEAD_DOMAIN, &ecdh.to_bytes(), ecdh.curve());
    let s_bytes = s.to_bytes();

    let mut key_hasher = Sha256::new();
    key_hasher.update(VIEW_AEAD_KEY_DOMAIN);
    key_hasher.update(s_bytes);
    let key: [u8; 32] = key_hasher.finalize().into();

    let mut nonce_hasher = Sha256::new();
    nonce_hasher.update(VIEW_AEAD_NONCE_DOMAIN);
    nonce_hasher.update(s_bytes);
    let nonce_full: [u8; 32] = nonce_hasher.finalize().into();
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&nonce_full[..NONCE_LEN]);

    (key, nonce)
}

fn build_aad(intent_id: &IntentId, timestamp: u64) -> Vec<u8> {
    let mut aad = Vec::with_capacity(40);
    aad.extend_from_slice(intent_id);
    aad.extend_from_slice(&timestamp.to_be_bytes());
    aad
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    const MASTER: [u8; 32] = [0x11; 32];

    fn sample_record() -> PaymentRecord {
        PaymentRecord {
            sender: vec![0xaa; 20],
            recipient_stealth: vec![0xbb; 20],
            amount: 42_000,
            blinding: [0xcc; 32],
            memo: "invoice 7".to_string(),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_derivation_is_deterministic_and_typed() {
        let incoming = ViewingKey::derive(Curve::Secp256k1, ViewingKeyType::Incoming, &MASTER)
            .unwrap();
        let again = ViewingKey::derive(Curve::Secp256k1, ViewingKeyType::Incoming, &MASTER)
            .unwrap();
        let outgoing = ViewingKey::derive(Curve::Secp256k1, ViewingKeyType::Outgoing, &MASTER)
            .unwrap();

        assert_eq!(incoming.key_hash(), again.key_hash());
        assert_ne!(incoming.key_hash(), outgoing.key_hash());
    }

    #[test]
    fn test_full_key_combines_directions() {
        let curve = Curve::Ed25519;
        let incoming = ViewingKey::derive(curve, ViewingKeyType::Incoming, &MASTER).unwrap();
        let outgoing = ViewingKey::derive(curve, ViewingKeyType::Outgoing, &MASTER).unwrap();
        let full = ViewingKey::derive(curve, ViewingKeyType::Full, &MASTER).unwrap();

        let combined = incoming.public().add(outgoing.public()).unwrap();
        assert_eq!(*full.public(), combined);
    }

    #[test]
    fn test_rotation_changes_key() {
        let gen0 = ViewingKey::derive_with_generation(
            Curve::Secp256k1,
            ViewingKeyType::Incoming,
            &MASTER,
            0,
        )
        .unwrap();
        let gen1 = ViewingKey::derive_with_generation(
            Curve::Secp256k1,
            ViewingKeyType::Incoming,
            &MASTER,
            1,
        )
        .unwrap();
        assert_ne!(gen0.key_hash(), gen1.key_hash());
    }

    #[test]
    fn test_seal_open_roundtrip() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let viewer = ViewingKey::derive(curve, ViewingKeyType::Incoming, &MASTER).unwrap();
            let record = sample_record();
            let intent_id = [0x77; 32];

            let payload =
                seal_payment_record(&record, viewer.public(), &intent_id, &mut OsRng).unwrap();
            let opened = open_payment_record(&payload, viewer.secret()).unwrap();
            assert_eq!(opened, record);
        }
    }

    #[test]
    fn test_wrong_viewer_cannot_open() {
        let curve = Curve::Ed25519;
        let viewer = ViewingKey::derive(curve, ViewingKeyType::Incoming, &MASTER).unwrap();
        let other = ViewingKey::derive(curve, ViewingKeyType::Incoming, &[0x22; 32]).unwrap();

        let payload =
            seal_payment_record(&sample_record(), viewer.public(), &[0x77; 32], &mut OsRng)
                .unwrap();
        assert!(matches!(
            open_payment_record(&payload, other.secret()),
            Err(Error::ViewingKeyDecryptFailed)
        ));
    }

    #[test]
    fn test_tampered_aad_rejected() {
        let curve = Curve::Secp256k1;
        let viewer = ViewingKey::derive(curve, ViewingKeyType::Incoming, &MASTER).unwrap();

        let mut payload =
            seal_payment_record(&sample_record(), viewer.public(), &[0x77; 32], &mut OsRng)
                .unwrap();
        // re-point the payload at a different intent
        payload.aad[0] ^= 0x01;
        assert!(matches!(
            open_payment_record(&payload, viewer.secret()),
            Err(Error::ViewingKeyDecryptFailed)
        ));
    }
}
