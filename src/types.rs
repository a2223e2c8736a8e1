//! Shared type definitions for the SIP core.
//!
//! Chain tags, privacy levels, disclosure policy, and the wire envelopes
//! that cross the trust boundary into settlement adapters. Envelopes use a
//! length-prefixed byte codec; a truncated or oversized field is an
//! `InvalidInput` error, never a panic.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::crypto::sha256;
use crate::curve::Curve;
use crate::error::{Error, Result};

/// Asset identifier (32 bytes, chain-scoped)
pub type AssetId = [u8; 32];

/// Intent identifier (32 bytes)
pub type IntentId = [u8; 32];

// ─── Chain tags ───────────────────────────────────────────────────────────────

/// The chains a meta-address can be issued for.
///
/// Each tag fixes the curve domain and the chain-native address rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChainTag {
    Ethereum,
    Solana,
    Near,
}

impl ChainTag {
    /// The curve domain this chain's keys live on.
    pub fn curve(&self) -> Curve {
        match self {
            ChainTag::Ethereum => Curve::Secp256k1,
            ChainTag::Solana | ChainTag::Near => Curve::Ed25519,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainTag::Ethereum => "ethereum",
            ChainTag::Solana => "solana",
            ChainTag::Near => "near",
        }
    }

    fn code(&self) -> u8 {
        match self {
            ChainTag::Ethereum => 1,
            ChainTag::Solana => 2,
            ChainTag::Near => 3,
        }
    }

    fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(ChainTag::Ethereum),
            2 => Ok(ChainTag::Solana),
            3 => Ok(ChainTag::Near),
            other => Err(Error::InvalidInput(format!("unknown chain code {}", other))),
        }
    }
}

impl fmt::Display for ChainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ethereum" => Ok(ChainTag::Ethereum),
            "solana" => Ok(ChainTag::Solana),
            "near" => Ok(ChainTag::Near),
            other => Err(Error::InvalidMetaAddress(format!(
                "unknown chain tag: {}",
                other
            ))),
        }
    }
}

// ─── Privacy levels ───────────────────────────────────────────────────────────

/// Privacy levels for SIP transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrivacyLevel {
    /// No privacy, all data public
    Transparent,
    /// Full privacy, sender/amount/recipient hidden
    Shielded,
    /// Privacy with viewing key for auditors
    Compliant,
}

impl fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivacyLevel::Transparent => write!(f, "transparent"),
            PrivacyLevel::Shielded => write!(f, "shielded"),
            PrivacyLevel::Compliant => write!(f, "compliant"),
        }
    }
}

impl FromStr for PrivacyLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            // "off" is a legacy alias for transparent
            "transparent" | "off" => Ok(PrivacyLevel::Transparent),
            "shielded" => Ok(PrivacyLevel::Shielded),
            "compliant" => Ok(PrivacyLevel::Compliant),
            other => Err(Error::InvalidPrivacyLevel(other.to_string())),
        }
    }
}

/// Whether payloads are encrypted at this privacy level.
pub fn should_encrypt(level: PrivacyLevel) -> bool {
    matches!(level, PrivacyLevel::Shielded | PrivacyLevel::Compliant)
}

/// Whether a viewing key accompanies payments at this privacy level.
pub fn should_include_viewing_key(level: PrivacyLevel) -> bool {
    matches!(level, PrivacyLevel::Compliant)
}

// ─── Disclosure policy ────────────────────────────────────────────────────────

/// What a delegated auditor is allowed to see.
///
/// Purpose gating is boundary-layer access control: the holder of a
/// reconstructed viewing key can cryptographically perform all viewer
/// actions, so enforcement of purpose happens here, not in the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DisclosurePurpose {
    ViewBalance,
    ViewTransactions,
    ComplianceReport,
    FullDisclosure,
    RealTimeMonitoring,
}

/// Per-purpose share thresholds for threshold disclosure.
#[derive(Debug, Clone, Default)]
pub struct DisclosurePolicy {
    thresholds: HashMap<DisclosurePurpose, u32>,
}

impl DisclosurePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, purpose: DisclosurePurpose, threshold: u32) -> Self {
        self.thresholds.insert(purpose, threshold);
        self
    }

    /// Shares required before this purpose may be served.
    pub fn threshold_for(&self, purpose: DisclosurePurpose) -> Option<u32> {
        self.thresholds.get(&purpose).copied()
    }
}

// ─── Viewer payload ───────────────────────────────────────────────────────────

/// Encrypted per-payment metadata published alongside a payment.
///
/// `ephemeral_pub` is the sender's viewing-session public key `f·G`; the
/// viewer recovers the AEAD key from `f·G` and their private scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewerPayload {
    pub ephemeral_pub: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub aad: Vec<u8>,
}

// ─── Oracle attestation ───────────────────────────────────────────────────────

/// Domain prefix of the oracle's signed message body
pub const ORACLE_DOMAIN: &[u8] = b"SIP-ORACLE-v1";

/// An oracle's statement that a delivery landed on the destination chain.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OracleAttestation {
    /// Chain-native recipient address bytes
    pub recipient: Vec<u8>,
    /// Delivered amount
    pub amount: u64,
    /// Destination-chain transaction hash
    pub tx_hash: [u8; 32],
    /// Destination-chain block height
    pub block: u64,
}

impl OracleAttestation {
    /// The canonical signed message body. Intent binding is part of the
    /// signature; attestations signed without it are non-compliant.
    pub fn signed_body(&self, intent_id: &IntentId) -> Vec<u8> {
        let mut body =
            Vec::with_capacity(ORACLE_DOMAIN.len() + 32 + self.recipient.len() + 8 + 32 + 8);
        body.extend_from_slice(ORACLE_DOMAIN);
        body.extend_from_slice(intent_id);
        body.extend_from_slice(&self.recipient);
        body.extend_from_slice(&self.amount.to_be_bytes());
        body.extend_from_slice(&self.tx_hash);
        body.extend_from_slice(&self.block.to_be_bytes());
        body
    }

    /// SHA-256 of the signed body; the message the oracle actually signs.
    pub fn msg_hash(&self, intent_id: &IntentId) -> [u8; 32] {
        sha256(&self.signed_body(intent_id))
    }
}

// ─── Byte codec helpers ───────────────────────────────────────────────────────

pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.data.len() < self.offset + n {
            return Err(Error::InvalidInput("truncated envelope".into()));
        }
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn take_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take_array::<8>()?))
    }

    pub fn take_vec(&mut self) -> Result<Vec<u8>> {
        let len = u32::from_le_bytes(self.take_array::<4>()?) as usize;
        if len > MAX_FIELD_LEN {
            return Err(Error::InvalidInput(format!(
                "envelope field of {} bytes exceeds limit",
                len
            )));
        }
        Ok(self.take(len)?.to_vec())
    }

    pub fn finish(&self) -> Result<()> {
        if self.offset != self.data.len() {
            return Err(Error::InvalidInput("trailing bytes in envelope".into()));
        }
        Ok(())
    }
}

/// Upper bound on any single length-prefixed field
const MAX_FIELD_LEN: usize = 1 << 20;

pub(crate) fn put_vec(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

// ─── Intent envelope ──────────────────────────────────────────────────────────

/// Everything an adapter sees when an intent is submitted.
///
/// Amounts appear only as commitments and a public minimum-output
/// threshold; recipient identity only as a one-time stealth address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentEnvelope {
    pub intent_id: IntentId,
    pub chain_src: ChainTag,
    pub chain_dst: ChainTag,
    pub asset_src: AssetId,
    pub asset_dst: AssetId,
    pub input_commitment: Vec<u8>,
    pub output_commitment: Vec<u8>,
    pub min_output: u64,
    pub recipient_stealth: Vec<u8>,
    pub ephemeral_pub: Vec<u8>,
    pub view_tag: u8,
    pub viewer_payload: ViewerPayload,
    pub nullifier: [u8; 32],
    pub expiry: u64,
    pub funding_proof: Vec<u8>,
    pub validity_proof: Vec<u8>,
    pub viewing_key_hashes: Vec<[u8; 32]>,
}

impl IntentEnvelope {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.intent_id);
        out.push(self.chain_src.code());
        out.push(self.chain_dst.code());
        out.extend_from_slice(&self.asset_src);
        out.extend_from_slice(&self.asset_dst);
        put_vec(&mut out, &self.input_commitment);
        put_vec(&mut out, &self.output_commitment);
        out.extend_from_slice(&self.min_output.to_le_bytes());
        put_vec(&mut out, &self.recipient_stealth);
        put_vec(&mut out, &self.ephemeral_pub);
        out.push(self.view_tag);
        put_vec(&mut out, &self.viewer_payload.ephemeral_pub);
        put_vec(&mut out, &self.viewer_payload.ciphertext);
        put_vec(&mut out, &self.viewer_payload.aad);
        out.extend_from_slice(&self.nullifier);
        out.extend_from_slice(&self.expiry.to_le_bytes());
        put_vec(&mut out, &self.funding_proof);
        put_vec(&mut out, &self.validity_proof);
        out.extend_from_slice(&(self.viewing_key_hashes.len() as u32).to_le_bytes());
        for hash in &self.viewing_key_hashes {
            out.extend_from_slice(hash);
        }
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let intent_id = reader.take_array::<32>()?;
        let chain_src = ChainTag::from_code(reader.take_u8()?)?;
        let chain_dst = ChainTag::from_code(reader.take_u8()?)?;
        let asset_src = reader.take_array::<32>()?;
        let asset_dst = reader.take_array::<32>()?;
        let input_commitment = reader.take_vec()?;
        let output_commitment = reader.take_vec()?;
        let min_output = reader.take_u64()?;
        let recipient_stealth = reader.take_vec()?;
        let ephemeral_pub = reader.take_vec()?;
        let view_tag = reader.take_u8()?;
        let viewer_payload = ViewerPayload {
            ephemeral_pub: reader.take_vec()?,
            ciphertext: reader.take_vec()?,
            aad: reader.take_vec()?,
        };
        let nullifier = reader.take_array::<32>()?;
        let expiry = reader.take_u64()?;
        let funding_proof = reader.take_vec()?;
        let validity_proof = reader.take_vec()?;
        let hash_count = u32::from_le_bytes(reader.take_array::<4>()?) as usize;
        if hash_count > 1024 {
            return Err(Error::InvalidInput("too many viewing key hashes".into()));
        }
        let mut viewing_key_hashes = Vec::with_capacity(hash_count);
        for _ in 0..hash_count {
            viewing_key_hashes.push(reader.take_array::<32>()?);
        }
        reader.finish()?;

        Ok(Self {
            intent_id,
            chain_src,
            chain_dst,
            asset_src,
            asset_dst,
            input_commitment,
            output_commitment,
            min_output,
            recipient_stealth,
            ephemeral_pub,
            view_tag,
            viewer_payload,
            nullifier,
            expiry,
            funding_proof,
            validity_proof,
            viewing_key_hashes,
        })
    }
}

// ─── Fulfillment envelope ─────────────────────────────────────────────────────

/// What a solver submits to close out an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentEnvelope {
    pub intent_id: IntentId,
    pub output_commitment: Vec<u8>,
    pub solver_id: [u8; 32],
    pub fulfillment_time: u64,
    pub fulfillment_proof: Vec<u8>,
    pub oracle_attestation: OracleAttestation,
}

impl FulfillmentEnvelope {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.intent_id);
        put_vec(&mut out, &self.output_commitment);
        out.extend_from_slice(&self.solver_id);
        out.extend_from_slice(&self.fulfillment_time.to_le_bytes());
        put_vec(&mut out, &self.fulfillment_proof);
        put_vec(&mut out, &self.oracle_attestation.recipient);
        out.extend_from_slice(&self.oracle_attestation.amount.to_le_bytes());
        out.extend_from_slice(&self.oracle_attestation.tx_hash);
        out.extend_from_slice(&self.oracle_attestation.block.to_le_bytes());
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let intent_id = reader.take_array::<32>()?;
        let output_commitment = reader.take_vec()?;
        let solver_id = reader.take_array::<32>()?;
        let fulfillment_time = reader.take_u64()?;
        let fulfillment_proof = reader.take_vec()?;
        let oracle_attestation = OracleAttestation {
            recipient: reader.take_vec()?,
            amount: reader.take_u64()?,
            tx_hash: reader.take_array::<32>()?,
            block: reader.take_u64()?,
        };
        reader.finish()?;

        Ok(Self {
            intent_id,
            output_commitment,
            solver_id,
            fulfillment_time,
            fulfillment_proof,
            oracle_attestation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_tag_parse() {
        assert_eq!("ethereum".parse::<ChainTag>().unwrap(), ChainTag::Ethereum);
        assert_eq!("Solana".parse::<ChainTag>().unwrap(), ChainTag::Solana);
        assert!("dogechain".parse::<ChainTag>().is_err());
    }

    #[test]
    fn test_chain_tag_curves() {
        assert_eq!(ChainTag::Ethereum.curve(), Curve::Secp256k1);
        assert_eq!(ChainTag::Solana.curve(), Curve::Ed25519);
        assert_eq!(ChainTag::Near.curve(), Curve::Ed25519);
    }

    #[test]
    fn test_privacy_level_aliases() {
        assert_eq!(
            "off".parse::<PrivacyLevel>().unwrap(),
            PrivacyLevel::Transparent
        );
        assert_eq!(
            "transparent".parse::<PrivacyLevel>().unwrap(),
            PrivacyLevel::Transparent
        );
        assert!("stealth".parse::<PrivacyLevel>().is_err());
    }

    #[test]
    fn test_disclosure_policy_lookup() {
        let policy = DisclosurePolicy::new()
            .with_threshold(DisclosurePurpose::ViewBalance, 1)
            .with_threshold(DisclosurePurpose::ComplianceReport, 2);

        assert_eq!(policy.threshold_for(DisclosurePurpose::ViewBalance), Some(1));
        assert_eq!(
            policy.threshold_for(DisclosurePurpose::FullDisclosure),
            None
        );
    }

    #[test]
    fn test_oracle_signed_body_layout() {
        let att = OracleAttestation {
            recipient: vec![0xaa; 20],
            amount: 512,
            tx_hash: [7u8; 32],
            block: 99,
        };
        let body = att.signed_body(&[1u8; 32]);
        assert!(body.starts_with(ORACLE_DOMAIN));
        assert_eq!(
            body.len(),
            ORACLE_DOMAIN.len() + 32 + 20 + 8 + 32 + 8
        );
        // amount is big-endian at its fixed offset
        let amount_off = ORACLE_DOMAIN.len() + 32 + 20;
        assert_eq!(&body[amount_off..amount_off + 8], &512u64.to_be_bytes());
    }

    fn sample_envelope() -> IntentEnvelope {
        IntentEnvelope {
            intent_id: [1u8; 32],
            chain_src: ChainTag::Ethereum,
            chain_dst: ChainTag::Solana,
            asset_src: [2u8; 32],
            asset_dst: [3u8; 32],
            input_commitment: vec![4u8; 33],
            output_commitment: vec![5u8; 33],
            min_output: 1000,
            recipient_stealth: vec![6u8; 20],
            ephemeral_pub: vec![7u8; 33],
            view_tag: 0x42,
            viewer_payload: ViewerPayload {
                ephemeral_pub: vec![8u8; 33],
                ciphertext: vec![9u8; 64],
                aad: vec![10u8; 40],
            },
            nullifier: [11u8; 32],
            expiry: 1_700_000_000,
            funding_proof: vec![12u8; 128],
            validity_proof: vec![13u8; 128],
            viewing_key_hashes: vec![[14u8; 32], [15u8; 32]],
        }
    }

    #[test]
    fn test_intent_envelope_roundtrip() {
        let envelope = sample_envelope();
        let decoded = IntentEnvelope::decode(&envelope.encode()).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_intent_envelope_truncation_rejected() {
        let bytes = sample_envelope().encode();
        assert!(IntentEnvelope::decode(&bytes[..bytes.len() - 1]).is_err());
        let mut extended = bytes;
        extended.push(0);
        assert!(IntentEnvelope::decode(&extended).is_err());
    }

    #[test]
    fn test_fulfillment_envelope_roundtrip() {
        let envelope = FulfillmentEnvelope {
            intent_id: [1u8; 32],
            output_commitment: vec![2u8; 33],
            solver_id: [3u8; 32],
            fulfillment_time: 1_700_000_100,
            fulfillment_proof: vec![4u8; 96],
            oracle_attestation: OracleAttestation {
                recipient: vec![5u8; 32],
                amount: 777,
                tx_hash: [6u8; 32],
                block: 12345,
            },
        };
        let decoded = FulfillmentEnvelope::decode(&envelope.encode()).unwrap();
        assert_eq!(envelope, decoded);
    }
}
