//! Per-wallet append-only ledger.
//!
//! Persists what a wallet must not lose: the sealed master secret, issued
//! meta-addresses, observed own-spend nullifiers, and the viewing-share
//! registry. Each entry's SHA-256 content hash chains through the next
//! entry's `previous_hash`, so any in-place tamper breaks `verify_chain`.
//! The hash chain is canonical; no separate Merkle root is maintained.

use crate::aead::{aead_open, aead_seal, NONCE_LEN};
use crate::crypto::{random_bytes, sha256};
use crate::error::{Error, Result};

/// Domain prefix folded into every entry hash
const ENTRY_DOMAIN: &[u8] = b"SIP-LEDGER-ENTRY-v1";

/// What an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LedgerEntryKind {
    /// AEAD-sealed master secret
    MasterSecretSealed,
    /// A meta-address was issued
    MetaAddressIssued,
    /// A nullifier from one of our own spends was observed
    NullifierObserved,
    /// A viewing share became active
    ShareIssued,
    /// A viewing share was revoked
    ShareRevoked,
    /// A viewing share was superseded by rotation
    ShareRotated,
}

impl LedgerEntryKind {
    fn code(&self) -> u8 {
        match self {
            LedgerEntryKind::MasterSecretSealed => 0,
            LedgerEntryKind::MetaAddressIssued => 1,
            LedgerEntryKind::NullifierObserved => 2,
            LedgerEntryKind::ShareIssued => 3,
            LedgerEntryKind::ShareRevoked => 4,
            LedgerEntryKind::ShareRotated => 5,
        }
    }
}

/// Registry status of a viewing share, resolved from the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareStatus {
    Active,
    Revoked,
    Rotated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub sequence: u64,
    pub timestamp: u64,
    pub kind: LedgerEntryKind,
    pub payload: Vec<u8>,
    pub previous_hash: [u8; 32],
    pub entry_hash: [u8; 32],
}

impl LedgerEntry {
    fn content_hash(
        sequence: u64,
        timestamp: u64,
        kind: LedgerEntryKind,
        payload: &[u8],
        previous_hash: &[u8; 32],
    ) -> [u8; 32] {
        let mut msg = Vec::with_capacity(ENTRY_DOMAIN.len() + 8 + 8 + 1 + payload.len() + 32);
        msg.extend_from_slice(ENTRY_DOMAIN);
        msg.extend_from_slice(&sequence.to_be_bytes());
        msg.extend_from_slice(&timestamp.to_be_bytes());
        msg.push(kind.code());
        msg.extend_from_slice(payload);
        msg.extend_from_slice(previous_hash);
        sha256(&msg)
    }
}

/// The append-only log itself.
#[derive(Debug, Default)]
pub struct WalletLedger {
    entries: Vec<LedgerEntry>,
}

impl WalletLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry, chaining it to the current head.
    pub fn append(
        &mut self,
        kind: LedgerEntryKind,
        payload: Vec<u8>,
        timestamp: u64,
    ) -> &LedgerEntry {
        let sequence = self.entries.len() as u64;
        let previous_hash = self
            .entries
            .last()
            .map(|e| e.entry_hash)
            .unwrap_or([0u8; 32]);
        let entry_hash =
            LedgerEntry::content_hash(sequence, timestamp, kind, &payload, &previous_hash);
        self.entries.push(LedgerEntry {
            sequence,
            timestamp,
            kind,
            payload,
            previous_hash,
            entry_hash,
        });
        self.entries.last().expect("just pushed")
    }

    /// Walk the chain and fail on the first broken link or recomputed
    /// hash mismatch.
    pub fn verify_chain(&self) -> Result<()> {
        let mut previous = [0u8; 32];
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.sequence != i as u64 {
                return Err(Error::InvalidInput(format!(
                    "ledger entry {} has sequence {}",
                    i, entry.sequence
                )));
            }
            if entry.previous_hash != previous {
                return Err(Error::InvalidInput(format!(
                    "ledger chain broken at entry {}",
                    i
                )));
            }
            let recomputed = LedgerEntry::content_hash(
                entry.sequence,
                entry.timestamp,
                entry.kind,
                &entry.payload,
                &entry.previous_hash,
            );
            if recomputed != entry.entry_hash {
                return Err(Error::InvalidInput(format!(
                    "ledger entry {} hash mismatch",
                    i
                )));
            }
            previous = entry.entry_hash;
        }
        Ok(())
    }

    /// Latest registry status of a share, by its 16-byte id.
    pub fn share_status(&self, share_id: &[u8; 16]) -> Option<ShareStatus> {
        self.entries
            .iter()
            .rev()
            .filter(|entry| entry.payload.as_slice() == share_id.as_slice())
            .find_map(|entry| match entry.kind {
                LedgerEntryKind::ShareIssued => Some(ShareStatus::Active),
                LedgerEntryKind::ShareRevoked => Some(ShareStatus::Revoked),
                LedgerEntryKind::ShareRotated => Some(ShareStatus::Rotated),
                _ => None,
            })
    }
}

// ─── Master secret at rest ────────────────────────────────────────────────────

/// Seal a master secret under a caller-supplied wallet key.
///
/// Output layout: `nonce ‖ ciphertext`, suitable as a
/// `MasterSecretSealed` payload.
pub fn seal_master_secret(master_secret: &[u8; 32], wallet_key: &[u8; 32]) -> Result<Vec<u8>> {
    let nonce = random_bytes::<NONCE_LEN>();
    let ciphertext = aead_seal(wallet_key, &nonce, b"master-secret", master_secret)?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a sealed master secret.
pub fn open_master_secret(sealed: &[u8], wallet_key: &[u8; 32]) -> Result<[u8; 32]> {
    if sealed.len() <= NONCE_LEN {
        return Err(Error::InvalidInput("sealed secret too short".into()));
    }
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&sealed[..NONCE_LEN]);
    let plaintext = aead_open(wallet_key, &nonce, b"master-secret", &sealed[NONCE_LEN..])?;
    plaintext
        .try_into()
        .map_err(|_| Error::InvalidInput("sealed secret has wrong length".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_verifies() {
        let mut ledger = WalletLedger::new();
        ledger.append(LedgerEntryKind::MetaAddressIssued, vec![1, 2, 3], 100);
        ledger.append(LedgerEntryKind::NullifierObserved, vec![4, 5, 6], 200);
        ledger.append(LedgerEntryKind::ShareIssued, vec![7; 16], 300);
        ledger.verify_chain().unwrap();
    }

    #[test]
    fn test_tampered_payload_detected() {
        let mut ledger = WalletLedger::new();
        ledger.append(LedgerEntryKind::MetaAddressIssued, vec![1, 2, 3], 100);
        ledger.append(LedgerEntryKind::NullifierObserved, vec![4, 5, 6], 200);

        ledger.entries[0].payload[0] = 9;
        assert!(ledger.verify_chain().is_err());
    }

    #[test]
    fn test_rewritten_history_detected() {
        let mut ledger = WalletLedger::new();
        ledger.append(LedgerEntryKind::MetaAddressIssued, vec![1], 100);
        ledger.append(LedgerEntryKind::NullifierObserved, vec![2], 200);

        // recompute entry 0's hash over altered content: the next link breaks
        let altered = LedgerEntry::content_hash(
            0,
            100,
            LedgerEntryKind::MetaAddressIssued,
            &[9],
            &[0u8; 32],
        );
        ledger.entries[0].payload = vec![9];
        ledger.entries[0].entry_hash = altered;
        assert!(ledger.verify_chain().is_err());
    }

    #[test]
    fn test_share_registry_resolution() {
        let share_a = [0xaa; 16];
        let share_b = [0xbb; 16];

        let mut ledger = WalletLedger::new();
        ledger.append(LedgerEntryKind::ShareIssued, share_a.to_vec(), 100);
        ledger.append(LedgerEntryKind::ShareIssued, share_b.to_vec(), 110);
        ledger.append(LedgerEntryKind::ShareRevoked, share_a.to_vec(), 120);

        assert_eq!(ledger.share_status(&share_a), Some(ShareStatus::Revoked));
        assert_eq!(ledger.share_status(&share_b), Some(ShareStatus::Active));
        assert_eq!(ledger.share_status(&[0xcc; 16]), None);
    }

    #[test]
    fn test_master_secret_roundtrip() {
        let master = [0x42; 32];
        let wallet_key = random_bytes::<32>();

        let sealed = seal_master_secret(&master, &wallet_key).unwrap();
        assert_eq!(open_master_secret(&sealed, &wallet_key).unwrap(), master);

        let wrong_key = random_bytes::<32>();
        assert!(open_master_secret(&sealed, &wrong_key).is_err());
    }
}
