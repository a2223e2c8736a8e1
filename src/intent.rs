//! Intent lifecycle engine.
//!
//! Holds the canonical state machine and binds the three proofs to it:
//!
//! | From     | Event                 | Guard                                | To        |
//! |----------|-----------------------|--------------------------------------|-----------|
//! | Draft    | compose               | Funding proof verifies               | Proposed  |
//! | Proposed | submit                | Validity verifies, nullifier fresh   | Funded    |
//! | Funded   | deposit confirmed     | within expiry                        | InFlight  |
//! | InFlight | fulfillment submitted | Fulfillment verifies, within expiry  | Fulfilled |
//! | InFlight | clock past expiry     | —                                    | Expired   |
//! | Funded / InFlight | refund       | —                                    | Refunded  |
//!
//! Terminal states absorb duplicate events as no-ops; any other undefined
//! transition is a typed error. Expiry guards compare adapter-reported
//! block time, never the local clock. Operations on one intent are
//! serialized through `&mut self`; the nullifier set is the only
//! shared-mutable resource and is internally atomic.

use std::collections::HashMap;
use std::fmt;

use crate::commitment::Commitment;
use crate::crypto::sha256;
use crate::error::{Error, Result};
use crate::nullifier::NullifierSet;
use crate::proof::{
    FulfillmentProof, FulfillmentPublic, FundingProof, FundingPublic, OracleConfig,
    ValidityProof, ValidityPublic, Verdict,
};
use crate::types::{AssetId, ChainTag, IntentId};

// ─── States ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntentState {
    Draft,
    Proposed,
    Funded,
    InFlight,
    Fulfilled,
    Expired,
    Refunded,
}

impl IntentState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntentState::Fulfilled | IntentState::Expired | IntentState::Refunded
        )
    }
}

impl fmt::Display for IntentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntentState::Draft => "draft",
            IntentState::Proposed => "proposed",
            IntentState::Funded => "funded",
            IntentState::InFlight => "in-flight",
            IntentState::Fulfilled => "fulfilled",
            IntentState::Expired => "expired",
            IntentState::Refunded => "refunded",
        };
        f.write_str(name)
    }
}

// ─── Intent ───────────────────────────────────────────────────────────────────

/// A declarative transfer: convert `asset_src` on the source chain into
/// `asset_dst` delivered to a stealth recipient, before `expiry`.
#[derive(Debug, Clone)]
pub struct Intent {
    pub id: IntentId,
    pub chain_src: ChainTag,
    pub chain_dst: ChainTag,
    pub asset_src: AssetId,
    pub asset_dst: AssetId,
    /// Sender's own one-time address bytes
    pub sender_stealth: Vec<u8>,
    /// Recipient meta-address in `sip:` URI form
    pub recipient_meta: String,
    pub input_commitment: Commitment,
    pub output_commitment: Commitment,
    pub nullifier: [u8; 32],
    pub timestamp: u64,
    pub expiry: u64,
    state: IntentState,
}

impl Intent {
    /// Create a draft intent. Fails on an inverted time window.
    #[allow(clippy::too_many_arguments)]
    pub fn draft(
        id: IntentId,
        chain_src: ChainTag,
        chain_dst: ChainTag,
        asset_src: AssetId,
        asset_dst: AssetId,
        sender_stealth: Vec<u8>,
        recipient_meta: String,
        input_commitment: Commitment,
        output_commitment: Commitment,
        nullifier: [u8; 32],
        timestamp: u64,
        expiry: u64,
    ) -> Result<Self> {
        if timestamp >= expiry {
            return Err(Error::IntentExpired(format!(
                "timestamp {} not strictly before expiry {}",
                timestamp, expiry
            )));
        }
        Ok(Self {
            id,
            chain_src,
            chain_dst,
            asset_src,
            asset_dst,
            sender_stealth,
            recipient_meta,
            input_commitment,
            output_commitment,
            nullifier,
            timestamp,
            expiry,
            state: IntentState::Draft,
        })
    }

    pub fn state(&self) -> IntentState {
        self.state
    }

    /// Canonical hash the proofs and signatures bind to.
    ///
    /// The nullifier is excluded: it is itself derived from this hash.
    pub fn intent_hash(&self) -> [u8; 32] {
        let mut msg = Vec::new();
        msg.extend_from_slice(&self.id);
        msg.push(self.chain_src.curve().id_byte());
        msg.push(self.chain_dst.curve().id_byte());
        msg.extend_from_slice(&self.asset_src);
        msg.extend_from_slice(&self.asset_dst);
        msg.extend_from_slice(&self.sender_stealth);
        msg.extend_from_slice(self.recipient_meta.as_bytes());
        msg.extend_from_slice(&self.input_commitment.to_bytes());
        msg.extend_from_slice(&self.output_commitment.to_bytes());
        msg.extend_from_slice(&self.timestamp.to_be_bytes());
        msg.extend_from_slice(&self.expiry.to_be_bytes());
        sha256(&msg)
    }
}

// ─── Engine ───────────────────────────────────────────────────────────────────

/// Drives intents through the state machine, verifying the bound proof at
/// each guarded transition.
pub struct IntentEngine {
    intents: HashMap<IntentId, Intent>,
    nullifiers: NullifierSet,
    oracle: OracleConfig,
}

impl IntentEngine {
    pub fn new(oracle: OracleConfig) -> Self {
        Self {
            intents: HashMap::new(),
            nullifiers: NullifierSet::new(),
            oracle,
        }
    }

    /// Register a draft intent.
    pub fn register(&mut self, intent: Intent) -> Result<()> {
        if self.intents.contains_key(&intent.id) {
            return Err(Error::InvalidInput("intent id already registered".into()));
        }
        tracing::info!(intent = %hex::encode(intent.id), "intent drafted");
        self.intents.insert(intent.id, intent);
        Ok(())
    }

    pub fn get(&self, id: &IntentId) -> Option<&Intent> {
        self.intents.get(id)
    }

    pub fn nullifiers(&self) -> &NullifierSet {
        &self.nullifiers
    }

    /// Draft → Proposed once the Funding proof verifies.
    pub fn compose(
        &mut self,
        id: &IntentId,
        public: &FundingPublic,
        proof_bytes: &[u8],
    ) -> Result<IntentState> {
        let intent = self.lookup(id)?;
        if intent.state.is_terminal() {
            return Ok(intent.state);
        }
        if intent.state != IntentState::Draft {
            return Err(invalid_transition(intent.state, "compose"));
        }

        let proof = FundingProof::from_bytes(proof_bytes)?;
        require_valid(proof.verify(public))?;

        self.transition(id, IntentState::Proposed)
    }

    /// Proposed → Funded once the Validity proof verifies and the
    /// nullifier is fresh.
    ///
    /// The nullifier insertion is the last step: a failed verification
    /// never consumes the nullifier.
    pub fn submit(
        &mut self,
        id: &IntentId,
        public: &ValidityPublic,
        proof_bytes: &[u8],
    ) -> Result<IntentState> {
        let intent = self.lookup(id)?;
        if intent.state.is_terminal() {
            return Ok(intent.state);
        }
        if intent.state != IntentState::Proposed {
            return Err(invalid_transition(intent.state, "submit"));
        }
        if public.intent_hash != intent.intent_hash() {
            return Err(Error::InvalidInput(
                "statement is for a different intent".into(),
            ));
        }
        if public.nullifier != intent.nullifier {
            return Err(Error::InvalidInput(
                "statement nullifier differs from the intent".into(),
            ));
        }

        let proof = ValidityProof::from_bytes(proof_bytes)?;
        require_valid(proof.verify(public))?;

        self.nullifiers.check_and_insert(intent.nullifier)?;
        self.transition(id, IntentState::Funded)
    }

    /// Funded → InFlight on a confirmed deposit within the expiry window;
    /// past the window the intent expires instead.
    pub fn deposit_confirmed(&mut self, id: &IntentId, block_time: u64) -> Result<IntentState> {
        let intent = self.lookup(id)?;
        if intent.state.is_terminal() {
            return Ok(intent.state);
        }
        if intent.state != IntentState::Funded {
            return Err(invalid_transition(intent.state, "deposit_confirmed"));
        }
        if block_time > intent.expiry {
            return self.transition(id, IntentState::Expired);
        }
        self.transition(id, IntentState::InFlight)
    }

    /// InFlight → Fulfilled once the Fulfillment proof verifies.
    pub fn fulfill(
        &mut self,
        id: &IntentId,
        public: &FulfillmentPublic,
        proof_bytes: &[u8],
    ) -> Result<IntentState> {
        let intent = self.lookup(id)?;
        if intent.state.is_terminal() {
            return Ok(intent.state);
        }
        if intent.state != IntentState::InFlight {
            return Err(invalid_transition(intent.state, "fulfill"));
        }
        if public.intent_hash != intent.intent_hash() {
            return Err(Error::InvalidInput(
                "statement is for a different intent".into(),
            ));
        }
        if public.fulfillment_time > intent.expiry {
            return Err(Error::IntentExpired(format!(
                "fulfillment at {} after expiry {}",
                public.fulfillment_time, intent.expiry
            )));
        }

        let proof = FulfillmentProof::from_bytes(proof_bytes)?;
        require_valid(proof.verify(public, &self.oracle))?;

        self.transition(id, IntentState::Fulfilled)
    }

    /// Funded / InFlight → Expired once block time passes expiry.
    pub fn expire(&mut self, id: &IntentId, block_time: u64) -> Result<IntentState> {
        let intent = self.lookup(id)?;
        if intent.state.is_terminal() {
            return Ok(intent.state);
        }
        if !matches!(intent.state, IntentState::Funded | IntentState::InFlight) {
            return Err(invalid_transition(intent.state, "expire"));
        }
        if block_time <= intent.expiry {
            return Err(Error::InvalidInput(format!(
                "intent does not expire until {}",
                intent.expiry
            )));
        }
        self.transition(id, IntentState::Expired)
    }

    /// Funded / InFlight → Refunded on an adapter-reported refund.
    pub fn refund(&mut self, id: &IntentId) -> Result<IntentState> {
        let intent = self.lookup(id)?;
        if intent.state.is_terminal() {
            return Ok(intent.state);
        }
        if !matches!(intent.state, IntentState::Funded | IntentState::InFlight) {
            return Err(invalid_transition(intent.state, "refund"));
        }
        self.transition(id, IntentState::Refunded)
    }

    fn lookup(&self, id: &IntentId) -> Result<&Intent> {
        self.intents
            .get(id)
            .ok_or_else(|| Error::InvalidInput("unknown intent id".into()))
    }

    fn transition(&mut self, id: &IntentId, next: IntentState) -> Result<IntentState> {
        let intent = self
            .intents
            .get_mut(id)
            .ok_or_else(|| Error::InvalidInput("unknown intent id".into()))?;
        tracing::info!(
            intent = %hex::encode(intent.id),
            from = %intent.state,
            to = %next,
            "intent transition"
        );
        intent.state = next;
        Ok(next)
    }
}

fn invalid_transition(state: IntentState, event: &str) -> Error {
    Error::InvalidStateTransition(format!("{} not defined in state {}", event, state))
}

fn require_valid(verdict: Verdict) -> Result<()> {
    match verdict {
        Verdict::Valid => Ok(()),
        Verdict::Invalid(msg) => Err(Error::ProofVerificationFailed(msg)),
        Verdict::Malformed(msg) => Err(Error::MalformedProof(msg)),
    }
}
