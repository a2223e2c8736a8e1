//! Settlement-adapter contract.
//!
//! Adapters perform the actual cross-chain swap and are opaque to the
//! core beyond this trait: they see commitments and public minimums,
//! never plaintext amounts. Routing to NEAR Intents, a local
//! batch-auction solver, or any future backend is an adapter concern.
//!
//! Adapter calls are the only sanctioned blocking points in the core.
//! Transient failures are retried with exponential backoff and jitter,
//! at most [`MAX_RETRIES`] attempts, then surfaced.

use std::sync::mpsc::Receiver;
use std::time::Duration;

use rand::Rng;

use crate::error::{Error, Result};
use crate::types::{AssetId, IntentId};

/// Maximum attempts for a transiently failing adapter call
pub const MAX_RETRIES: u32 = 5;

/// Base backoff before jitter
const BACKOFF_BASE_MS: u64 = 100;

/// What the core asks an adapter to price.
///
/// The commitment is opaque to the adapter; only the minimum output
/// threshold is plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub asset_src: AssetId,
    pub asset_dst: AssetId,
    /// Compressed input commitment bytes
    pub commitment: Vec<u8>,
    pub min_output: u64,
    /// Unix seconds the quote must still be valid at
    pub deadline: u64,
}

/// An adapter's priced offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub quote_id: [u8; 16],
    /// Output the adapter commits to deliver at minimum
    pub guaranteed_output: u64,
    /// Adapter fee in destination-asset units
    pub fee: u64,
    /// Unix seconds this quote expires at
    pub deadline: u64,
}

/// Acknowledgement of a submitted deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub intent_id: IntentId,
    /// Adapter-scoped reference for status polling
    pub adapter_ref: Vec<u8>,
}

/// Adapter-reported lifecycle position of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementStatus {
    PendingDeposit,
    Processing,
    Settled { tx_hash: [u8; 32] },
    Refunded,
    Failed,
}

/// A status transition pushed by an adapter subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementEvent {
    pub intent_id: IntentId,
    pub status: SettlementStatus,
    /// Adapter-reported block time of the event
    pub block_time: u64,
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Restrict to one intent; `None` streams everything
    pub intent_id: Option<IntentId>,
}

/// The contract every settlement backend implements.
pub trait SettlementAdapter {
    fn get_quote(&self, request: &QuoteRequest) -> Result<Quote>;

    fn submit_deposit(&self, intent_id: &IntentId, deposit_proof: &[u8]) -> Result<Receipt>;

    fn poll_status(&self, intent_id: &IntentId) -> Result<SettlementStatus>;

    fn subscribe_events(&self, filter: &EventFilter) -> Result<Receiver<SettlementEvent>>;
}

/// Reject a quote past its deadline.
///
/// `now` is the adapter-reported block time, not the local clock.
pub fn validate_quote(quote: &Quote, now: u64) -> Result<()> {
    if now > quote.deadline {
        return Err(Error::QuoteExpired {
            deadline: quote.deadline,
        });
    }
    Ok(())
}

/// Run an adapter call, retrying transient failures.
///
/// Only `AdapterError` is retried; every other error surfaces
/// immediately. Backoff doubles per attempt with uniform jitter.
pub fn with_retry<T>(operation: &str, mut call: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 0u32;
    loop {
        match call() {
            Ok(value) => return Ok(value),
            Err(Error::AdapterError(msg)) => {
                attempt += 1;
                if attempt >= MAX_RETRIES {
                    tracing::warn!(operation, attempts = attempt, "adapter retries exhausted");
                    return Err(Error::AdapterError(msg));
                }
                let backoff = BACKOFF_BASE_MS << (attempt - 1);
                let jitter = rand::thread_rng().gen_range(0..=backoff / 2);
                tracing::warn!(
                    operation,
                    attempt,
                    backoff_ms = backoff + jitter,
                    error = %msg,
                    "transient adapter failure, backing off"
                );
                std::thread::sleep(Duration::from_millis(backoff + jitter));
            }
            Err(other) => return Err(other),
        }
    }
}
