//! Core type definitions for tracked purchase attempts.
//!
//! These types form the vocabulary of the settlement state machine. They
//! are deliberately small; the interesting behavior (idempotency,
//! per-order atomicity) lives in [`super::tracker`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TransactionStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a purchase attempt.
///
/// `Created` exists only between construction and registration; the
/// tracker stores entries already advanced to `AwaitingReturn`. The two
/// terminal states are permanent -- no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Built by the request builder, not yet registered.
    Created,
    /// Registered; the customer has been (or is about to be) redirected
    /// and the gateway's callback has not yet settled the order.
    AwaitingReturn,
    /// Terminal: authentic callback, gateway success code, amount matched.
    Verified,
    /// Terminal: the callback failed classification (see
    /// [`FailureReason`]).
    Failed,
}

impl TransactionStatus {
    /// Returns `true` for the two permanent states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Failed)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::AwaitingReturn => write!(f, "AwaitingReturn"),
            Self::Verified => write!(f, "Verified"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// FailureReason
// ---------------------------------------------------------------------------

/// Why a transaction settled as `Failed`.
///
/// These are classifications, not errors -- a failed payment is an
/// expected outcome, returned as data so the caller can render a failure
/// state without crashing. Reason codes are for logs and audits; end
/// users get a generic notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    /// The callback's signature did not verify: forged, corrupted, or
    /// signed under the wrong secret. Security-relevant.
    SignatureInvalid,
    /// Authentic callback, but the gateway reported a non-success
    /// response code (declined, cancelled, expired...).
    GatewayDeclined,
    /// Authentic callback whose amount differs from what the order was
    /// created for. Possible tampering or gateway bug; security-relevant.
    AmountMismatch,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignatureInvalid => write!(f, "SignatureInvalid"),
            Self::GatewayDeclined => write!(f, "GatewayDeclined"),
            Self::AmountMismatch => write!(f, "AmountMismatch"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A single purchase attempt, from request construction to terminal
/// settlement.
///
/// Owned exclusively by the tracker for its whole lifetime. Amounts are
/// integer minor units throughout -- the float boundary lives in
/// [`crate::wire::codec`], not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Order identifier correlating this attempt with its callbacks.
    pub order_id: String,

    /// The amount the merchant requested, in minor units. Callbacks are
    /// cross-checked against this value.
    pub amount_minor: u64,

    /// Human-readable order description, as sent to the gateway.
    pub description: String,

    /// Current lifecycle state.
    pub status: TransactionStatus,

    /// Set when `status == Failed`; `None` otherwise.
    pub failure: Option<FailureReason>,

    /// When the request was built.
    pub created_at: DateTime<Utc>,

    /// When the order reached a terminal state, if it has.
    pub settled_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Creates a fresh, unregistered transaction.
    pub fn new(order_id: &str, amount_minor: u64, description: &str) -> Self {
        Self {
            order_id: order_id.to_string(),
            amount_minor,
            description: description.to_string(),
            status: TransactionStatus::Created,
            failure: None,
            created_at: Utc::now(),
            settled_at: None,
        }
    }

    /// Advances `Created` to `AwaitingReturn`. Any other state is
    /// left untouched.
    pub fn mark_awaiting(&mut self) {
        if self.status == TransactionStatus::Created {
            self.status = TransactionStatus::AwaitingReturn;
        }
    }

    /// Settles the transaction as `Verified`. No-op once terminal.
    pub fn mark_verified(&mut self) {
        if !self.status.is_terminal() {
            self.status = TransactionStatus::Verified;
            self.failure = None;
            self.settled_at = Some(Utc::now());
        }
    }

    /// Settles the transaction as `Failed` with a reason. No-op once
    /// terminal.
    pub fn mark_failed(&mut self, reason: FailureReason) {
        if !self.status.is_terminal() {
            self.status = TransactionStatus::Failed;
            self.failure = Some(reason);
            self.settled_at = Some(Utc::now());
        }
    }

    /// Returns `true` once the transaction reached a permanent state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The recorded terminal outcome, if any.
    pub fn outcome(&self) -> Option<TerminalOutcome> {
        if !self.is_terminal() {
            return None;
        }
        Some(TerminalOutcome {
            order_id: self.order_id.clone(),
            status: self.status,
            reason: self.failure,
            amount_minor: self.amount_minor,
        })
    }
}

// ---------------------------------------------------------------------------
// TerminalOutcome
// ---------------------------------------------------------------------------

/// The settled result of one purchase attempt, as reported to callers.
///
/// This is what the ledger collaborator acts on -- exactly once per order
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalOutcome {
    /// Order identifier.
    pub order_id: String,
    /// `Verified` or `Failed`.
    pub status: TransactionStatus,
    /// Failure classification when `status == Failed`.
    pub reason: Option<FailureReason>,
    /// The amount originally requested, in minor units.
    pub amount_minor: u64,
}

impl TerminalOutcome {
    /// Returns `true` if the payment was verified end to end.
    pub fn is_verified(&self) -> bool {
        self.status == TransactionStatus::Verified
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
