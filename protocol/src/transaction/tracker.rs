//! Concurrent, idempotent settlement tracking.
//!
//! The tracker is the only shared mutable state in the crate. The gateway
//! may deliver a browser-redirect return *and* an independent
//! server-to-server notification for the same order, concurrently, and
//! both will be fed through [`TransactionTracker::apply_return`]. The
//! contract is that they converge on a single terminal state and exactly
//! one caller observes a fresh settlement.
//!
//! ## Design
//!
//! - `DashMap` keyed by order id. `apply_return` works through a
//!   `get_mut` guard, which holds the entry's shard lock for the duration
//!   of the classification -- per-order atomicity without a global lock.
//! - Terminal entries stay in the map: replay detection *requires* the
//!   recorded outcome. [`TransactionTracker::purge_terminal`] exists for
//!   long-running processes, with the documented cost that a purged order
//!   replayed later is indistinguishable from an unknown one.
//! - The tracker owns no network or storage side effects. It returns a
//!   [`Disposition`]; acting on it (crediting a wallet, notifying a user)
//!   belongs to the caller, gated on `Disposition::Settled`.

use std::time::Duration;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::gateway::callback::ReturnVerification;
use crate::transaction::types::{FailureReason, TerminalOutcome, Transaction};

// ---------------------------------------------------------------------------
// Disposition
// ---------------------------------------------------------------------------

/// What applying a callback actually did.
///
/// The distinction is the whole point of idempotency: a `Settled`
/// disposition is handed out exactly once per order, so downstream
/// effects (ledger credits) key off it safely. `Replayed` means the
/// outcome was already recorded and nothing changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// This callback settled the order. Trigger downstream effects now.
    Settled(TerminalOutcome),
    /// The order was already terminal; here is the recorded outcome.
    /// Trigger nothing.
    Replayed(TerminalOutcome),
}

impl Disposition {
    /// The terminal outcome, regardless of freshness.
    pub fn outcome(&self) -> &TerminalOutcome {
        match self {
            Self::Settled(outcome) | Self::Replayed(outcome) => outcome,
        }
    }

    /// Returns `true` if this call is the one that settled the order.
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Settled(_))
    }
}

// ---------------------------------------------------------------------------
// TransactionTracker
// ---------------------------------------------------------------------------

/// Thread-safe store of purchase attempts keyed by order identifier.
#[derive(Debug, Default)]
pub struct TransactionTracker {
    orders: DashMap<String, Transaction>,
}

impl TransactionTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly built request: `Created -> AwaitingReturn`,
    /// recording the expected amount for the later cross-check.
    ///
    /// # Errors
    ///
    /// [`GatewayError::DuplicateOrder`] if the order id is already
    /// tracked. Order ids are not collision-proof (millisecond timestamp
    /// plus a 6-digit random suffix), so the tracker refuses rather than
    /// overwrites.
    pub fn create(
        &self,
        order_id: &str,
        amount_minor: u64,
        description: &str,
    ) -> Result<(), GatewayError> {
        match self.orders.entry(order_id.to_string()) {
            Entry::Occupied(_) => Err(GatewayError::DuplicateOrder {
                order_id: order_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                let mut tx = Transaction::new(order_id, amount_minor, description);
                tx.mark_awaiting();
                info!(order_id, amount_minor, "tracking new payment attempt");
                slot.insert(tx);
                Ok(())
            }
        }
    }

    /// Folds a verified callback into the state machine.
    ///
    /// Classification, in order:
    ///
    /// 1. Already terminal -> [`Disposition::Replayed`] with the recorded
    ///    outcome; no state change, no downstream effect.
    /// 2. `valid == false` -> `Failed(SignatureInvalid)`.
    /// 3. `success == false` -> `Failed(GatewayDeclined)`.
    /// 4. Callback amount differs from the recorded amount ->
    ///    `Failed(AmountMismatch)`.
    /// 5. Otherwise -> `Verified`.
    ///
    /// Atomic per order id: concurrent deliveries for the same order
    /// serialize on the entry and exactly one receives
    /// [`Disposition::Settled`].
    ///
    /// # Errors
    ///
    /// [`GatewayError::UnknownOrder`] when no `create` preceded this
    /// callback -- stale, replayed after purge, or aimed at another
    /// merchant. No state is created for it.
    pub fn apply_return(
        &self,
        verification: &ReturnVerification,
    ) -> Result<Disposition, GatewayError> {
        let order_id = verification.order_id.as_str();

        let mut entry = self.orders.get_mut(order_id).ok_or_else(|| {
            warn!(order_id, "callback for unknown order");
            GatewayError::UnknownOrder {
                order_id: order_id.to_string(),
            }
        })?;

        if let Some(outcome) = entry.outcome() {
            debug!(order_id, status = %outcome.status, "replayed callback, returning recorded outcome");
            return Ok(Disposition::Replayed(outcome));
        }

        if !verification.valid {
            warn!(order_id, "settling as failed: signature invalid");
            entry.mark_failed(FailureReason::SignatureInvalid);
        } else if !verification.success {
            info!(
                order_id,
                response_code = %verification.response_code,
                "settling as failed: gateway declined"
            );
            entry.mark_failed(FailureReason::GatewayDeclined);
        } else if verification.amount_minor != entry.amount_minor {
            warn!(
                order_id,
                expected = entry.amount_minor,
                reported = verification.amount_minor,
                "settling as failed: amount mismatch"
            );
            entry.mark_failed(FailureReason::AmountMismatch);
        } else {
            info!(order_id, amount_minor = entry.amount_minor, "settling as verified");
            entry.mark_verified();
        }

        let outcome = entry
            .outcome()
            .expect("classification always reaches a terminal state");
        Ok(Disposition::Settled(outcome))
    }

    /// Snapshot of a tracked transaction.
    pub fn get(&self, order_id: &str) -> Option<Transaction> {
        self.orders.get(order_id).map(|entry| entry.value().clone())
    }

    /// Number of tracked orders, terminal included.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Snapshot of all transactions that have reached a terminal state.
    pub fn archived(&self) -> Vec<Transaction> {
        self.orders
            .iter()
            .filter(|entry| entry.is_terminal())
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Evicts terminal transactions settled longer than `max_age` ago.
    /// Returns how many were removed.
    ///
    /// A purged order replayed afterwards classifies as `UnknownOrder`,
    /// so size the window to outlive the gateway's retry schedule.
    pub fn purge_terminal(&self, max_age: Duration) -> usize {
        let age = match chrono::Duration::from_std(max_age) {
            Ok(age) => age,
            Err(_) => return 0, // a window that large purges nothing
        };
        let cutoff = match Utc::now().checked_sub_signed(age) {
            Some(cutoff) => cutoff,
            None => return 0,
        };
        let before = self.orders.len();
        self.orders.retain(|_, tx| match tx.settled_at {
            Some(settled) => settled > cutoff,
            None => true,
        });
        before - self.orders.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::types::TransactionStatus;

    /// Helper: a verification result as produced by an authentic,
    /// successful callback.
    fn verified_return(order_id: &str, amount_minor: u64) -> ReturnVerification {
        ReturnVerification {
            valid: true,
            success: true,
            order_id: order_id.to_string(),
            amount_minor,
            amount: amount_minor as f64 / 100.0,
            response_code: "00".to_string(),
            transaction_no: Some("14422574".to_string()),
            bank_code: Some("NCB".to_string()),
            pay_date: None,
            message: "payment confirmed by gateway".to_string(),
        }
    }

    #[test]
    fn success_path_settles_verified() {
        let tracker = TransactionTracker::new();
        tracker.create("O1", 10_000_000, "100000 credits").unwrap();

        let disposition = tracker
            .apply_return(&verified_return("O1", 10_000_000))
            .unwrap();

        assert!(disposition.is_fresh());
        let outcome = disposition.outcome();
        assert!(outcome.is_verified());
        assert_eq!(outcome.amount_minor, 10_000_000);
    }

    #[test]
    fn duplicate_create_is_refused() {
        let tracker = TransactionTracker::new();
        tracker.create("O1", 100, "first").unwrap();

        match tracker.create("O1", 200, "second") {
            Err(GatewayError::DuplicateOrder { order_id }) => assert_eq!(order_id, "O1"),
            other => panic!("expected DuplicateOrder, got {:?}", other),
        }
        // The original entry is untouched.
        assert_eq!(tracker.get("O1").unwrap().amount_minor, 100);
    }

    #[test]
    fn replayed_callback_returns_recorded_outcome_once_settled() {
        let tracker = TransactionTracker::new();
        tracker.create("O1", 10_000_000, "top-up").unwrap();

        let first = tracker
            .apply_return(&verified_return("O1", 10_000_000))
            .unwrap();
        let second = tracker
            .apply_return(&verified_return("O1", 10_000_000))
            .unwrap();

        assert!(first.is_fresh());
        assert!(!second.is_fresh());
        assert_eq!(first.outcome(), second.outcome());
    }

    #[test]
    fn invalid_signature_settles_failed() {
        let tracker = TransactionTracker::new();
        tracker.create("O1", 10_000_000, "top-up").unwrap();

        let mut result = verified_return("O1", 10_000_000);
        result.valid = false;

        let disposition = tracker.apply_return(&result).unwrap();
        let outcome = disposition.outcome();
        assert_eq!(outcome.status, TransactionStatus::Failed);
        assert_eq!(outcome.reason, Some(FailureReason::SignatureInvalid));
    }

    #[test]
    fn invalid_signature_with_success_code_is_still_failed() {
        // A response may claim success while failing signature
        // validation; signature always wins.
        let tracker = TransactionTracker::new();
        tracker.create("O1", 10_000_000, "top-up").unwrap();

        let mut result = verified_return("O1", 10_000_000);
        result.valid = false;
        result.success = true;

        let outcome = tracker.apply_return(&result).unwrap().outcome().clone();
        assert_eq!(outcome.reason, Some(FailureReason::SignatureInvalid));
    }

    #[test]
    fn gateway_decline_settles_failed() {
        let tracker = TransactionTracker::new();
        tracker.create("O1", 10_000_000, "top-up").unwrap();

        let mut result = verified_return("O1", 10_000_000);
        result.success = false;
        result.response_code = "24".to_string();

        let outcome = tracker.apply_return(&result).unwrap().outcome().clone();
        assert_eq!(outcome.reason, Some(FailureReason::GatewayDeclined));
    }

    #[test]
    fn amount_mismatch_settles_failed() {
        let tracker = TransactionTracker::new();
        tracker.create("O1", 10_000_000, "top-up").unwrap();

        let disposition = tracker
            .apply_return(&verified_return("O1", 20_000_000))
            .unwrap();
        assert_eq!(
            disposition.outcome().reason,
            Some(FailureReason::AmountMismatch)
        );
    }

    #[test]
    fn unknown_order_is_rejected_without_state_change() {
        let tracker = TransactionTracker::new();

        match tracker.apply_return(&verified_return("never-created", 100)) {
            Err(GatewayError::UnknownOrder { order_id }) => {
                assert_eq!(order_id, "never-created");
            }
            other => panic!("expected UnknownOrder, got {:?}", other),
        }
        assert!(tracker.is_empty());
    }

    #[test]
    fn failed_orders_replay_their_failure() {
        let tracker = TransactionTracker::new();
        tracker.create("O1", 10_000_000, "top-up").unwrap();

        let mut declined = verified_return("O1", 10_000_000);
        declined.success = false;
        tracker.apply_return(&declined).unwrap();

        // A later, apparently successful delivery must not flip the
        // terminal state.
        let replay = tracker
            .apply_return(&verified_return("O1", 10_000_000))
            .unwrap();
        assert!(!replay.is_fresh());
        assert_eq!(replay.outcome().reason, Some(FailureReason::GatewayDeclined));
    }

    #[test]
    fn concurrent_deliveries_settle_exactly_once() {
        use std::sync::Arc;
        use std::thread;

        let tracker = Arc::new(TransactionTracker::new());
        tracker.create("O1", 10_000_000, "top-up").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    tracker
                        .apply_return(&verified_return("O1", 10_000_000))
                        .unwrap()
                })
            })
            .collect();

        let fresh = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Disposition::is_fresh)
            .count();
        assert_eq!(fresh, 1, "exactly one delivery settles the order");
    }

    #[test]
    fn archived_lists_only_terminal_orders() {
        let tracker = TransactionTracker::new();
        tracker.create("pending", 100, "a").unwrap();
        tracker.create("done", 200, "b").unwrap();
        tracker.apply_return(&verified_return("done", 200)).unwrap();

        let archived = tracker.archived();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].order_id, "done");
    }

    #[test]
    fn purge_terminal_evicts_old_settlements_only() {
        let tracker = TransactionTracker::new();
        tracker.create("pending", 100, "a").unwrap();
        tracker.create("done", 200, "b").unwrap();
        tracker.apply_return(&verified_return("done", 200)).unwrap();

        // Zero max age: every settled order is past the window.
        let purged = tracker.purge_terminal(Duration::ZERO);
        assert_eq!(purged, 1);
        assert!(tracker.get("pending").is_some());
        assert!(tracker.get("done").is_none());

        // And a replay for the purged order now reads as unknown.
        assert!(matches!(
            tracker.apply_return(&verified_return("done", 200)),
            Err(GatewayError::UnknownOrder { .. })
        ));
    }
}
