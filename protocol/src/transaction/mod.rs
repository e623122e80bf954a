//! # Transaction Module
//!
//! Lifecycle management for purchase attempts. Every payment this library
//! builds a request for is represented as a [`Transaction`], owned by the
//! [`TransactionTracker`] from creation until (and past) its terminal
//! state.
//!
//! ## Architecture
//!
//! ```text
//! types.rs   — Transaction entity, status enum, failure reasons, outcomes
//! tracker.rs — Concurrent idempotent store + the state machine itself
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Create** -- the request builder mints an order id; the tracker
//!    records the expected amount and moves the entry to `AwaitingReturn`.
//! 2. **Classify** -- a verified callback is folded in exactly once,
//!    producing `Verified` or `Failed(reason)`.
//! 3. **Replay** -- any further callback for the same order returns the
//!    recorded outcome and changes nothing. The gateway *will* deliver
//!    both a browser return and a server notification for the same order;
//!    only one of them settles.
//!
//! ## Design Decisions
//!
//! - Terminal states are immutable. There is no code path from
//!   `Verified` or `Failed` back to anything.
//! - The tracker owns no I/O. It classifies; collaborators act.
//! - Amount cross-checking happens here, not in the verifier: the
//!   verifier knows what the callback *says*, only the tracker knows what
//!   the merchant *asked for*.

pub mod tracker;
pub mod types;

pub use tracker::{Disposition, TransactionTracker};
pub use types::{FailureReason, TerminalOutcome, Transaction, TransactionStatus};
