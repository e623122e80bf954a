// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # VanPay Protocol — Merchant Integration Core
//!
//! This crate is the trusted, server-side half of a VanPay hosted-checkout
//! integration: it builds signed redirect URLs for outbound payment
//! requests and authenticates the gateway's callbacks on the way back in.
//!
//! Everything security-critical about talking to the gateway lives here.
//! The signature scheme is HMAC-SHA512 over a canonical, order-independent
//! serialization of the request parameters -- which means any deviation in
//! canonicalization, encoding, or comparison is either a forgeable payment
//! or a legitimate payment rejected. Both are incidents. Neither is allowed.
//!
//! ## Architecture
//!
//! The modules mirror the stages a payment actually moves through:
//!
//! - **config** -- Gateway constants and merchant configuration.
//! - **wire** -- Parameter sets, canonical serialization, and the codecs
//!   (amounts, timestamps, order identifiers) that feed them.
//! - **crypto** -- HMAC-SHA512 signing and constant-time verification.
//! - **gateway** -- The outbound request builder and the inbound return
//!   verifier, composed from the layers below.
//! - **transaction** -- The purchase lifecycle state machine and the
//!   idempotent tracker that guarantees exactly-once settlement effects.
//! - **collaborators** -- Trait seams for the backend record store and the
//!   wallet ledger, plus the async settlement orchestration.
//!
//! ## Design Philosophy
//!
//! 1. Sign raw values; percent-encode only at the transport edge.
//! 2. Verification never panics on hostile input -- it classifies.
//! 3. A terminal order state is immutable. Replays return the recorded
//!    outcome and trigger nothing.
//! 4. If it touches money, it has tests. Plural.

pub mod collaborators;
pub mod config;
pub mod crypto;
pub mod error;
pub mod gateway;
pub mod transaction;
pub mod wire;

pub use collaborators::{
    open_payment, settle_return, CollaboratorError, PaymentBackend, SettleError, SettlementReport,
    WalletLedger,
};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::callback::{verify_return, IpnAck, ReturnVerification};
pub use gateway::request::{RequestBuilder, SignedRequest};
pub use transaction::tracker::{Disposition, TransactionTracker};
pub use transaction::types::{FailureReason, TerminalOutcome, Transaction, TransactionStatus};
pub use wire::canonical::canonicalize;
pub use wire::params::ParameterSet;
