//! Trait seams for the external collaborators and the async settlement
//! orchestration that connects them to the core.
//!
//! The signing/verification core is pure and synchronous. The two things
//! that are not -- persisting a pending purchase and crediting a wallet
//! -- belong to services this crate deliberately does not implement. They
//! are modelled as traits so callers plug in their own transport, and so
//! tests plug in doubles.
//!
//! The orchestration functions here are thin by design: they sequence
//! core calls with collaborator calls and apply a timeout to the I/O.
//! The exactly-once guarantee does not live here; it lives in the
//! tracker's [`Disposition`], which this module merely respects.

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::timeout;
use tracing::info;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::callback::verify_return;
use crate::gateway::request::SignedRequest;
use crate::transaction::tracker::{Disposition, TransactionTracker};
use crate::wire::params::{ParameterSet, FIELD_ORDER_INFO};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures at the collaborator boundary.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The collaborator answered with a rejection.
    #[error("collaborator rejected {order_id}: {reason}")]
    Rejected {
        /// The order the call concerned.
        order_id: String,
        /// The collaborator's stated reason.
        reason: String,
    },

    /// The collaborator did not answer within the configured timeout.
    #[error("collaborator call timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// Transport-level failure (connection refused, TLS, serialization).
    #[error("collaborator transport failure: {0}")]
    Transport(String),
}

/// Failures of the end-to-end settlement flow: either the protocol core
/// rejected the input or a collaborator call failed.
#[derive(Debug, Error)]
pub enum SettleError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

// ---------------------------------------------------------------------------
// Collaborator Traits
// ---------------------------------------------------------------------------

/// The backend service that persists purchase records.
///
/// Called once per attempt, after the request is built and tracked but
/// before the customer is redirected.
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    /// Persists a pending purchase record.
    async fn record_pending(
        &self,
        order_id: &str,
        amount_minor: u64,
        description: &str,
    ) -> Result<(), CollaboratorError>;
}

/// The ledger service that credits purchased units.
///
/// Invoked exactly once per order, only after a fresh `Verified`
/// settlement. The order identifier is passed through so the ledger can
/// enforce its own idempotency as a second line of defense.
#[async_trait]
pub trait WalletLedger: Send + Sync {
    /// Credits the wallet for a verified purchase.
    async fn credit(&self, order_id: &str, amount_minor: u64) -> Result<(), CollaboratorError>;
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// What a settlement attempt did, end to end.
#[derive(Debug)]
pub struct SettlementReport {
    /// The tracker's classification of this delivery.
    pub disposition: Disposition,
    /// Whether this call credited the ledger. True at most once per
    /// order, ever.
    pub credited: bool,
}

/// Registers a freshly built request with the tracker and the backend.
///
/// The tracker entry is created first -- it is cheap, in-process, and the
/// place where duplicate order ids are caught. If the backend call then
/// fails, the entry stays `AwaitingReturn`; the caller decides whether
/// to retry the recording or abandon the attempt.
pub async fn open_payment(
    tracker: &TransactionTracker,
    backend: &dyn PaymentBackend,
    config: &GatewayConfig,
    request: &SignedRequest,
) -> Result<(), SettleError> {
    let description = request.params.get(FIELD_ORDER_INFO).unwrap_or_default();
    tracker.create(&request.order_id, request.amount_minor, description)?;

    guarded(config, backend.record_pending(&request.order_id, request.amount_minor, description))
        .await?;
    Ok(())
}

/// Runs the full inbound flow: verify the callback, fold it into the
/// tracker, and credit the ledger iff this delivery freshly settled the
/// order as `Verified`.
///
/// Replays, declines, forgeries, and mismatches all return a report with
/// `credited == false` -- they are outcomes, not errors. Only structural
/// failures and collaborator failures are `Err`.
///
/// If the ledger call fails *after* the order settled, the order stays
/// `Verified` and the error propagates; the caller retries the credit
/// through its own machinery, leaning on the ledger's order-id
/// idempotency.
pub async fn settle_return(
    tracker: &TransactionTracker,
    ledger: &dyn WalletLedger,
    config: &GatewayConfig,
    params: &ParameterSet,
) -> Result<SettlementReport, SettleError> {
    let verification = verify_return(config, params)?;
    let disposition = tracker.apply_return(&verification)?;

    let mut credited = false;
    if let Disposition::Settled(outcome) = &disposition {
        if outcome.is_verified() {
            guarded(config, ledger.credit(&outcome.order_id, outcome.amount_minor)).await?;
            info!(
                order_id = %outcome.order_id,
                amount_minor = outcome.amount_minor,
                "ledger credited for verified payment"
            );
            credited = true;
        }
    }

    Ok(SettlementReport {
        disposition,
        credited,
    })
}

/// Applies the configured collaborator timeout to a single call.
async fn guarded<F>(config: &GatewayConfig, call: F) -> Result<(), CollaboratorError>
where
    F: std::future::Future<Output = Result<(), CollaboratorError>>,
{
    match timeout(config.collaborator_timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout {
            timeout_ms: config.collaborator_timeout.as_millis() as u64,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
