//! Inbound callback verification and classification.
//!
//! The gateway reports an outcome twice: once through the customer's
//! browser (the return redirect) and once server-to-server (the IPN).
//! Both carry the same field family and the same HMAC, and both flow
//! through [`verify_return`].
//!
//! The checks run cheapest-first and classify rather than throw: a
//! forged or declined callback is an *expected event* and comes back as
//! data (`valid` / `success` flags). Only structurally unreadable input
//! -- a required field missing outright -- is an error, because there is
//! nothing meaningful to classify.
//!
//! One rule outranks everything else here: `success` is subordinate to
//! `valid`. A callback may carry the gateway's success code and still
//! fail signature verification; that is an attempted forgery, not a
//! payment.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{GatewayConfig, RESPONSE_CODE_SUCCESS};
use crate::crypto::mac;
use crate::error::GatewayError;
use crate::transaction::tracker::Disposition;
use crate::transaction::types::FailureReason;
use crate::wire::canonical::canonicalize;
use crate::wire::codec::{decode_amount, parse_timestamp};
use crate::wire::params::{
    ParameterSet, FIELD_AMOUNT, FIELD_BANK_CODE, FIELD_PAY_DATE, FIELD_RESPONSE_CODE,
    FIELD_SECURE_HASH, FIELD_SECURE_HASH_TYPE, FIELD_TRANSACTION_NO, FIELD_TXN_REF,
};

// ---------------------------------------------------------------------------
// ReturnVerification
// ---------------------------------------------------------------------------

/// The flat result of verifying one callback.
///
/// `valid` answers "did the gateway really send this, unmodified?";
/// `success` answers "does it claim the payment went through?". The two
/// are independent, and `success` means nothing unless `valid` is true.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnVerification {
    /// The signature verified against the shared secret.
    pub valid: bool,

    /// The response code equals the gateway's success code. Subordinate
    /// to `valid`: an unverified success claim must be treated as
    /// unverified, never as success.
    pub success: bool,

    /// The order reference the callback correlates to.
    pub order_id: String,

    /// Reported amount in minor units.
    pub amount_minor: u64,

    /// Reported amount in major units, via the codec.
    pub amount: f64,

    /// The gateway's raw response code, for logs and audits.
    pub response_code: String,

    /// The gateway's own transaction number, when present.
    pub transaction_no: Option<String>,

    /// Bank the customer paid through, when present.
    pub bank_code: Option<String>,

    /// When the gateway recorded the payment, when present and parseable.
    pub pay_date: Option<DateTime<Utc>>,

    /// Human-oriented summary of the classification, suitable for logs.
    /// End users get a generic notice; reason codes stay in audits.
    pub message: String,
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verifies and classifies an inbound callback.
///
/// The steps, cheapest first:
///
/// 1. Keep only gateway-namespaced (`vnp_*`) fields; the return URL may
///    carry arbitrary foreign query parameters.
/// 2. Pull the signature out of the working set (its type-metadata field
///    leaves with it -- neither signs itself).
/// 3. Extract the required fields: order reference, amount, response
///    code. Absence is [`GatewayError::MalformedCallback`].
/// 4. Canonicalize what remains and verify the HMAC.
/// 5. Decode the amount and assemble the flat result.
///
/// # Errors
///
/// Only structural ones ([`GatewayError::MalformedCallback`]). A
/// malformed-but-parseable payload -- wrong signature, unknown response
/// code, tampered value -- returns `Ok` with `valid == false`.
pub fn verify_return(
    config: &GatewayConfig,
    params: &ParameterSet,
) -> Result<ReturnVerification, GatewayError> {
    let mut working = params.gateway_fields();

    let candidate = working
        .remove(FIELD_SECURE_HASH)
        .ok_or(GatewayError::MalformedCallback {
            field: FIELD_SECURE_HASH,
            reason: "missing",
        })?;
    working.remove(FIELD_SECURE_HASH_TYPE);

    let order_id = required(&working, FIELD_TXN_REF)?.to_string();
    let response_code = required(&working, FIELD_RESPONSE_CODE)?.to_string();
    let amount_minor: u64 =
        required(&working, FIELD_AMOUNT)?
            .parse()
            .map_err(|_| GatewayError::MalformedCallback {
                field: FIELD_AMOUNT,
                reason: "not an unsigned integer",
            })?;

    let canonical = canonicalize(&working);
    let valid = !canonical.is_empty() && mac::verify(&canonical, &config.secret, &candidate);
    let success = response_code == RESPONSE_CODE_SUCCESS;

    let message = match (valid, success) {
        (false, _) => "signature verification failed".to_string(),
        (true, false) => format!("gateway declined with code {response_code}"),
        (true, true) => "payment confirmed by gateway".to_string(),
    };

    if valid {
        debug!(order_id = %order_id, response_code = %response_code, "callback signature verified");
    } else {
        warn!(order_id = %order_id, "callback failed signature verification");
    }

    Ok(ReturnVerification {
        valid,
        success,
        amount: decode_amount(amount_minor),
        amount_minor,
        transaction_no: working.get(FIELD_TRANSACTION_NO).map(str::to_string),
        bank_code: working.get(FIELD_BANK_CODE).map(str::to_string),
        pay_date: working
            .get(FIELD_PAY_DATE)
            .and_then(|raw| parse_timestamp(raw, config.utc_offset())),
        order_id,
        response_code,
        message,
    })
}

fn required<'a>(params: &'a ParameterSet, field: &'static str) -> Result<&'a str, GatewayError> {
    params.get(field).ok_or(GatewayError::MalformedCallback {
        field,
        reason: "missing",
    })
}

// ---------------------------------------------------------------------------
// IPN Acknowledgement
// ---------------------------------------------------------------------------

/// The acknowledgement body the gateway expects in response to a
/// server-to-server notification.
///
/// The gateway retries an IPN until it receives `RspCode` `"00"` or
/// `"02"`, so the mapping here is what stops the retry storm: record the
/// outcome (whatever it was) and say so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IpnAck {
    /// Gateway-defined acknowledgement code.
    #[serde(rename = "RspCode")]
    pub rsp_code: &'static str,
    /// Short human-readable echo of the code.
    #[serde(rename = "Message")]
    pub message: &'static str,
}

impl IpnAck {
    /// Maps a settlement attempt to the acknowledgement the gateway
    /// expects.
    pub fn for_settlement(result: &Result<Disposition, GatewayError>) -> Self {
        match result {
            Ok(Disposition::Settled(outcome)) => match outcome.reason {
                Some(FailureReason::SignatureInvalid) => Self {
                    rsp_code: "97",
                    message: "Invalid signature",
                },
                Some(FailureReason::AmountMismatch) => Self {
                    rsp_code: "04",
                    message: "Invalid amount",
                },
                // Verified, or a decline we have recorded: the
                // notification did its job either way.
                _ => Self {
                    rsp_code: "00",
                    message: "Confirm success",
                },
            },
            Ok(Disposition::Replayed(_)) => Self {
                rsp_code: "02",
                message: "Order already confirmed",
            },
            Err(GatewayError::UnknownOrder { .. }) => Self {
                rsp_code: "01",
                message: "Order not found",
            },
            Err(_) => Self {
                rsp_code: "99",
                message: "Unknown error",
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
