//! Error types for the gateway protocol.
//!
//! Only *structural* failures are errors: bad input before signing, a
//! callback missing required fields, an order the tracker has never seen.
//! Signature mismatches and gateway declines are expected, recoverable
//! events -- they are classified and returned as data (see
//! [`crate::transaction::types::FailureReason`]), never thrown.

use thiserror::Error;

/// Errors that can occur while building requests or ingesting callbacks.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The requested amount cannot be represented in minor units.
    /// Raised before any signing or side effect takes place.
    #[error("invalid amount {value}: {reason}")]
    InvalidAmount {
        /// The offending major-unit amount as supplied by the caller.
        value: f64,
        /// Why it was rejected (negative, non-finite, too large).
        reason: &'static str,
    },

    /// A required callback field is absent or unreadable. This is a
    /// structural failure of the inbound payload, not a security event.
    #[error("malformed callback: {field}: {reason}")]
    MalformedCallback {
        /// The wire name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// A callback referenced an order the tracker never created --
    /// stale, replayed after purge, or aimed at another merchant.
    /// Security-relevant; the caller must not apply any balance effect.
    #[error("unknown order: {order_id}")]
    UnknownOrder {
        /// The order reference carried by the callback.
        order_id: String,
    },

    /// An order identifier was created twice. The tracker refuses the
    /// second creation rather than silently overwriting the first.
    #[error("duplicate order: {order_id} is already tracked")]
    DuplicateOrder {
        /// The colliding order identifier.
        order_id: String,
    },

    /// Canonicalization produced an empty string. A signature over
    /// nothing is never valid for a real transaction, so this halts
    /// request construction -- it indicates a configuration or
    /// programming error, not gateway behavior.
    #[error("empty parameter set: nothing to sign")]
    EmptyParameterSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_field() {
        let err = GatewayError::MalformedCallback {
            field: "vnp_Amount",
            reason: "missing",
        };
        assert!(err.to_string().contains("vnp_Amount"));
    }

    #[test]
    fn unknown_order_carries_the_reference() {
        let err = GatewayError::UnknownOrder {
            order_id: "1700000000000_000042".to_string(),
        };
        assert!(err.to_string().contains("1700000000000_000042"));
    }
}
