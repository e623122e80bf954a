//! Amount, timestamp, and order-identifier codecs.
//!
//! The gateway works in integer minor units and zone-fixed compact
//! timestamps. Floating point exists in exactly one place in this crate:
//! the major-unit boundary of [`encode_amount`] / [`decode_amount`],
//! where the caller's UI hands over a human-entered number. Everything
//! past that boundary is `u64` minor units. No floating point anywhere
//! else near money.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use rand::Rng;

use crate::config::{AMOUNT_SCALE, ORDER_ID_SUFFIX_DIGITS, TIMESTAMP_FORMAT};
use crate::error::GatewayError;

/// Largest scaled amount that is still exactly representable in an
/// `f64`. Above 2^53 the round trip stops being lossless, and a payment
/// amount that cannot survive its own round trip has no business being
/// signed.
const MAX_EXACT_SCALED: f64 = 9_007_199_254_740_992.0; // 2^53

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Converts a major-unit amount to the gateway's integer minor units.
///
/// Scales by 100 and rounds to the nearest integer, so `150000.0`
/// becomes `15000000` on the wire.
///
/// # Errors
///
/// [`GatewayError::InvalidAmount`] if the input is negative, non-finite,
/// or too large to scale without losing exactness. This fires before any
/// signing or side effect.
pub fn encode_amount(major: f64) -> Result<u64, GatewayError> {
    if !major.is_finite() {
        return Err(GatewayError::InvalidAmount {
            value: major,
            reason: "not a finite number",
        });
    }
    if major < 0.0 {
        return Err(GatewayError::InvalidAmount {
            value: major,
            reason: "negative",
        });
    }
    let scaled = (major * AMOUNT_SCALE as f64).round();
    if scaled > MAX_EXACT_SCALED {
        return Err(GatewayError::InvalidAmount {
            value: major,
            reason: "too large to represent exactly in minor units",
        });
    }
    Ok(scaled as u64)
}

/// Converts gateway minor units back to a major-unit amount.
pub fn decode_amount(minor: u64) -> f64 {
    minor as f64 / AMOUNT_SCALE as f64
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Formats an instant as the gateway's compact `YYYYMMDDHHmmss` layout,
/// rendered in the given fixed UTC offset.
///
/// The output depends only on the instant and the offset -- never on the
/// host's locale or timezone database, which is what keeps two merchant
/// servers in different regions producing identical signed requests.
pub fn format_timestamp(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    instant
        .with_timezone(&offset)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Parses a gateway timestamp (`YYYYMMDDHHmmss`, interpreted in the
/// given offset) back to UTC. Returns `None` on any malformed input;
/// callback timestamps are informational and never worth failing a
/// verification over.
pub fn parse_timestamp(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Order Identifiers
// ---------------------------------------------------------------------------

/// Generates a fresh order identifier:
/// `{millisecond-timestamp}_{6-digit zero-padded random}`.
///
/// The random suffix distinguishes identifiers minted within the same
/// millisecond. The format is fixed by the gateway's reference-field
/// conventions; it is *not* collision-proof, which is why
/// [`crate::transaction::tracker::TransactionTracker::create`] refuses
/// duplicates instead of trusting uniqueness.
pub fn new_order_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..10u32.pow(ORDER_ID_SUFFIX_DIGITS));
    format!(
        "{millis}_{suffix:0width$}",
        width = ORDER_ID_SUFFIX_DIGITS as usize
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_offset() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn amount_roundtrip() {
        let minor = encode_amount(150_000.0).unwrap();
        assert_eq!(minor, 15_000_000);
        assert_eq!(decode_amount(minor), 150_000.0);
    }

    #[test]
    fn amount_rounds_to_nearest_minor_unit() {
        assert_eq!(encode_amount(10.555).unwrap(), 1056);
        assert_eq!(encode_amount(10.554).unwrap(), 1055);
    }

    #[test]
    fn amount_rejects_negative() {
        match encode_amount(-1.0) {
            Err(GatewayError::InvalidAmount { reason, .. }) => assert_eq!(reason, "negative"),
            other => panic!("expected InvalidAmount, got {:?}", other),
        }
    }

    #[test]
    fn amount_rejects_non_finite() {
        assert!(encode_amount(f64::NAN).is_err());
        assert!(encode_amount(f64::INFINITY).is_err());
        assert!(encode_amount(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn amount_rejects_unrepresentable_magnitude() {
        assert!(encode_amount(1e18).is_err());
    }

    #[test]
    fn zero_amount_encodes_to_zero() {
        // Zero is representable; whether it is *acceptable* is the
        // caller's policy, not the codec's.
        assert_eq!(encode_amount(0.0).unwrap(), 0);
    }

    #[test]
    fn timestamp_renders_in_gateway_offset() {
        // 2023-11-14T22:13:20Z is 2023-11-15T05:13:20 at UTC+7.
        let instant = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(format_timestamp(instant, gateway_offset()), "20231115051320");
    }

    #[test]
    fn timestamp_roundtrip() {
        let instant = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let rendered = format_timestamp(instant, gateway_offset());
        let parsed = parse_timestamp(&rendered, gateway_offset()).unwrap();
        assert_eq!(parsed, instant);
    }

    #[test]
    fn timestamp_parse_rejects_garbage() {
        assert!(parse_timestamp("not-a-date", gateway_offset()).is_none());
        assert!(parse_timestamp("2023111", gateway_offset()).is_none());
    }

    #[test]
    fn order_id_has_wire_format() {
        let id = new_order_id();
        let (millis, suffix) = id.split_once('_').expect("separator");
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn order_ids_are_distinguishable_within_a_burst() {
        // 6 random digits make same-millisecond collisions unlikely in a
        // small burst; this is a smoke test, not a uniqueness proof.
        let ids: std::collections::HashSet<String> = (0..32).map(|_| new_order_id()).collect();
        assert!(ids.len() >= 30);
    }
}
