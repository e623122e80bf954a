//! Outbound payment request construction.
//!
//! The [`RequestBuilder`] assembles the signable parameter set, signs it,
//! and only then renders the percent-encoded redirect URL. The ordering
//! is load-bearing: the signature covers raw values, and the encoded
//! transport form is derived afterwards from the *same* set -- encoding
//! never feeds back into what was signed.
//!
//! The builder does not talk to the network and does not persist
//! anything. It returns the redirect URL together with the order
//! identifier so the caller can record a pending purchase before
//! navigating the customer away (see [`crate::collaborators`]).

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{
    GatewayConfig, COMMAND_PAY, CURRENCY_VND, GATEWAY_API_VERSION, SECURE_HASH_TYPE,
};
use crate::crypto::mac;
use crate::error::GatewayError;
use crate::wire::canonical::canonicalize;
use crate::wire::codec::{encode_amount, format_timestamp, new_order_id};
use crate::wire::params::{
    ParameterSet, FIELD_AMOUNT, FIELD_BANK_CODE, FIELD_COMMAND, FIELD_CREATE_DATE, FIELD_CURR_CODE,
    FIELD_EXPIRE_DATE, FIELD_IP_ADDR, FIELD_LOCALE, FIELD_ORDER_INFO, FIELD_ORDER_TYPE,
    FIELD_RETURN_URL, FIELD_SECURE_HASH, FIELD_SECURE_HASH_TYPE, FIELD_TMN_CODE, FIELD_TXN_REF,
    FIELD_VERSION,
};

// ---------------------------------------------------------------------------
// SignedRequest
// ---------------------------------------------------------------------------

/// A fully built, signed payment request.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// The complete redirect target: pay URL, `?`, percent-encoded query
    /// including the signature.
    pub redirect_url: String,

    /// The order identifier minted for this attempt. Persist it before
    /// redirecting; every callback correlates through it.
    pub order_id: String,

    /// The requested amount in minor units, as sent on the wire.
    pub amount_minor: u64,

    /// The wire parameters, signature fields included. Mostly useful for
    /// diagnostics and tests; the canonical source of truth is the URL.
    pub params: ParameterSet,
}

// ---------------------------------------------------------------------------
// RequestBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for signed payment requests.
///
/// # Usage
///
/// ```rust,no_run
/// use vanpay_protocol::config::GatewayConfig;
/// use vanpay_protocol::gateway::request::RequestBuilder;
///
/// let config = GatewayConfig::sandbox("TMN01", "secret", "https://shop.example/return");
/// let request = RequestBuilder::new(&config)
///     .amount(150_000.0)
///     .order_info("Top-up 150k credits")
///     .client_ip("203.0.113.7")
///     .build()
///     .expect("valid request");
///
/// // Persist request.order_id, then redirect to request.redirect_url.
/// ```
///
/// The builder stamps the creation time and mints an order identifier at
/// build time by default. Both can be overridden, which is how the tests
/// pin down byte-exact expected signatures.
pub struct RequestBuilder<'a> {
    config: &'a GatewayConfig,
    amount_major: Option<f64>,
    order_info: String,
    client_ip: String,
    bank_code: Option<String>,
    locale: Option<String>,
    order_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl<'a> RequestBuilder<'a> {
    /// Creates a builder bound to a merchant configuration.
    pub fn new(config: &'a GatewayConfig) -> Self {
        Self {
            config,
            amount_major: None,
            order_info: String::new(),
            client_ip: String::new(),
            bank_code: None,
            locale: None,
            order_id: None,
            created_at: None,
        }
    }

    /// Sets the amount in major units (e.g. `150000.0` VND).
    pub fn amount(mut self, major: f64) -> Self {
        self.amount_major = Some(major);
        self
    }

    /// Sets the order description shown on the checkout page.
    pub fn order_info(mut self, description: &str) -> Self {
        self.order_info = description.to_string();
        self
    }

    /// Sets the customer's IP address, required by the gateway's risk
    /// checks.
    pub fn client_ip(mut self, ip: &str) -> Self {
        self.client_ip = ip.to_string();
        self
    }

    /// Pre-selects a bank on the checkout page. Optional; omitted, the
    /// customer chooses there.
    pub fn bank_code(mut self, code: &str) -> Self {
        self.bank_code = Some(code.to_string());
        self
    }

    /// Overrides the configured checkout locale for this request.
    pub fn locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }

    /// Overrides the generated order identifier. Meant for tests and for
    /// callers with their own reference scheme.
    pub fn order_id(mut self, order_id: &str) -> Self {
        self.order_id = Some(order_id.to_string());
        self
    }

    /// Overrides the creation timestamp. Meant for tests.
    pub fn created_at(mut self, instant: DateTime<Utc>) -> Self {
        self.created_at = Some(instant);
        self
    }

    /// Assembles, signs, and encodes the request.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidAmount`] if no amount was supplied or it
    ///   cannot be represented in minor units. Fires before any signing.
    /// - [`GatewayError::EmptyParameterSet`] if the signable set came out
    ///   empty -- a configuration error, never gateway behavior.
    pub fn build(self) -> Result<SignedRequest, GatewayError> {
        let major = self.amount_major.ok_or(GatewayError::InvalidAmount {
            value: f64::NAN,
            reason: "no amount supplied",
        })?;
        let amount_minor = encode_amount(major)?;

        let order_id = self.order_id.unwrap_or_else(new_order_id);
        let created = self.created_at.unwrap_or_else(Utc::now);
        let expires = created
            + chrono::Duration::from_std(self.config.request_ttl)
                .unwrap_or_else(|_| chrono::Duration::zero());
        let offset = self.config.utc_offset();

        let mut params = ParameterSet::new();
        params.insert(FIELD_VERSION, GATEWAY_API_VERSION);
        params.insert(FIELD_COMMAND, COMMAND_PAY);
        params.insert(FIELD_TMN_CODE, self.config.tmn_code.as_str());
        params.insert(FIELD_AMOUNT, amount_minor.to_string());
        params.insert(FIELD_CREATE_DATE, format_timestamp(created, offset));
        params.insert(FIELD_EXPIRE_DATE, format_timestamp(expires, offset));
        params.insert(FIELD_CURR_CODE, CURRENCY_VND);
        params.insert(FIELD_IP_ADDR, self.client_ip);
        params.insert(
            FIELD_LOCALE,
            self.locale.unwrap_or_else(|| self.config.locale.clone()),
        );
        params.insert(FIELD_ORDER_INFO, self.order_info);
        params.insert(FIELD_ORDER_TYPE, self.config.order_type.as_str());
        params.insert(FIELD_RETURN_URL, self.config.return_url.as_str());
        params.insert(FIELD_TXN_REF, order_id.as_str());
        if let Some(bank) = self.bank_code {
            params.insert(FIELD_BANK_CODE, bank);
        }

        // Sign the raw canonical form, then -- and only then -- attach the
        // signature fields and render the transport encoding.
        let canonical = canonicalize(&params);
        if canonical.is_empty() {
            return Err(GatewayError::EmptyParameterSet);
        }
        let signature = mac::sign(&canonical, &self.config.secret);

        let mut wire = params;
        wire.insert(FIELD_SECURE_HASH_TYPE, SECURE_HASH_TYPE);
        wire.insert(FIELD_SECURE_HASH, signature);

        let redirect_url = format!("{}?{}", self.config.pay_url, wire.to_query());
        debug!(
            order_id = %order_id,
            amount_minor,
            expires = %format_timestamp(expires, offset),
            "built signed payment request"
        );

        Ok(SignedRequest {
            redirect_url,
            order_id,
            amount_minor,
            params: wire,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_config() -> GatewayConfig {
        GatewayConfig::sandbox("TESTTMN1", "test-shared-secret", "https://shop.example/return")
    }

    fn fixed_instant() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn build_fixed(config: &GatewayConfig) -> SignedRequest {
        RequestBuilder::new(config)
            .amount(150_000.0)
            .order_info("Top-up 150k credits")
            .client_ip("203.0.113.7")
            .order_id("1700000000000_000042")
            .created_at(fixed_instant())
            .build()
            .unwrap()
    }

    #[test]
    fn redirect_url_targets_the_configured_pay_page() {
        let config = test_config();
        let request = build_fixed(&config);
        assert!(request
            .redirect_url
            .starts_with("https://sandbox.vanpay.vn/paymentv2/vpcpay.html?"));
    }

    #[test]
    fn amount_is_scaled_to_minor_units_on_the_wire() {
        let config = test_config();
        let request = build_fixed(&config);
        assert_eq!(request.amount_minor, 15_000_000);
        assert_eq!(request.params.get(FIELD_AMOUNT), Some("15000000"));
    }

    #[test]
    fn signature_covers_raw_values_and_verifies() {
        let config = test_config();
        let request = build_fixed(&config);

        // Re-derive the canonical string the way the gateway will: strip
        // the signature fields, canonicalize the rest raw.
        let mut working = request.params.clone();
        let signature = working.remove(FIELD_SECURE_HASH).unwrap();
        working.remove(FIELD_SECURE_HASH_TYPE).unwrap();
        let canonical = canonicalize(&working);

        assert!(canonical.contains("vnp_OrderInfo=Top-up 150k credits"));
        assert!(mac::verify(&canonical, &config.secret, &signature));
    }

    #[test]
    fn query_is_percent_encoded_but_signature_is_not_affected() {
        let config = test_config();
        let request = build_fixed(&config);

        // The transport form carries no raw spaces...
        let query = request.redirect_url.split_once('?').unwrap().1;
        assert!(!query.contains(' '));

        // ...and decoding it back yields exactly the signed set.
        let decoded = ParameterSet::from_query(query);
        assert_eq!(decoded, request.params);
    }

    #[test]
    fn build_is_deterministic_when_pinned() {
        let config = test_config();
        let a = build_fixed(&config);
        let b = build_fixed(&config);
        assert_eq!(a.redirect_url, b.redirect_url);
    }

    #[test]
    fn expire_date_is_create_date_plus_ttl() {
        let config = test_config();
        let request = build_fixed(&config);
        let offset = config.utc_offset();

        let created =
            crate::wire::codec::parse_timestamp(request.params.get(FIELD_CREATE_DATE).unwrap(), offset)
                .unwrap();
        let expires =
            crate::wire::codec::parse_timestamp(request.params.get(FIELD_EXPIRE_DATE).unwrap(), offset)
                .unwrap();
        assert_eq!(expires - created, chrono::Duration::from_std(config.request_ttl).unwrap());
    }

    #[test]
    fn missing_amount_aborts_before_signing() {
        let config = test_config();
        let result = RequestBuilder::new(&config)
            .order_info("no amount")
            .client_ip("203.0.113.7")
            .build();
        assert!(matches!(result, Err(GatewayError::InvalidAmount { .. })));
    }

    #[test]
    fn invalid_amount_aborts_before_signing() {
        let config = test_config();
        let result = RequestBuilder::new(&config)
            .amount(-5.0)
            .order_info("negative")
            .client_ip("203.0.113.7")
            .build();
        assert!(matches!(result, Err(GatewayError::InvalidAmount { .. })));
    }

    #[test]
    fn bank_code_is_optional() {
        let config = test_config();
        let without = build_fixed(&config);
        assert_eq!(without.params.get(FIELD_BANK_CODE), None);

        let with = RequestBuilder::new(&config)
            .amount(150_000.0)
            .order_info("Top-up")
            .client_ip("203.0.113.7")
            .bank_code("NCB")
            .order_id("1700000000000_000042")
            .created_at(fixed_instant())
            .build()
            .unwrap();
        assert_eq!(with.params.get(FIELD_BANK_CODE), Some("NCB"));
        assert_ne!(
            with.params.get(FIELD_SECURE_HASH),
            without.params.get(FIELD_SECURE_HASH),
            "the bank code must be covered by the signature"
        );
    }

    #[test]
    fn generated_order_id_lands_in_the_txn_ref_field() {
        let config = test_config();
        let request = RequestBuilder::new(&config)
            .amount(1_000.0)
            .order_info("auto id")
            .client_ip("203.0.113.7")
            .build()
            .unwrap();
        assert_eq!(
            request.params.get(FIELD_TXN_REF),
            Some(request.order_id.as_str())
        );
    }
}
