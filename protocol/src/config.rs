//! # Gateway Constants & Merchant Configuration
//!
//! Every magic value of the VanPay wire contract lives here. If you're
//! hardcoding a gateway constant somewhere else, you're doing it wrong
//! and you owe the team coffee.
//!
//! The constants are fixed by the gateway's published contract -- they are
//! not tunables. The [`GatewayConfig`] struct carries the per-merchant
//! values (merchant code, shared secret, URLs) that are issued by the
//! gateway when the account is opened.

use std::fmt;
use std::time::Duration;

use chrono::FixedOffset;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Wire Contract Constants
// ---------------------------------------------------------------------------

/// Gateway API version sent in every request. The gateway rejects
/// requests from versions it no longer supports, so bump deliberately.
pub const GATEWAY_API_VERSION: &str = "2.1.0";

/// The only command this library issues: a hosted-checkout payment.
pub const COMMAND_PAY: &str = "pay";

/// Settlement currency. The gateway quotes and settles in Vietnamese
/// dong; amounts on the wire are in its minor unit (xu, 10^-2).
pub const CURRENCY_VND: &str = "VND";

/// The response code the gateway uses to report a successful payment.
/// Every other code is a decline or an error, detailed in the gateway's
/// response-code table.
pub const RESPONSE_CODE_SUCCESS: &str = "00";

/// Default checkout-page locale.
pub const DEFAULT_LOCALE: &str = "vn";

/// Default order-type classification required by the gateway's
/// reporting. Merchants with category-specific contracts override it.
pub const DEFAULT_ORDER_TYPE: &str = "other";

/// Value of the signature-type metadata field. This library signs with
/// HMAC-SHA512 and nothing else.
pub const SECURE_HASH_TYPE: &str = "HmacSHA512";

/// Minor units per major unit. The gateway works in 10^-2 units, so a
/// request for 150,000 VND carries `15000000` on the wire.
pub const AMOUNT_SCALE: u64 = 100;

/// Timestamp layout for `vnp_CreateDate` / `vnp_ExpireDate` /
/// `vnp_PayDate`: `YYYYMMDDHHmmss`, no separators, no zone suffix.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// The gateway interprets all wire timestamps in UTC+7 regardless of
/// where the merchant's servers run. Rendering in any other zone shifts
/// the expiry window and breaks reconciliation reports.
pub const GATEWAY_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// HMAC-SHA512 digests are 64 bytes, so the hex signature is always
/// exactly 128 characters. A candidate of any other length is rejected
/// before comparison.
pub const SIGNATURE_HEX_LENGTH: usize = 128;

/// Number of decimal digits in the random order-id suffix.
pub const ORDER_ID_SUFFIX_DIGITS: u32 = 6;

// ---------------------------------------------------------------------------
// Gateway Endpoints
// ---------------------------------------------------------------------------

/// Production hosted-checkout page.
pub const PRODUCTION_PAY_URL: &str = "https://pay.vanpay.vn/paymentv2/vpcpay.html";

/// Sandbox hosted-checkout page. Test cards only; settles nothing.
pub const SANDBOX_PAY_URL: &str = "https://sandbox.vanpay.vn/paymentv2/vpcpay.html";

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// How long a signed request remains payable. The expiry timestamp sent
/// with the request is `create date + this`.
pub const DEFAULT_REQUEST_TTL: Duration = Duration::from_secs(15 * 60);

/// Upper bound on a single collaborator call (backend record, ledger
/// credit). The signing/verification core itself never blocks; this
/// guards only the surrounding I/O.
pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// GatewayConfig
// ---------------------------------------------------------------------------

/// Per-merchant gateway configuration.
///
/// Issued by the gateway at account opening. The shared secret keys every
/// signature this library produces or checks -- it belongs in server-side
/// configuration only and must never reach code shipped to a browser or
/// any other untrusted execution context.
///
/// `Debug` deliberately redacts the secret so it cannot leak through
/// logs or panic messages.
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// Merchant terminal code identifying the account.
    pub tmn_code: String,

    /// Shared HMAC secret. Keys all signing and verification.
    pub secret: String,

    /// Hosted-checkout page the customer is redirected to.
    pub pay_url: String,

    /// Where the gateway sends the customer back after payment.
    pub return_url: String,

    /// Checkout-page locale.
    pub locale: String,

    /// Order-type classification for gateway reporting.
    pub order_type: String,

    /// UTC offset, in seconds, the gateway interprets timestamps in.
    pub utc_offset_secs: i32,

    /// How long a signed request remains payable.
    pub request_ttl: Duration,

    /// Timeout applied to collaborator calls (the only I/O this crate
    /// ever awaits).
    pub collaborator_timeout: Duration,
}

impl GatewayConfig {
    /// Production configuration for a merchant account.
    pub fn new(tmn_code: &str, secret: &str, return_url: &str) -> Self {
        Self {
            tmn_code: tmn_code.to_string(),
            secret: secret.to_string(),
            pay_url: PRODUCTION_PAY_URL.to_string(),
            return_url: return_url.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            order_type: DEFAULT_ORDER_TYPE.to_string(),
            utc_offset_secs: GATEWAY_UTC_OFFSET_SECS,
            request_ttl: DEFAULT_REQUEST_TTL,
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }

    /// Sandbox configuration. Same contract, test endpoint.
    pub fn sandbox(tmn_code: &str, secret: &str, return_url: &str) -> Self {
        Self {
            pay_url: SANDBOX_PAY_URL.to_string(),
            ..Self::new(tmn_code, secret, return_url)
        }
    }

    /// The gateway's fixed UTC offset as a chrono [`FixedOffset`].
    ///
    /// Falls back to the contract default if the configured offset is
    /// out of chrono's representable range, which only happens on a
    /// hand-edited config.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs)
            .unwrap_or_else(|| FixedOffset::east_opt(GATEWAY_UTC_OFFSET_SECS).expect("contract offset is in range"))
    }

    /// Returns `true` if this config points at the production endpoint.
    pub fn is_production(&self) -> bool {
        self.pay_url == PRODUCTION_PAY_URL
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("tmn_code", &self.tmn_code)
            .field("secret", &"<redacted>")
            .field("pay_url", &self.pay_url)
            .field("return_url", &self.return_url)
            .field("locale", &self.locale)
            .field("order_type", &self.order_type)
            .field("utc_offset_secs", &self.utc_offset_secs)
            .field("request_ttl", &self.request_ttl)
            .field("collaborator_timeout", &self.collaborator_timeout)
            .finish()
    }
}
