//! Ordered parameter sets for the gateway wire format.
//!
//! The gateway's contract is a flat bag of `vnp_*`-prefixed name/value
//! pairs, delivered as a query string in both directions. Internally we
//! keep them in a `BTreeMap`, which gives byte-wise ascending key order
//! for free -- the exact order canonicalization requires -- and makes the
//! canonical form a pure function of the set, independent of insertion
//! order.
//!
//! Empty values are dropped at insertion time. The gateway excludes
//! empty/absent fields from its own signature computation, so a value
//! that survives into the map is by definition signable.

use std::borrow::Cow;
use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field Names
// ---------------------------------------------------------------------------

/// Namespace prefix of every gateway-owned field. Anything without this
/// prefix in a callback is foreign (session state, tracking params) and
/// is ignored by verification.
pub const GATEWAY_PREFIX: &str = "vnp_";

pub const FIELD_VERSION: &str = "vnp_Version";
pub const FIELD_COMMAND: &str = "vnp_Command";
pub const FIELD_TMN_CODE: &str = "vnp_TmnCode";
pub const FIELD_AMOUNT: &str = "vnp_Amount";
pub const FIELD_CREATE_DATE: &str = "vnp_CreateDate";
pub const FIELD_EXPIRE_DATE: &str = "vnp_ExpireDate";
pub const FIELD_CURR_CODE: &str = "vnp_CurrCode";
pub const FIELD_IP_ADDR: &str = "vnp_IpAddr";
pub const FIELD_LOCALE: &str = "vnp_Locale";
pub const FIELD_ORDER_INFO: &str = "vnp_OrderInfo";
pub const FIELD_ORDER_TYPE: &str = "vnp_OrderType";
pub const FIELD_RETURN_URL: &str = "vnp_ReturnUrl";
pub const FIELD_TXN_REF: &str = "vnp_TxnRef";
pub const FIELD_BANK_CODE: &str = "vnp_BankCode";
pub const FIELD_SECURE_HASH: &str = "vnp_SecureHash";
pub const FIELD_SECURE_HASH_TYPE: &str = "vnp_SecureHashType";
pub const FIELD_RESPONSE_CODE: &str = "vnp_ResponseCode";
pub const FIELD_TRANSACTION_NO: &str = "vnp_TransactionNo";
pub const FIELD_TRANSACTION_STATUS: &str = "vnp_TransactionStatus";
pub const FIELD_PAY_DATE: &str = "vnp_PayDate";

// ---------------------------------------------------------------------------
// ParameterSet
// ---------------------------------------------------------------------------

/// An ordered set of wire parameters.
///
/// Keys are unique; values are never empty (empty insertions are dropped,
/// matching the gateway's rule that absent and empty fields are excluded
/// from signature computation). Iteration order is byte-wise ascending by
/// key, always.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    entries: BTreeMap<String, String>,
}

impl ParameterSet {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter. An empty value is a no-op: the gateway treats
    /// empty and absent identically, so we normalize to absent at the
    /// earliest possible moment.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.entries.insert(name.to_string(), value);
        }
    }

    /// Returns the value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Removes and returns the value for `name`.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    /// Number of parameters in the set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the set holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in byte-wise ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns a new set containing only gateway-namespaced (`vnp_*`)
    /// entries. Callback payloads arrive mixed with whatever else the
    /// return URL carried; only the gateway's own fields participate in
    /// verification.
    pub fn gateway_fields(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| k.starts_with(GATEWAY_PREFIX))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Renders the set as a percent-encoded query string.
    ///
    /// This is the transport form only. It is derived *after* signing and
    /// never feeds back into a signature.
    pub fn to_query(&self) -> String {
        let mut query = String::new();
        for (name, value) in self.iter() {
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(&urlencoding::encode(name));
            query.push('=');
            query.push_str(&urlencoding::encode(value));
        }
        query
    }

    /// Parses a query string into a parameter set.
    ///
    /// Accepts both `%20` and `+` for spaces (gateways and browsers
    /// disagree on form encoding). Entries that fail percent-decoding are
    /// kept with their raw value rather than dropped -- a mangled value
    /// should fail signature verification, not silently vanish from the
    /// canonical string.
    pub fn from_query(query: &str) -> Self {
        let mut set = Self::new();
        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (name, value) = match pair.split_once('=') {
                Some((n, v)) => (n, v),
                None => (pair, ""),
            };
            set.insert(&decode_component(name), decode_component(value));
        }
        set
    }
}

/// Decodes one query-string component: `+` means space, then
/// percent-unescaping. Falls back to the raw text if the escape
/// sequences are invalid.
fn decode_component(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    match urlencoding::decode(&plus_decoded) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => plus_decoded,
    }
}

impl FromIterator<(String, String)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(&name, value);
        }
        set
    }
}

impl IntoIterator for ParameterSet {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
