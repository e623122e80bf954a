//! # Keyed Signatures
//!
//! HMAC-SHA512 signing and verification -- the backbone of authentication
//! between merchant and gateway.
//!
//! Both directions of the protocol use the same construction: the
//! canonical parameter string (see [`crate::wire::canonical`]) is MACed
//! under the shared secret and the 64-byte digest travels as 128 lowercase
//! hex characters in the `vnp_SecureHash` field.
//!
//! ## Why wrap `hmac` instead of using it inline?
//!
//! 1. A single place to audit every signing operation.
//! 2. The hex encoding and case conventions live in one spot.
//! 3. Verification is forced through the constant-time path -- call sites
//!    never hold two signatures to compare by hand.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::config::SIGNATURE_HEX_LENGTH;

type HmacSha512 = Hmac<Sha512>;

/// Signs a canonical string under the shared secret.
///
/// Produces the lowercase-hex HMAC-SHA512 digest -- always 128
/// characters. Deterministic: the same canonical string and secret yield
/// the same signature, which is precisely what lets the gateway re-derive
/// and compare it.
///
/// The canonical string must contain *raw* parameter values. Signing a
/// percent-encoded string produces a signature the gateway will never
/// agree with.
pub fn sign(canonical: &str, secret: &str) -> String {
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(canonical.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a candidate signature against a canonical string and secret.
///
/// Recomputes the expected signature and compares in constant time, so
/// the comparison leaks nothing about how many leading characters
/// matched. Returns `false` on any mismatch, including a candidate of
/// the wrong length. ASCII case of the candidate is normalized first --
/// hex case carries no information and gateways differ in what they emit.
///
/// Intentionally a `bool`, not a `Result`: "not authentic" is a
/// classification, and we don't tell callers (or attackers) *why*.
pub fn verify(canonical: &str, secret: &str, candidate: &str) -> bool {
    if candidate.len() != SIGNATURE_HEX_LENGTH {
        return false;
    }
    let candidate = candidate.to_ascii_lowercase();
    let expected = sign(canonical, secret);
    expected.as_bytes().ct_eq(candidate.as_bytes()).into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
