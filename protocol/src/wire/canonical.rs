//! Canonical serialization of signable parameters.
//!
//! The canonical string is the exact byte sequence the HMAC is computed
//! over, on both sides of the wire. The rules are small and absolute:
//!
//! 1. Empty values are excluded (normalized away at insertion, enforced
//!    again here).
//! 2. Keys sort ascending by ordinal (byte) comparison -- never
//!    locale-aware collation, which varies by host and would make the
//!    merchant and the gateway sign different strings.
//! 3. Entries join as `key=value` with `&`, using *raw* values. Percent
//!    encoding is a transport concern and must never appear here.
//!
//! Callers are responsible for excluding the signature field itself (and
//! its type-metadata field) from the set before canonicalizing; the
//! request builder signs before attaching them and the return verifier
//! strips them first.

use super::params::ParameterSet;

/// Derives the canonical string for a parameter set.
///
/// Pure and deterministic: any permutation of the same entries produces
/// an identical result. An empty set (or one that becomes empty after
/// filtering) yields the empty string, which callers must treat as an
/// error upstream -- a signature over nothing is never valid for a real
/// transaction.
pub fn canonicalize(params: &ParameterSet) -> String {
    let mut canonical = String::new();
    for (name, value) in params.iter() {
        if value.is_empty() {
            continue;
        }
        if !canonical.is_empty() {
            canonical.push('&');
        }
        canonical.push_str(name);
        canonical.push('=');
        canonical.push_str(value);
    }
    canonical
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
