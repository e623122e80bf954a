//! # Wire Module
//!
//! Everything that shapes bytes for the gateway: the ordered parameter
//! set, the canonical serialization that feeds the signature, and the
//! codecs for amounts, timestamps, and order identifiers.
//!
//! ## Layering
//!
//! ```text
//! params.rs    — ParameterSet: ordered name/value map + query rendering
//! canonical.rs — canonicalize(): the exact byte string that gets signed
//! codec.rs     — amount scaling, fixed-offset timestamps, order ids
//! ```
//!
//! The one invariant that matters above all others: signatures are
//! computed over *raw* values, and percent-encoding happens only when the
//! final query string is rendered. The two representations must never be
//! mixed, or the merchant and the gateway will disagree about what was
//! signed.

pub mod canonical;
pub mod codec;
pub mod params;

pub use canonical::canonicalize;
pub use params::ParameterSet;
