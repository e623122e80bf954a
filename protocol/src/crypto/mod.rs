//! # Cryptographic Primitives
//!
//! Exactly one construction lives here: HMAC-SHA512 over the canonical
//! parameter string, keyed by the merchant's shared secret. That is the
//! entire authentication story of the gateway contract -- there are no
//! asymmetric keys, no certificates, just one well-keyed MAC on each side
//! of the wire.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. The MAC is the audited `hmac` + `sha2` pair, and the
//! comparison is `subtle`'s constant-time equality. If you're tempted to
//! replace the comparison with `==` because it "reads cleaner", go read
//! about timing attacks and come back when you've lost the urge.

pub mod mac;

pub use mac::{sign, verify};
