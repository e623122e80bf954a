//! # Gateway Module
//!
//! The two halves of the conversation with the hosted-checkout gateway:
//!
//! ```text
//! request.rs  — Outbound: build, sign, and percent-encode a redirect URL
//! callback.rs — Inbound: authenticate and classify returns and IPNs
//! ```
//!
//! Both halves are composed from the same primitives (`wire` for
//! canonical form and codecs, `crypto` for the MAC), which is what keeps
//! them in agreement: a request this module builds verifies under the
//! same rules it applies to callbacks.

pub mod callback;
pub mod request;

pub use callback::{verify_return, IpnAck, ReturnVerification};
pub use request::{RequestBuilder, SignedRequest};
