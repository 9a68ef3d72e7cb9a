//! Bearer credential verification and identity resolution.
//!
//! Two cooperating pieces: [`KeyResolver`] caches the provider's public
//! signing keys, and [`CredentialVerifier`] turns an inbound bearer
//! credential (signed or opaque) into a verified [`Identity`].

mod claims;
mod error;
mod jwks;
mod middleware;
mod verifier;

pub use claims::Identity;
pub use error::VerifyError;
pub use jwks::{Clock, FetchGate, KeyCache, KeyResolver, SystemClock};
pub use middleware::{AuthError, AuthState, require_auth};
pub use verifier::{BEARER_PREFIX, CredentialKind, CredentialVerifier};
