//! Credential verification errors.

use thiserror::Error;

/// Everything that can go wrong while turning a bearer credential into a
/// verified identity.
///
/// The boundary maps every variant to HTTP 401 uniformly; the variant is
/// preserved for logging only. None of these are fatal beyond the request
/// being verified.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// No bearer credential supplied.
    #[error("no credential provided")]
    MissingCredential,

    /// Credential present but structurally invalid.
    #[error("malformed credential: {0}")]
    MalformedCredential(&'static str),

    /// Signed-token signature invalid or signing key unresolvable.
    #[error("invalid token: {0}")]
    Signature(String),

    /// Token expiry claim is in the past.
    #[error("token has expired")]
    Expired,

    /// Token not-before claim is in the future.
    #[error("token not yet valid")]
    NotYetValid,

    /// Audience, issuer, or subject claim invalid or missing.
    #[error("invalid token claims: {0}")]
    ClaimMismatch(String),

    /// Opaque-token verification against the provider failed.
    #[error("token introspection failed: {0}")]
    Introspection(String),

    /// Key-set retrieval failed or exceeded the fetch-rate bound.
    #[error("signing key fetch failed: {0}")]
    KeyFetch(String),
}

impl VerifyError {
    /// Stable identifier for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential(_) => "malformed_credential",
            Self::Signature(_) => "signature",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::ClaimMismatch(_) => "claim_mismatch",
            Self::Introspection(_) => "introspection",
            Self::KeyFetch(_) => "key_fetch",
        }
    }
}
