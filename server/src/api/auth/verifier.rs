//! Bearer credential verification.
//!
//! A credential is either a compact signed token (verified offline against
//! the provider's key set) or an opaque string (verified by asking the
//! provider's userinfo endpoint). [`CredentialVerifier::verify_credential`]
//! is the single entry point the middleware uses; it classifies the
//! credential and dispatches to the right path, and never surfaces an error
//! outside the [`VerifyError`] taxonomy.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use reqwest::{StatusCode, header};

use crate::core::config::OidcConfig;

use super::claims::{Identity, TokenClaims, UserInfoResponse};
use super::error::VerifyError;
use super::jwks::{Clock, KeyResolver};

/// Expected `Authorization` header scheme.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Structural shape of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Three base64url segments; verifiable offline.
    Signed,
    /// Anything else; only the provider can vouch for it.
    Opaque,
}

pub struct CredentialVerifier {
    resolver: KeyResolver,
    http: reqwest::Client,
    userinfo_url: String,
    audience: String,
    issuers: Vec<String>,
    min_credential_len: usize,
}

impl CredentialVerifier {
    pub fn new(oidc: &OidcConfig, http: reqwest::Client, clock: Arc<dyn Clock>) -> Self {
        let resolver = KeyResolver::new(
            http.clone(),
            oidc.jwks_url(),
            oidc.jwks_ttl,
            oidc.jwks_max_fetches_per_minute,
            clock,
        );
        Self {
            resolver,
            http,
            userinfo_url: oidc.userinfo_url(),
            audience: oidc.client_id.clone(),
            issuers: oidc.accepted_issuers(),
            min_credential_len: oidc.min_credential_len,
        }
    }

    /// Verify the raw `Authorization` header value, if any.
    ///
    /// The only entry point downstream callers use.
    pub async fn verify_credential(
        &self,
        authorization: Option<&str>,
    ) -> Result<Identity, VerifyError> {
        let header = authorization.ok_or(VerifyError::MissingCredential)?;
        let credential = header
            .strip_prefix(BEARER_PREFIX)
            .ok_or(VerifyError::MalformedCredential(
                "authorization header is not a bearer credential",
            ))?
            .trim();

        match self.classify(credential)? {
            CredentialKind::Signed => self.verify_signed(credential).await,
            CredentialKind::Opaque => self.verify_opaque(credential).await,
        }
    }

    /// Cheap structural classification; not a validation.
    pub fn classify(&self, raw: &str) -> Result<CredentialKind, VerifyError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(VerifyError::MalformedCredential("empty credential"));
        }
        if raw.len() < self.min_credential_len {
            return Err(VerifyError::MalformedCredential("credential too short"));
        }

        let mut segments = raw.split('.');
        let signed = segments.by_ref().take(3).filter(|s| is_base64url(s)).count() == 3
            && segments.next().is_none();
        Ok(if signed {
            CredentialKind::Signed
        } else {
            CredentialKind::Opaque
        })
    }

    /// Offline verification of a compact signed token.
    pub async fn verify_signed(&self, raw: &str) -> Result<Identity, VerifyError> {
        let header = decode_header(raw)
            .map_err(|e| VerifyError::Signature(format!("unreadable token header: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| VerifyError::Signature("token header has no key id".to_string()))?;

        let key = self.resolver.resolve(&kid).await?;

        // RS256 only. Accepting whatever algorithm the token claims would
        // open the door to algorithm-confusion forgeries.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&self.issuers);
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        let data = decode::<TokenClaims>(raw, &key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => VerifyError::Expired,
            ErrorKind::ImmatureSignature => VerifyError::NotYetValid,
            ErrorKind::InvalidAudience => {
                VerifyError::ClaimMismatch("audience does not match client id".to_string())
            }
            ErrorKind::InvalidIssuer => {
                VerifyError::ClaimMismatch("issuer not in accepted set".to_string())
            }
            ErrorKind::MissingRequiredClaim(claim) => {
                VerifyError::ClaimMismatch(format!("missing {claim} claim"))
            }
            _ => VerifyError::Signature(e.to_string()),
        })?;

        let claims = data.claims;
        let sub = claims
            .sub
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| VerifyError::ClaimMismatch("missing subject".to_string()))?;

        Ok(Identity::from_claims(
            sub,
            claims.email,
            claims.preferred_username,
            claims.name,
        ))
    }

    /// Remote verification of an opaque token via the userinfo endpoint.
    pub async fn verify_opaque(&self, raw: &str) -> Result<Identity, VerifyError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(raw)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| VerifyError::Introspection(format!("userinfo request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!("Provider rejected opaque credential");
            return Err(VerifyError::Introspection(
                "credential rejected by provider".to_string(),
            ));
        }
        if !status.is_success() {
            tracing::warn!(status = %status, "Userinfo endpoint returned an error");
            return Err(VerifyError::Introspection(format!(
                "userinfo endpoint returned {status}"
            )));
        }

        let info: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| VerifyError::Introspection(format!("invalid userinfo response: {e}")))?;

        let sub = info
            .sub
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                VerifyError::Introspection("userinfo response has no subject".to_string())
            })?;

        Ok(Identity::from_claims(
            sub,
            info.email,
            info.preferred_username,
            info.name,
        ))
    }
}

fn is_base64url(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
