//! Identity resolution from token claims and userinfo responses.

use serde::{Deserialize, Serialize};

/// Identity resolved from a verified credential.
///
/// Produced exactly once per successful verification and attached to the
/// request extensions. Never persisted by this subsystem.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    /// Stable subject identifier from the provider.
    pub id: String,
    pub email: Option<String>,
    pub username: String,
}

impl Identity {
    /// Build an identity from the enumerated claim fields.
    ///
    /// Username precedence: `preferred_username`, then `name`, then the
    /// subject as a last resort. Empty strings count as absent.
    pub(crate) fn from_claims(
        sub: String,
        email: Option<String>,
        preferred_username: Option<String>,
        name: Option<String>,
    ) -> Self {
        let username = preferred_username
            .filter(|s| !s.trim().is_empty())
            .or(name.filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| sub.clone());
        Self {
            id: sub,
            email,
            username,
        }
    }
}

/// Claims read from a verified signed token. Anything not listed here is
/// ignored.
///
/// `sub` stays optional here even though verification requires it:
/// deserialization into this struct happens before claim validation, so a
/// required field would turn an absent subject into a decode error instead
/// of a claim error.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenClaims {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub preferred_username: Option<String>,
    pub name: Option<String>,
}

/// Body of a successful userinfo response.
#[derive(Debug, Deserialize)]
pub(crate) struct UserInfoResponse {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub preferred_username: Option<String>,
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_prefers_preferred_username() {
        let identity = Identity::from_claims(
            "u-1".into(),
            None,
            Some("ember_fan".into()),
            Some("Full Name".into()),
        );
        assert_eq!(identity.username, "ember_fan");
    }

    #[test]
    fn username_falls_back_to_name() {
        let identity = Identity::from_claims("u-1".into(), None, None, Some("Full Name".into()));
        assert_eq!(identity.username, "Full Name");
    }

    #[test]
    fn username_falls_back_to_subject() {
        let identity = Identity::from_claims("u-1".into(), None, None, None);
        assert_eq!(identity.username, "u-1");
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let identity = Identity::from_claims("u-1".into(), None, Some("  ".into()), Some("".into()));
        assert_eq!(identity.username, "u-1");
    }

    #[test]
    fn email_is_carried_through() {
        let identity = Identity::from_claims("u-1".into(), Some("a@b.com".into()), None, None);
        assert_eq!(identity.email.as_deref(), Some("a@b.com"));
    }
}
