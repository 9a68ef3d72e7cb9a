//! End-to-end credential verification against a mock identity provider.

mod common;

use serde_json::json;

use common::{
    LEGACY_ISSUER, now_secs, sign_token, sign_token_with_kid, spawn_provider, valid_claims,
    verifier_for,
};
use ember_server::api::auth::VerifyError;

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[tokio::test]
async fn signed_token_round_trip() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let token = sign_token(&valid_claims(&provider.authority(), "u-42"));
    let identity = verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap();

    assert_eq!(identity.id, "u-42");
    assert_eq!(identity.username, "u-42");
    assert_eq!(identity.email, None);
}

#[tokio::test]
async fn signed_token_carries_profile_claims() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let token = sign_token(&json!({
        "sub": "u-42",
        "aud": common::TEST_CLIENT_ID,
        "iss": provider.authority(),
        "exp": now_secs() + 3600,
        "email": "u42@bonfire.moe",
        "preferred_username": "torchbearer",
    }));
    let identity = verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap();

    assert_eq!(identity.username, "torchbearer");
    assert_eq!(identity.email.as_deref(), Some("u42@bonfire.moe"));
}

#[tokio::test]
async fn missing_header_is_rejected() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let err = verifier.verify_credential(None).await.unwrap_err();
    assert!(matches!(err, VerifyError::MissingCredential));
}

#[tokio::test]
async fn non_bearer_scheme_is_rejected() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let err = verifier
        .verify_credential(Some("Basic dXNlcjpwYXNz"))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::MalformedCredential(_)));
}

#[tokio::test]
async fn wrong_audience_is_rejected() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let token = sign_token(&json!({
        "sub": "u-42",
        "aud": "some-other-client",
        "iss": provider.authority(),
        "exp": now_secs() + 3600,
    }));
    let err = verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::ClaimMismatch(_)));
}

#[tokio::test]
async fn accepted_issuer_variants_all_pass() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let authority = provider.authority();
    let issuers = [authority.clone(), format!("{authority}/"), LEGACY_ISSUER.to_string()];
    for issuer in &issuers {
        let token = sign_token(&valid_claims(issuer, "u-42"));
        let identity = verifier
            .verify_credential(Some(&bearer(&token)))
            .await
            .unwrap();
        assert_eq!(identity.id, "u-42", "issuer {issuer} should be accepted");
    }
}

#[tokio::test]
async fn unknown_issuer_is_rejected() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let token = sign_token(&valid_claims("https://evil.example", "u-42"));
    let err = verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::ClaimMismatch(_)));
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let token = sign_token(&json!({
        "sub": "u-42",
        "aud": common::TEST_CLIENT_ID,
        "iss": provider.authority(),
        "exp": now_secs() - 3600,
    }));
    let err = verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::Expired));
}

#[tokio::test]
async fn not_yet_valid_token_is_rejected() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let token = sign_token(&json!({
        "sub": "u-42",
        "aud": common::TEST_CLIENT_ID,
        "iss": provider.authority(),
        "nbf": now_secs() + 3600,
        "exp": now_secs() + 7200,
    }));
    let err = verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::NotYetValid));
}

#[tokio::test]
async fn tampered_signature_is_rejected() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let mut token = sign_token(&valid_claims(&provider.authority(), "u-42"));
    let last = token.pop().unwrap();
    token.push(if last == 'A' { 'B' } else { 'A' });

    let err = verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::Signature(_)));
}

#[tokio::test]
async fn symmetric_algorithm_is_rejected() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    // Forgery attempt: same kid, but HMAC-signed instead of RSA-signed.
    let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256);
    header.kid = Some(common::TEST_KID.to_string());
    let token = jsonwebtoken::encode(
        &header,
        &valid_claims(&provider.authority(), "u-42"),
        &jsonwebtoken::EncodingKey::from_secret(b"guessable"),
    )
    .unwrap();

    let err = verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::Signature(_)));
}

#[tokio::test]
async fn missing_subject_claim_is_rejected() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let token = sign_token(&json!({
        "aud": common::TEST_CLIENT_ID,
        "iss": provider.authority(),
        "exp": now_secs() + 3600,
    }));
    let err = verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::ClaimMismatch(_)));
}

#[tokio::test]
async fn empty_subject_claim_is_rejected() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let token = sign_token(&json!({
        "sub": "  ",
        "aud": common::TEST_CLIENT_ID,
        "iss": provider.authority(),
        "exp": now_secs() + 3600,
    }));
    let err = verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::ClaimMismatch(_)));
}

#[tokio::test]
async fn unknown_key_id_is_rejected() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let token = sign_token_with_kid(&valid_claims(&provider.authority(), "u-42"), "not-published");
    let err = verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::KeyFetch(_)));
}

#[tokio::test]
async fn key_set_is_fetched_once_for_repeated_verifications() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let token = sign_token(&valid_claims(&provider.authority(), "u-42"));
    verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap();
    verifier
        .verify_credential(Some(&bearer(&token)))
        .await
        .unwrap();

    assert_eq!(provider.fetch_count(), 1);
}

#[tokio::test]
async fn opaque_credential_round_trip() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let identity = verifier
        .verify_credential(Some("Bearer opaquestring123"))
        .await
        .unwrap();

    assert_eq!(identity.id, "u-7");
    assert_eq!(identity.email.as_deref(), Some("a@b.com"));
    assert_eq!(identity.username, "u-7");
    // No key-set fetch happens on the opaque path.
    assert_eq!(provider.fetch_count(), 0);
}

#[tokio::test]
async fn rejected_opaque_credential_fails_introspection() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let err = verifier
        .verify_credential(Some("Bearer someotheropaque"))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::Introspection(_)));
}

#[tokio::test]
async fn userinfo_without_subject_fails_introspection() {
    let provider = spawn_provider().await;
    let verifier = verifier_for(&provider);

    let err = verifier
        .verify_credential(Some("Bearer opaque-nosubject"))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::Introspection(_)));
}
