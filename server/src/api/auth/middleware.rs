//! Authentication middleware

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::error::VerifyError;
use super::verifier::CredentialVerifier;

/// Shared auth state for middleware and the admin check.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<CredentialVerifier>,
    /// Provider subject ids granted admin access.
    pub admin_user_ids: Arc<Vec<String>>,
}

impl AuthState {
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_user_ids.iter().any(|id| id == user_id)
    }
}

/// Authentication error response.
///
/// Every verification failure is equally "unauthorized" from the caller's
/// perspective; the kind only shows up in logs.
#[derive(Debug)]
pub struct AuthError(VerifyError);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.0.to_string(),
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Authentication middleware
///
/// Verifies the bearer credential from the `Authorization` header and
/// injects the resolved [`Identity`](super::Identity) into request
/// extensions. Rejected requests never reach the inner handler.
pub async fn require_auth(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let identity = state
        .verifier
        .verify_credential(authorization)
        .await
        .map_err(|e| {
            tracing::warn!(kind = e.kind(), "Credential verification failed: {}", e);
            AuthError(e)
        })?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
