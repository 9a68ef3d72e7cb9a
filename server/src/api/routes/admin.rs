//! Admin membership check

use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::json;

use crate::api::auth::{AuthState, Identity};

/// Report whether the verified user is on the configured admin id list.
pub async fn check(
    State(state): State<AuthState>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    let is_admin = state.is_admin(&identity.id);
    tracing::debug!(user_id = %identity.id, is_admin, "Admin check");
    Json(json!({
        "success": true,
        "isAdmin": is_admin,
    }))
}
