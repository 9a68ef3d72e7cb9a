//! Current-user endpoint

use axum::{Extension, Json};
use axum::response::IntoResponse;
use serde_json::json;

use crate::api::auth::Identity;

/// Return the identity resolved by the auth middleware.
pub async fn me(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "user": identity,
    }))
}
