//! HTTP middleware (CORS, 404 handler)

use axum::extract::Request;
use axum::http::{Method, StatusCode, header};
use axum::response::IntoResponse;
use tower_http::cors::{Any, CorsLayer};

/// Create CORS layer.
///
/// The SPA is served from a separate origin, so the API stays permissive;
/// authentication rides in the Authorization header, not cookies.
pub fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Handle 404 Not Found with logging
pub async fn handle_404(req: Request) -> impl IntoResponse {
    tracing::debug!("[404] {} {}", req.method(), req.uri());
    StatusCode::NOT_FOUND
}
