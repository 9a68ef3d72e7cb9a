//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::auth::{AuthState, require_auth};
use super::middleware;
use super::routes::{admin, auth, health};
use crate::core::CoreApp;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    pub async fn start(self) -> Result<()> {
        let Self { app } = self;

        let host = app.config.server.host.clone();
        let port = app.config.server.port;
        let addr = SocketAddr::new(host.parse()?, port);

        let auth_state = AuthState {
            verifier: app.verifier.clone(),
            admin_user_ids: Arc::new(app.config.admin.user_ids.clone()),
        };

        let protected = Router::new()
            .route("/auth/me", get(auth::me))
            .route("/admin/check", get(admin::check))
            .layer(axum::middleware::from_fn_with_state(
                auth_state.clone(),
                require_auth,
            ))
            .with_state(auth_state);

        let router = Router::new()
            .route("/api/health", get(health::health))
            .nest("/api", protected)
            .fallback(middleware::handle_404)
            .layer(middleware::cors())
            .layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on http://{}", addr);

        axum::serve(listener, router).await?;
        Ok(())
    }
}
