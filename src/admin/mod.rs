//! Operator API: health, breaker inspection and breaker reset.
//!
//! `GET /health` is open so load balancers can poll it; everything under
//! `/admin` requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::bridge::Bridge;
use self::auth::admin_auth_middleware;
use self::handlers::{get_circuit, get_health, reset_circuit};

/// Shared state of the admin router.
#[derive(Clone)]
pub struct AdminState {
    pub bridge: Bridge,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(bridge: Bridge, api_key: &str) -> Self {
        Self {
            bridge,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    let admin = Router::new()
        .route("/admin/circuit", get(get_circuit))
        .route("/admin/circuit/reset", post(reset_circuit))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .route("/health", get(get_health))
        .merge(admin)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the admin API until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
