//! Axum-based HTTP gateway.
//!
//! Every route except `GET /health` sits behind [`guard_middleware`]. The
//! router is public so the guard can be mounted in front of other services.

mod handlers;
mod middleware;

pub use handlers::{handle_admitted, handle_health};
pub use middleware::{guard_middleware, RequestId};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::audit::AuditLogger;
use crate::auth::RequestGuard;
use crate::error::GuardError;

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<RequestGuard>,
    pub audit_logger: Option<Arc<AuditLogger>>,
    pub max_body_size: usize,
}

impl AppState {
    pub fn new(
        guard: Arc<RequestGuard>,
        audit_logger: Option<Arc<AuditLogger>>,
        max_body_size: usize,
    ) -> Self {
        Self {
            guard,
            audit_logger,
            max_body_size,
        }
    }
}

/// Build the gateway router.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let guarded = Router::new()
        .fallback(handle_admitted)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            guard_middleware,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(handle_health))
        .fallback_service(guarded)
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
}

/// Bind a TCP listener on `bind` (e.g. "127.0.0.1:8080").
pub async fn bind(bind: &str) -> Result<TcpListener, GuardError> {
    let addr: SocketAddr = bind.parse().map_err(|e| GuardError::Server {
        message: format!("Invalid bind address '{}': {}", bind, e),
    })?;
    Ok(TcpListener::bind(addr).await?)
}

/// Serve the gateway until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    request_timeout: Duration,
    shutdown: F,
) -> Result<(), GuardError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(addr = %addr, "Gateway listening");

    let app = build_router(state, request_timeout);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    Ok(())
}
