//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the introspection route and dispatch fallback
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind plain or TLS listener
//! - Drain in-flight requests on shutdown

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::routing::get;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::sync::broadcast;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::http::handlers::{dispatch, info, AppState};
use crate::http::request::{request_id, UuidRequestId};
use crate::routing::{LiveTable, INFO_PATH};

/// In-flight requests get this long after shutdown starts.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// HTTP server for configured responses.
pub struct HttpServer {
    router: Router,
    address: SocketAddr,
    tls: Option<RustlsConfig>,
    handle: Handle,
    grace_period: Duration,
}

impl HttpServer {
    /// Create a server answering from `live`.
    pub fn new(live: LiveTable, address: SocketAddr, request_timeout: Duration) -> Self {
        let router = Self::build_router(AppState { live }, request_timeout);
        Self {
            router,
            address,
            tls: None,
            handle: Handle::new(),
            grace_period: SHUTDOWN_GRACE_PERIOD,
        }
    }

    /// Serve over TLS instead of plain TCP.
    pub fn with_tls(mut self, tls: RustlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Handle for observing the bound address or stopping the server.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route(INFO_PATH, get(info))
            .fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::debug_span!(
                    "request",
                    request_id = %request_id(request),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Serve until `shutdown` fires, then drain for the grace period.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let handle = self.handle.clone();
        let grace_period = self.grace_period;
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!(grace_period = ?grace_period, "HTTP server draining");
            handle.graceful_shutdown(Some(grace_period));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        match self.tls {
            Some(tls) => {
                tracing::info!(address = %self.address, tls = true, "HTTP server starting");
                axum_server::bind_rustls(self.address, tls)
                    .handle(self.handle)
                    .serve(app)
                    .await?;
            }
            None => {
                tracing::info!(address = %self.address, tls = false, "HTTP server starting");
                axum_server::bind(self.address)
                    .handle(self.handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
