//! Request handlers.
//!
//! `dispatch` is the router fallback: every path other than the
//! introspection route lands here and is answered from the live table.
//! Lookup uses the percent-decoded path; undecodable paths match verbatim.

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::http::request::request_id;
use crate::observability::metrics;
use crate::routing::{LiveTable, TableSummary};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub live: LiveTable,
}

/// Answer from the current routing table.
pub async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let table = state.live.snapshot();
    let method = request.method();
    let raw_path = request.uri().path();
    let path = urlencoding::decode(raw_path).unwrap_or(Cow::Borrowed(raw_path));
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    let response = match table.get(&path) {
        Some(endpoint) => endpoint.respond(method),
        None => StatusCode::NOT_FOUND.into_response(),
    };

    tracing::debug!(
        request_id = %request_id(&request),
        method = %method,
        path = %path,
        peer = %peer,
        status = response.status().as_u16(),
        generation = table.generation(),
        "Request served"
    );
    metrics::record_request(response.status().as_u16());

    response
}

/// List every loaded path with its methods.
pub async fn info(State(state): State<AppState>) -> Json<TableSummary> {
    Json(state.live.snapshot().summary())
}
