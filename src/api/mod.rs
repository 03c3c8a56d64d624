//! HTTP layer
//!
//! Mounts the federation core on axum:
//! - WebFinger (`/.well-known/webfinger`)
//! - Actor profile, inbox and collections on the configured route patterns
//! - `/metrics`, mounted separately by the host

mod activitypub;
mod metrics;
mod wellknown;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::federation::{Context, Federation};
use crate::vocab::ACTIVITY_JSON;

pub use activitypub::activitypub_router;
pub use metrics::metrics_router;
pub use wellknown::wellknown_router;

/// Full federation router with request tracing
pub fn router(federation: Arc<Federation>) -> Router {
    Router::new()
        .merge(wellknown_router())
        .merge(activitypub_router(federation.config()))
        .layer(TraceLayer::new_for_http())
        .with_state(federation)
}

/// Context for a request, using its `Host` header
fn request_context(federation: &Arc<Federation>, headers: &HeaderMap) -> Context {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());
    federation.context(host)
}

/// JSON body served as `application/activity+json`
fn activity_json<T: Serialize>(value: T) -> Response {
    ([(header::CONTENT_TYPE, ACTIVITY_JSON)], axum::Json(value)).into_response()
}
