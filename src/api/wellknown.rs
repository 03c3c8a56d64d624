//! Well-known endpoints
//!
//! - /.well-known/webfinger

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::Deserialize;

use super::request_context;
use crate::error::FederationError;
use crate::federation::{Federation, resolve_discovery_query};
use crate::routes::WEBFINGER_PATH;

/// Create well-known router
///
/// Routes:
/// - GET /.well-known/webfinger
pub fn wellknown_router() -> Router<Arc<Federation>> {
    Router::new().route(WEBFINGER_PATH, get(webfinger))
}

/// WebFinger query parameters
#[derive(Debug, Deserialize)]
struct WebFingerQuery {
    #[serde(default)]
    resource: String,
}

/// GET /.well-known/webfinger
///
/// Query: ?resource=acct:user@domain
async fn webfinger(
    State(federation): State<Arc<Federation>>,
    headers: HeaderMap,
    Query(query): Query<WebFingerQuery>,
) -> Result<Response, FederationError> {
    let ctx = request_context(&federation, &headers);
    let response = resolve_discovery_query(&ctx, &query.resource)?;

    Ok((
        [(header::CONTENT_TYPE, "application/jrd+json")],
        Json(response),
    )
        .into_response())
}
