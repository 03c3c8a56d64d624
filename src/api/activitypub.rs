//! ActivityPub endpoints
//!
//! - Actor profile
//! - Inbox (activity receiving)
//! - Outbox
//! - Followers/Following collections

use std::sync::Arc;

use axum::body::Bytes;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{MethodRouter, get, post},
};
use serde::Deserialize;

use super::{activity_json, request_context};
use crate::config::AppConfig;
use crate::error::FederationError;
use crate::federation::{CollectionKind, Federation, build_profile, dispatch, get_collection};
use crate::routes::axum_path;

/// Create ActivityPub router
///
/// Routes (paths come from `routes.*`):
/// - GET profile - Actor profile
/// - POST inbox - Personal inbox
/// - GET outbox - Outbox
/// - GET followers - Followers collection
/// - GET following - Following collection
pub fn activitypub_router(config: &AppConfig) -> Router<Arc<Federation>> {
    let routes = &config.routes;
    let mut paths = Vec::new();

    add_route(&mut paths, &routes.profile, get(profile));
    add_route(&mut paths, &routes.inbox, post(inbox));
    add_route(&mut paths, &routes.outbox, get(outbox));
    add_route(&mut paths, &routes.followers, get(followers));
    add_route(&mut paths, &routes.following, get(following));

    paths
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(&path, method_router)
        })
}

/// Register a handler, merging methods when two patterns share a path
fn add_route(
    paths: &mut Vec<(String, MethodRouter<Arc<Federation>>)>,
    pattern: &str,
    method_router: MethodRouter<Arc<Federation>>,
) {
    let path = axum_path(pattern);
    let method_router = match paths.iter().position(|(existing, _)| *existing == path) {
        Some(index) => paths.remove(index).1.merge(method_router),
        None => method_router,
    };
    paths.push((path, method_router));
}

/// GET profile
///
/// Content-Type: application/activity+json
async fn profile(
    State(federation): State<Arc<Federation>>,
    Path(identifier): Path<String>,
    headers: HeaderMap,
) -> Result<Response, FederationError> {
    let ctx = request_context(&federation, &headers);
    let actor = build_profile(&ctx, &identifier)?;
    Ok(activity_json(actor))
}

/// POST inbox
///
/// Dispatches the activity to the registered handlers and answers
/// 202 Accepted.
async fn inbox(
    State(federation): State<Arc<Federation>>,
    Path(identifier): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, FederationError> {
    let ctx = request_context(&federation, &headers);
    let report = dispatch(&ctx, &body)?;

    tracing::debug!(
        identifier = %identifier,
        handled = report.handled.len(),
        "Inbox request accepted"
    );

    Ok(StatusCode::ACCEPTED)
}

/// Collection query parameters
#[derive(Debug, Deserialize)]
struct CursorQuery {
    cursor: Option<String>,
}

async fn collection(
    federation: Arc<Federation>,
    kind: CollectionKind,
    identifier: String,
    query: CursorQuery,
    headers: HeaderMap,
) -> Result<Response, FederationError> {
    let ctx = request_context(&federation, &headers);
    let collection = get_collection(&ctx, kind, &identifier, query.cursor.as_deref())?;
    Ok(activity_json(collection))
}

/// GET outbox
async fn outbox(
    State(federation): State<Arc<Federation>>,
    Path(identifier): Path<String>,
    Query(query): Query<CursorQuery>,
    headers: HeaderMap,
) -> Result<Response, FederationError> {
    collection(federation, CollectionKind::Outbox, identifier, query, headers).await
}

/// GET followers
async fn followers(
    State(federation): State<Arc<Federation>>,
    Path(identifier): Path<String>,
    Query(query): Query<CursorQuery>,
    headers: HeaderMap,
) -> Result<Response, FederationError> {
    collection(federation, CollectionKind::Followers, identifier, query, headers).await
}

/// GET following
async fn following(
    State(federation): State<Arc<Federation>>,
    Path(identifier): Path<String>,
    Query(query): Query<CursorQuery>,
    headers: HeaderMap,
) -> Result<Response, FederationError> {
    collection(federation, CollectionKind::Following, identifier, query, headers).await
}
