//! Actor profile projection

use serde_json::{Map, Value, json};

use super::Context;
use crate::error::{FederationError, Result};
use crate::keys::KeyManager;
use crate::vocab::{ACTIVITY_STREAMS_CONTEXT, Actor, ObjectRef, SECURITY_CONTEXT};

/// Build the profile document for a local actor.
///
/// The document is projected fresh from the host identity on every call.
/// `publicKey` is attached when the host supplies a key pair.
///
/// # Errors
/// - `NotConfigured` if no identity provider is registered
/// - `ProfileUnavailable` if the provider has no identity for `identifier`
pub fn build_profile(ctx: &Context, identifier: &str) -> Result<Actor> {
    let provider = ctx
        .federation()
        .identity_provider()
        .ok_or_else(|| FederationError::NotConfigured("actor dispatcher".to_string()))?;

    let identity = provider(ctx, identifier)
        .ok_or_else(|| FederationError::ProfileUnavailable(identifier.to_string()))?;

    let actor_uri = ctx.actor_uri(identifier)?;

    let public_key = ctx
        .key_pair(identifier)
        .map(|key_pair| KeyManager::export_public_descriptor(&actor_uri, &key_pair))
        .transpose()?;

    let icon = identity.icon.map(|url| {
        let mut image = Map::new();
        image.insert("type".to_string(), json!("Image"));
        image.insert("url".to_string(), Value::String(url));
        ObjectRef::Object(image)
    });

    Ok(Actor {
        context: Some(json!([ACTIVITY_STREAMS_CONTEXT, SECURITY_CONTEXT])),
        id: actor_uri,
        kind: "Person".to_string(),
        preferred_username: Some(identity.preferred_username),
        name: identity.name,
        summary: identity.summary,
        url: identity.url,
        icon,
        published: identity.published.map(|published| published.to_rfc3339()),
        inbox: Some(ObjectRef::link(ctx.inbox_uri(identifier)?)),
        outbox: Some(ObjectRef::link(ctx.outbox_uri(identifier)?)),
        following: Some(ObjectRef::link(ctx.following_uri(identifier)?)),
        followers: Some(ObjectRef::link(ctx.followers_uri(identifier)?)),
        endpoints: None,
        public_key,
        extra: Map::new(),
    })
}
