//! WebFinger discovery
//!
//! Maps `acct:user@host` queries to the profile URI of a local actor.

use serde::{Deserialize, Serialize};

use super::Context;
use crate::error::{FederationError, Result};
use crate::vocab::ACTIVITY_JSON;

/// WebFinger JRD response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebFingerResponse {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub links: Vec<WebFingerLink>,
}

/// WebFinger link
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebFingerLink {
    pub rel: String,
    #[serde(rename = "type")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl WebFingerResponse {
    /// The `self` link pointing at the ActivityPub profile
    pub fn self_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == "self")
            .and_then(|link| link.href.as_deref())
    }
}

/// Local part of a discovery resource: `acct:alice@host` → `alice`
pub fn local_part(resource: &str) -> &str {
    let resource = resource.trim();
    let account = resource.strip_prefix("acct:").unwrap_or(resource);
    account.split('@').next().unwrap_or_default()
}

/// Resolve a WebFinger query.
///
/// # Errors
/// - `BadRequest` if `resource` is empty
/// - `NotFound` if no identity answers to the local part
pub fn resolve_discovery_query(ctx: &Context, resource: &str) -> Result<WebFingerResponse> {
    if resource.trim().is_empty() {
        return Err(FederationError::BadRequest(
            "resource parameter is required".to_string(),
        ));
    }

    let identifier = local_part(resource);
    if identifier.is_empty() {
        return Err(FederationError::NotFound);
    }

    let Some(provider) = ctx.federation().identity_provider() else {
        tracing::debug!(resource, "No identity provider registered");
        return Err(FederationError::NotFound);
    };

    if provider(ctx, identifier).is_none() {
        tracing::debug!(resource, identifier, "WebFinger query did not match an identity");
        return Err(FederationError::NotFound);
    }

    let host = ctx
        .host()
        .ok_or_else(|| FederationError::NotConfigured("federation.host".to_string()))?;
    let profile_uri = ctx.actor_uri(identifier)?;

    Ok(WebFingerResponse {
        subject: format!("{}@{}", identifier, host),
        aliases: vec![profile_uri.clone()],
        links: vec![WebFingerLink {
            rel: "self".to_string(),
            link_type: Some(ACTIVITY_JSON.to_string()),
            href: Some(profile_uri),
            template: None,
        }],
    })
}
