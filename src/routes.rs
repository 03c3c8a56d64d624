//! Named routes and absolute link construction
//!
//! Route patterns come from `RoutesConfig` and contain `{identifier}`.
//! Links are built from the effective base URL, the pattern with the
//! identifier percent-encoded, and an optional `cursor` query parameter.

use std::fmt;

use crate::config::{IDENTIFIER_PLACEHOLDER, RoutesConfig};
use crate::error::{FederationError, Result};

/// Fixed discovery path
pub const WEBFINGER_PATH: &str = "/.well-known/webfinger";

/// Routes the core knows how to link to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    Profile,
    Inbox,
    Outbox,
    Following,
    Followers,
    Webfinger,
}

impl RouteName {
    /// Path pattern for this route
    pub fn pattern(self, routes: &RoutesConfig) -> &str {
        match self {
            RouteName::Profile => &routes.profile,
            RouteName::Inbox => &routes.inbox,
            RouteName::Outbox => &routes.outbox,
            RouteName::Following => &routes.following,
            RouteName::Followers => &routes.followers,
            RouteName::Webfinger => WEBFINGER_PATH,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteName::Profile => "profile",
            RouteName::Inbox => "inbox",
            RouteName::Outbox => "outbox",
            RouteName::Following => "following",
            RouteName::Followers => "followers",
            RouteName::Webfinger => "webfinger",
        }
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build an absolute URI for `pattern`.
///
/// # Arguments
/// * `base_url` - Scheme and host, e.g. "https://social.example.com"
/// * `pattern` - Route pattern containing `{identifier}`
/// * `identifier` - Local actor identifier; percent-encoded
/// * `cursor` - Optional opaque cursor, appended as `?cursor=`
pub fn build_link(
    base_url: &str,
    pattern: &str,
    identifier: &str,
    cursor: Option<&str>,
) -> Result<String> {
    let path = pattern.replace(IDENTIFIER_PLACEHOLDER, &urlencoding::encode(identifier));
    let mut url = url::Url::parse(&format!("{}{}", base_url.trim_end_matches('/'), path))
        .map_err(|e| FederationError::Config(format!("Invalid link for {}: {}", pattern, e)))?;

    if let Some(cursor) = cursor {
        url.query_pairs_mut().append_pair("cursor", cursor);
    }

    Ok(url.into())
}

/// Convert a route pattern to axum's path syntax (`:identifier`)
pub fn axum_path(pattern: &str) -> String {
    pattern.replace(IDENTIFIER_PLACEHOLDER, ":identifier")
}
