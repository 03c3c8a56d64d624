//! Remote object resolution
//!
//! Turns an `ObjectRef` into a typed value. Inline objects are decoded in
//! place; links are fetched with `Accept: application/activity+json`.
//! Nothing fetched here is cached.

use std::net::IpAddr;

use serde::de::DeserializeOwned;

use super::Context;
use crate::error::{FederationError, Result};
use crate::metrics::REMOTE_FETCHES_TOTAL;
use crate::vocab::{ACTIVITY_JSON, ObjectRef};

fn is_disallowed_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_multicast()
                || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unique_local()
                || v6.is_unicast_link_local()
                || v6.is_multicast()
                || v6.is_unspecified()
        }
    }
}

fn is_disallowed_host(host: &str) -> bool {
    let normalized = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();
    if normalized == "localhost" || normalized.ends_with(".localhost") {
        return true;
    }

    normalized
        .parse::<IpAddr>()
        .map(is_disallowed_ip)
        .unwrap_or(false)
}

async fn validate_resolved_host_ips(host: &str, port: u16) -> Result<()> {
    let normalized = host.trim_end_matches('.').to_ascii_lowercase();

    let mut resolved_any = false;
    let lookup = tokio::net::lookup_host((normalized.as_str(), port))
        .await
        .map_err(|e| FederationError::BadRequest(format!("Failed to resolve {}: {}", host, e)))?;

    for addr in lookup {
        resolved_any = true;
        if is_disallowed_ip(addr.ip()) {
            return Err(FederationError::Forbidden);
        }
    }

    if !resolved_any {
        return Err(FederationError::BadRequest(format!(
            "No DNS records for {}",
            host
        )));
    }

    Ok(())
}

/// Validate a remote URL before any request is made.
///
/// Rejects non-HTTP(S) URLs and obvious local/private hosts.
pub fn check_remote_url(raw: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| FederationError::BadRequest(format!("Invalid remote URL {}: {}", raw, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FederationError::BadRequest(format!(
                "Unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| FederationError::BadRequest(format!("Missing host in {}", raw)))?;

    if is_disallowed_host(host) {
        return Err(FederationError::Forbidden);
    }

    Ok(parsed)
}

/// Resolves object references over HTTP
#[derive(Debug, Clone)]
pub struct RemoteObjectResolver {
    http_client: reqwest::Client,
    allow_private_hosts: bool,
}

impl RemoteObjectResolver {
    pub fn new(http_client: reqwest::Client, allow_private_hosts: bool) -> Self {
        Self {
            http_client,
            allow_private_hosts,
        }
    }

    pub fn from_context(ctx: &Context) -> Self {
        let federation = ctx.federation();
        Self::new(
            federation.http_client().clone(),
            federation.config().http.allow_private_hosts,
        )
    }

    /// Resolve a reference into `T`.
    ///
    /// Returns `Ok(None)` when the remote answered with an empty body.
    ///
    /// # Errors
    /// - `Decode` if the inline or fetched JSON does not fit `T`
    /// - `Fetch` on a non-2xx response
    /// - `Forbidden` if the link points at a local or private address
    pub async fn resolve<T: DeserializeOwned>(&self, reference: &ObjectRef) -> Result<Option<T>> {
        match reference {
            ObjectRef::Object(fields) if reference.href().is_none() => {
                let value = serde_json::Value::Object(fields.clone());
                serde_json::from_value(value)
                    .map(Some)
                    .map_err(|e| FederationError::Decode(format!("Inline object: {}", e)))
            }
            _ => {
                let href = reference.href().ok_or_else(|| {
                    FederationError::BadRequest("Link without href".to_string())
                })?;
                self.fetch(href).await
            }
        }
    }

    /// GET a remote document and decode it into `T`
    pub async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        if !self.allow_private_hosts {
            let parsed = check_remote_url(url)?;
            let host = parsed
                .host_str()
                .ok_or_else(|| FederationError::BadRequest(format!("Missing host in {}", url)))?;
            let port = parsed.port_or_known_default().ok_or_else(|| {
                FederationError::BadRequest(format!("Missing port in {}", url))
            })?;
            validate_resolved_host_ips(host, port).await?;
        }

        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::ACCEPT, ACTIVITY_JSON)
            .send()
            .await
            .inspect_err(|_| REMOTE_FETCHES_TOTAL.with_label_values(&["error"]).inc())?;

        let status = response.status();
        if !status.is_success() {
            REMOTE_FETCHES_TOTAL.with_label_values(&["rejected"]).inc();
            tracing::warn!(url = %url, status = status.as_u16(), "Remote fetch failed");
            return Err(FederationError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            REMOTE_FETCHES_TOTAL.with_label_values(&["empty"]).inc();
            tracing::debug!(url = %url, "Remote fetch returned an empty body");
            return Ok(None);
        }

        let value = serde_json::from_slice(&body).map_err(|e| {
            REMOTE_FETCHES_TOTAL.with_label_values(&["undecodable"]).inc();
            FederationError::Decode(format!("{}: {}", url, e))
        })?;

        REMOTE_FETCHES_TOTAL.with_label_values(&["success"]).inc();
        tracing::debug!(url = %url, "Fetched remote object");
        Ok(Some(value))
    }
}
