//! HTTP Signatures for outbound requests
//!
//! Signs requests per the draft-cavage profile used across the fediverse:
//! https://docs.joinmastodon.org/spec/security/
//!
//! Inbound verification is left to the host.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use sha2::{Digest, Sha256};

use crate::error::{FederationError, Result};
use crate::keys::KeyPair;

/// Headers to add for signed request
#[derive(Debug, Clone)]
pub struct SignatureHeaders {
    /// Signature header value
    pub signature: String,
    /// Date header value (RFC 2616)
    pub date: String,
    /// Digest header value (if body present)
    pub digest: Option<String>,
}

/// Sign an HTTP request
///
/// # Arguments
/// * `method` - HTTP method (e.g., "POST")
/// * `url` - Full URL being requested
/// * `body` - Request body (for digest)
/// * `key_pair` - Sender key pair; must hold a private key
/// * `key_id` - Full URL to the public key (actor#main-key)
///
/// # Returns
/// Signature, Date and Digest (if body present) header values
pub fn sign_request(
    method: &str,
    url: &str,
    body: Option<&[u8]>,
    key_pair: &KeyPair,
    key_id: &str,
) -> Result<SignatureHeaders> {
    let parsed_url = url::Url::parse(url)
        .map_err(|e| FederationError::BadRequest(format!("Invalid URL: {}", e)))?;

    let host = host_header_value(&parsed_url)?;

    let path_and_query = match parsed_url.query() {
        Some(query) => format!("{}?{}", parsed_url.path(), query),
        None => parsed_url.path().to_string(),
    };

    let date = chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();

    let digest = body.map(generate_digest);

    let mut signing_parts = vec![
        format!(
            "(request-target): {} {}",
            method.to_lowercase(),
            path_and_query
        ),
        format!("host: {}", host),
        format!("date: {}", date),
    ];
    let mut headers_list = vec!["(request-target)", "host", "date"];

    if let Some(ref digest_value) = digest {
        signing_parts.push(format!("digest: {}", digest_value));
        headers_list.push("digest");
    }

    let signing_string = signing_parts.join("\n");
    let signature_b64 = BASE64.encode(key_pair.sign(signing_string.as_bytes())?);

    let signature_header = format!(
        "keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{}\",signature=\"{}\"",
        key_id,
        headers_list.join(" "),
        signature_b64
    );

    Ok(SignatureHeaders {
        signature: signature_header,
        date,
        digest,
    })
}

/// `Host` header value for a URL; includes the port when it is not the
/// scheme default, matching what reqwest sends.
pub fn host_header_value(url: &url::Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| FederationError::BadRequest("Missing host in URL".to_string()))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Parsed Signature header
#[derive(Debug, Clone)]
pub struct ParsedSignature {
    /// Key ID (URL to public key)
    pub key_id: String,
    /// Algorithm (usually rsa-sha256)
    pub algorithm: String,
    /// Signed header names
    pub headers: Vec<String>,
    /// Base64-encoded signature
    pub signature: String,
}

/// Parse Signature header value
///
/// # Format
/// ```text
/// keyId="...",algorithm="...",headers="...",signature="..."
/// ```
pub fn parse_signature_header(header: &str) -> Result<ParsedSignature> {
    let mut key_id = None;
    let mut algorithm = None;
    let mut headers = None;
    let mut signature = None;

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');

        match key.trim() {
            "keyId" => key_id = Some(value.to_string()),
            "algorithm" => algorithm = Some(value.to_string()),
            "headers" => {
                headers = Some(
                    value
                        .split_whitespace()
                        .map(|s| s.to_ascii_lowercase())
                        .collect(),
                )
            }
            "signature" => signature = Some(value.to_string()),
            _ => {}
        }
    }

    let missing = |name: &str| FederationError::BadRequest(format!("Missing {}", name));

    Ok(ParsedSignature {
        key_id: key_id.ok_or_else(|| missing("keyId"))?,
        algorithm: algorithm.ok_or_else(|| missing("algorithm"))?,
        headers: headers.ok_or_else(|| missing("headers"))?,
        signature: signature.ok_or_else(|| missing("signature"))?,
    })
}

/// Generate SHA-256 digest for body
///
/// # Returns
/// `SHA-256=base64(hash)`
pub fn generate_digest(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    let hash = hasher.finalize();
    format!("SHA-256={}", BASE64.encode(hash))
}
