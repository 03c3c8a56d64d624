//! Error types for the federation core
//!
//! Every fallible operation returns `FederationError`, which implements
//! `IntoResponse` so the transport adapter can turn it into the
//! protocol-appropriate HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Federation-wide error type
#[derive(Debug, Error)]
pub enum FederationError {
    /// Malformed or missing inbound fields (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unresolved discovery query or unconfigured collection (404)
    #[error("Resource not found")]
    NotFound,

    /// Remote target refused before any request was made (403)
    #[error("Access denied")]
    Forbidden,

    /// A provider or value the requested feature depends on is missing (500)
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// The identity provider returned nothing for a profile request (500)
    #[error("Profile unavailable for {0}")]
    ProfileUnavailable(String),

    /// Remote object fetch answered with a non-2xx status (502)
    #[error("Failed to fetch {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },

    /// Remote inbox rejected an outbound activity (502)
    #[error("Inbox {inbox} rejected activity: HTTP {status}")]
    Delivery { inbox: String, status: u16 },

    /// HTTP transport failure (502)
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote or inline JSON could not be decoded into the expected shape (502)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Malformed key material (400)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Key generation, encoding or signing failure (500)
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An inbox handler failed; surfaced as-is to the transport (500)
    #[error("Activity handler failed: {0}")]
    Handler(#[source] anyhow::Error),
}

impl From<config::ConfigError> for FederationError {
    fn from(err: config::ConfigError) -> Self {
        FederationError::Config(err.to_string())
    }
}

impl FederationError {
    /// HTTP status and metric label for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            FederationError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            FederationError::Parse(_) => (StatusCode::BAD_REQUEST, "parse"),
            FederationError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            FederationError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            FederationError::Fetch { .. } => (StatusCode::BAD_GATEWAY, "fetch"),
            FederationError::Delivery { .. } => (StatusCode::BAD_GATEWAY, "delivery"),
            FederationError::Http(_) => (StatusCode::BAD_GATEWAY, "http_client"),
            FederationError::Decode(_) => (StatusCode::BAD_GATEWAY, "decode"),
            FederationError::NotConfigured(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "not_configured")
            }
            FederationError::ProfileUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "profile_unavailable")
            }
            FederationError::Crypto(_) => (StatusCode::INTERNAL_SERVER_ERROR, "crypto"),
            FederationError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
            FederationError::Handler(_) => (StatusCode::INTERNAL_SERVER_ERROR, "handler"),
        }
    }
}

impl IntoResponse for FederationError {
    /// Convert error to HTTP response
    ///
    /// Client errors echo their message; server-side failures answer with a
    /// generic message and keep the detail in the logs.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_type) = self.status();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, kind = error_type, "Request failed");
            match status {
                StatusCode::BAD_GATEWAY => "Upstream federation error".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[error_type])
            .inc();

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using FederationError
pub type Result<T> = std::result::Result<T, FederationError>;
