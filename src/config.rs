//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

use crate::error::FederationError;

/// Placeholder every route pattern must contain
pub const IDENTIFIER_PLACEHOLDER: &str = "{identifier}";

/// Smallest RSA modulus the key manager will generate
pub const MIN_KEY_BITS: usize = 2048;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub federation: FederationConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub keys: KeyConfig,
    #[serde(default)]
    pub http: HttpClientConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration for the bundled host binary
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Externally visible identity of this server
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Public host name (e.g., "social.example.com"); falls back to the
    /// request `Host` header when unset
    pub host: Option<String>,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            host: None,
            protocol: "https".to_string(),
        }
    }
}

impl FederationConfig {
    /// Host used for canonical URIs.
    ///
    /// The configured host always wins over the request host.
    pub fn effective_host<'a>(&'a self, request_host: Option<&'a str>) -> Option<&'a str> {
        self.host
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .or(request_host)
    }

    /// Base URL like "https://social.example.com"
    pub fn base_url(&self, request_host: Option<&str>) -> Option<String> {
        self.effective_host(request_host)
            .map(|host| format!("{}://{}", self.protocol, host))
    }
}

/// Route patterns; each contains `{identifier}`
#[derive(Debug, Clone, Deserialize)]
pub struct RoutesConfig {
    pub profile: String,
    pub inbox: String,
    pub outbox: String,
    pub following: String,
    pub followers: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            profile: "/users/{identifier}".to_string(),
            inbox: "/users/{identifier}/inbox".to_string(),
            outbox: "/users/{identifier}/outbox".to_string(),
            following: "/users/{identifier}/following".to_string(),
            followers: "/users/{identifier}/followers".to_string(),
        }
    }
}

/// Key generation settings
#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    /// RSA modulus size in bits (default: 2048)
    pub bits: usize,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self { bits: MIN_KEY_BITS }
    }
}

/// Outbound HTTP client settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    /// Overall request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Maximum redirects followed per request (default: 5)
    pub max_redirects: usize,
    /// Allow fetching from loopback/private addresses (development only)
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("Fediverse/{}", env!("CARGO_PKG_VERSION")),
            timeout_seconds: 30,
            max_redirects: 5,
            allow_private_hosts: false,
        }
    }
}

impl HttpClientConfig {
    /// Build the shared reqwest client
    pub fn build_client(&self) -> Result<reqwest::Client, FederationError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(Duration::from_secs(self.timeout_seconds))
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects))
            .build()
            .map_err(FederationError::Http)
    }
}

/// Outbound delivery settings
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Maximum concurrent deliveries in a fan-out (default: 10)
    pub max_concurrent: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self { max_concurrent: 10 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (FEDIVERSE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, FederationError> {
        use config::{Config, Environment, File};

        let defaults = RoutesConfig::default();
        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("federation.protocol", "https")?
            .set_default("routes.profile", defaults.profile)?
            .set_default("routes.inbox", defaults.inbox)?
            .set_default("routes.outbox", defaults.outbox)?
            .set_default("routes.following", defaults.following)?
            .set_default("routes.followers", defaults.followers)?
            .set_default("keys.bits", MIN_KEY_BITS as i64)?
            .set_default("http.user_agent", HttpClientConfig::default().user_agent)?
            .set_default("http.timeout_seconds", 30)?
            .set_default("http.max_redirects", 5)?
            .set_default("http.allow_private_hosts", false)?
            .set_default("delivery.max_concurrent", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("FEDIVERSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), FederationError> {
        let protocol = self.federation.protocol.as_str();
        if protocol != "http" && protocol != "https" {
            return Err(FederationError::Config(format!(
                "federation.protocol must be http or https, got {}",
                protocol
            )));
        }

        if let Some(host) = self.federation.host.as_deref() {
            let host = host.trim();
            if host.is_empty() || host.contains("://") || host.contains('/') {
                return Err(FederationError::Config(
                    "federation.host must be a bare host name (optionally with port)".to_string(),
                ));
            }
            if protocol == "http" && !is_local_host(host) {
                return Err(FederationError::Config(
                    "federation.protocol must be https for non-local hosts".to_string(),
                ));
            }
        }

        for (name, pattern) in [
            ("routes.profile", &self.routes.profile),
            ("routes.inbox", &self.routes.inbox),
            ("routes.outbox", &self.routes.outbox),
            ("routes.following", &self.routes.following),
            ("routes.followers", &self.routes.followers),
        ] {
            if !pattern.starts_with('/') || !pattern.contains(IDENTIFIER_PLACEHOLDER) {
                return Err(FederationError::Config(format!(
                    "{} must start with '/' and contain {}",
                    name, IDENTIFIER_PLACEHOLDER
                )));
            }
        }

        if self.keys.bits < MIN_KEY_BITS {
            return Err(FederationError::Config(format!(
                "keys.bits must be at least {}",
                MIN_KEY_BITS
            )));
        }

        if self.delivery.max_concurrent == 0 {
            return Err(FederationError::Config(
                "delivery.max_concurrent must be greater than 0".to_string(),
            ));
        }

        if self.http.allow_private_hosts {
            tracing::warn!("Remote fetches to private and loopback addresses are allowed");
        }

        Ok(())
    }
}

fn normalized_host(host: &str) -> String {
    let trimmed = host.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

/// Whether `host` is a bare `host[:port]` authority, as a `Host` header
/// must be before it is used in canonical URIs.
pub fn is_bare_host(host: &str) -> bool {
    if host.is_empty()
        || host
            .chars()
            .any(|c| matches!(c, '@' | '/' | '\\' | '?' | '#') || c.is_whitespace() || c.is_control())
    {
        return false;
    }

    url::Url::parse(&format!("http://{host}"))
        .map(|url| url.host_str().is_some_and(|parsed| !parsed.is_empty()) && url.path() == "/")
        .unwrap_or(false)
}

fn is_local_host(host: &str) -> bool {
    let host = normalized_host(host);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.federation.host = Some("social.example.com".to_string());
        config
    }

    #[test]
    fn defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn configured_host_takes_precedence_over_request_host() {
        let config = valid_config();
        assert_eq!(
            config.federation.base_url(Some("other.example")).as_deref(),
            Some("https://social.example.com")
        );

        let unset = FederationConfig::default();
        assert_eq!(
            unset.base_url(Some("other.example")).as_deref(),
            Some("https://other.example")
        );
        assert_eq!(unset.base_url(None), None);
    }

    #[test]
    fn validate_rejects_weak_key_size() {
        let mut config = valid_config();
        config.keys.bits = 1024;

        let error = config.validate().expect_err("1024-bit keys must be rejected");
        assert!(matches!(
            error,
            FederationError::Config(message) if message.contains("keys.bits")
        ));
    }

    #[test]
    fn validate_rejects_route_without_identifier() {
        let mut config = valid_config();
        config.routes.outbox = "/outbox".to_string();

        let error = config
            .validate()
            .expect_err("routes need an identifier placeholder");
        assert!(matches!(
            error,
            FederationError::Config(message) if message.contains("routes.outbox")
        ));
    }

    #[test]
    fn validate_rejects_http_for_non_local_host() {
        let mut config = valid_config();
        config.federation.protocol = "http".to_string();

        let error = config
            .validate()
            .expect_err("public hosts must require https");
        assert!(matches!(
            error,
            FederationError::Config(message)
                if message.contains("federation.protocol must be https")
        ));
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let mut config = valid_config();
        config.federation.host = Some("localhost:8080".to_string());
        config.federation.protocol = "http".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bare_host_accepts_names_ports_and_ip_literals() {
        assert!(is_bare_host("social.example.com"));
        assert!(is_bare_host("localhost:8080"));
        assert!(is_bare_host("127.0.0.1:3000"));
        assert!(is_bare_host("[::1]:8443"));
    }

    #[test]
    fn bare_host_rejects_userinfo_paths_and_garbage() {
        for host in ["", "a@b", "x/y", "evil.example?x=1", "evil.example#frag", "a b", "a\\b", "host:port"] {
            assert!(!is_bare_host(host), "{host:?} should be rejected");
        }
    }

    #[test]
    fn validate_rejects_host_with_scheme() {
        let mut config = valid_config();
        config.federation.host = Some("https://social.example.com".to_string());
        assert!(config.validate().is_err());
    }
}
