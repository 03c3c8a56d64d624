//! ActivityPub federation module
//!
//! Handles:
//! - Actor profiles and WebFinger discovery
//! - Inbox dispatch to host handlers
//! - Paged collections (following, followers, outbox)
//! - Remote object resolution
//! - Signed activity delivery
//!
//! A `Federation` is built once at startup, shared through `Arc`, and never
//! mutated afterwards. Every host callback receives a `Context` describing
//! the request it runs for.

mod actor;
mod collection;
mod delivery;
mod inbox;
mod resolver;
pub mod signature;
mod webfinger;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::config::{AppConfig, is_bare_host};
use crate::error::{FederationError, Result};
use crate::keys::KeyPair;
use crate::routes::{self, RouteName};
use crate::vocab::{Activity, ActivityType, ObjectRef};

pub use actor::build_profile;
pub use collection::{CollectionDispatcher, CollectionKind, CollectionSlice, get_collection};
pub use delivery::{
    DeliveryOutcome, DeliveryResult, deliver_to_inbox, deliver_to_inboxes, send_activity,
};
pub use inbox::{DispatchReport, dispatch, dispatch_value, type_discriminators};
pub use resolver::{RemoteObjectResolver, check_remote_url};
pub use signature::{SignatureHeaders, generate_digest, sign_request};
pub use webfinger::{WebFingerLink, WebFingerResponse, resolve_discovery_query};

/// Host-side description of a local actor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub preferred_username: String,
    pub name: Option<String>,
    pub summary: Option<String>,
    /// Human-facing profile page
    pub url: Option<String>,
    pub icon: Option<String>,
    /// When the actor joined
    pub published: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(preferred_username: impl Into<String>) -> Self {
        Self {
            preferred_username: preferred_username.into(),
            ..Self::default()
        }
    }
}

/// Looks up the identity behind a local identifier
pub type IdentityProvider = Arc<dyn Fn(&Context, &str) -> Option<Identity> + Send + Sync>;

/// Supplies the key pair of a local actor
pub type KeyPairProvider = Arc<dyn Fn(&Context, &str) -> Option<KeyPair> + Send + Sync>;

/// Fetches one page of a collection; `None` means "no page available"
pub type PageProvider =
    Arc<dyn Fn(&Context, &str, Option<&str>) -> Option<CollectionSlice> + Send + Sync>;

/// Supplies the first or last cursor of a collection
pub type CursorProvider = Arc<dyn Fn(&Context, &str) -> String + Send + Sync>;

/// Handles one inbound activity type
pub type ActivityHandler = Arc<dyn Fn(&Context, &Activity) -> anyhow::Result<()> + Send + Sync>;

/// Federation registries and shared resources
pub struct Federation {
    config: AppConfig,
    http_client: reqwest::Client,
    identity_provider: Option<IdentityProvider>,
    key_pair_provider: Option<KeyPairProvider>,
    handlers: HashMap<ActivityType, ActivityHandler>,
    collections: HashMap<CollectionKind, CollectionDispatcher>,
}

impl fmt::Debug for Federation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<_> = self.handlers.keys().map(|kind| kind.as_str()).collect();
        handlers.sort_unstable();
        let mut collections: Vec<_> = self.collections.keys().map(|kind| kind.as_str()).collect();
        collections.sort_unstable();

        f.debug_struct("Federation")
            .field("host", &self.config.federation.host)
            .field("identity_provider", &self.identity_provider.is_some())
            .field("key_pair_provider", &self.key_pair_provider.is_some())
            .field("handlers", &handlers)
            .field("collections", &collections)
            .finish()
    }
}

impl Federation {
    pub fn builder(config: AppConfig) -> FederationBuilder {
        FederationBuilder::new(config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Context for a request that arrived with the given `Host` header
    ///
    /// A header value that is not a bare `host[:port]` is ignored, so it can
    /// never end up in a canonical URI.
    pub fn context(self: &Arc<Self>, request_host: Option<&str>) -> Context {
        let request_host = request_host.map(str::trim).filter(|host| !host.is_empty());
        let request_host = match request_host {
            Some(host) if is_bare_host(host) => Some(host.to_string()),
            Some(host) => {
                tracing::warn!(host, "Ignoring malformed Host header");
                None
            }
            None => None,
        };

        Context {
            federation: Arc::clone(self),
            request_host,
        }
    }

    pub fn has_handler(&self, kind: ActivityType) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub(crate) fn handler(&self, kind: ActivityType) -> Option<&ActivityHandler> {
        self.handlers.get(&kind)
    }

    pub(crate) fn collection(&self, kind: CollectionKind) -> Option<&CollectionDispatcher> {
        self.collections.get(&kind)
    }

    pub(crate) fn identity_provider(&self) -> Option<&IdentityProvider> {
        self.identity_provider.as_ref()
    }

    pub(crate) fn key_pair_provider(&self) -> Option<&KeyPairProvider> {
        self.key_pair_provider.as_ref()
    }
}

/// Builder for [`Federation`]
///
/// Registering the same activity type or collection kind twice keeps the
/// last registration.
pub struct FederationBuilder {
    config: AppConfig,
    http_client: Option<reqwest::Client>,
    identity_provider: Option<IdentityProvider>,
    key_pair_provider: Option<KeyPairProvider>,
    handlers: HashMap<ActivityType, ActivityHandler>,
    collections: HashMap<CollectionKind, CollectionDispatcher>,
}

impl FederationBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            http_client: None,
            identity_provider: None,
            key_pair_provider: None,
            handlers: HashMap::new(),
            collections: HashMap::new(),
        }
    }

    /// Use a preconfigured HTTP client instead of one built from `http.*`
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn actor_dispatcher<F>(mut self, provider: F) -> Self
    where
        F: Fn(&Context, &str) -> Option<Identity> + Send + Sync + 'static,
    {
        self.identity_provider = Some(Arc::new(provider));
        self
    }

    pub fn key_pairs_dispatcher<F>(mut self, provider: F) -> Self
    where
        F: Fn(&Context, &str) -> Option<KeyPair> + Send + Sync + 'static,
    {
        self.key_pair_provider = Some(Arc::new(provider));
        self
    }

    /// Register the inbox handler for `kind`
    pub fn on<F>(mut self, kind: ActivityType, handler: F) -> Self
    where
        F: Fn(&Context, &Activity) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        if self.handlers.insert(kind, Arc::new(handler)).is_some() {
            tracing::debug!(activity_type = %kind, "Replacing inbox handler");
        }
        self
    }

    /// Register the dispatcher set for a collection kind
    pub fn collection(mut self, kind: CollectionKind, dispatcher: CollectionDispatcher) -> Self {
        if self.collections.insert(kind, dispatcher).is_some() {
            tracing::debug!(collection = %kind, "Replacing collection dispatcher");
        }
        self
    }

    /// Validate configuration and freeze the registries
    ///
    /// # Errors
    /// `Config` for invalid configuration, `Http` if the client cannot be built
    pub fn build(self) -> Result<Federation> {
        self.config.validate()?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => self.config.http.build_client()?,
        };

        tracing::info!(
            handlers = self.handlers.len(),
            collections = self.collections.len(),
            "Federation configured"
        );

        Ok(Federation {
            config: self.config,
            http_client,
            identity_provider: self.identity_provider,
            key_pair_provider: self.key_pair_provider,
            handlers: self.handlers,
            collections: self.collections,
        })
    }
}

/// Per-request context handed to every host callback
#[derive(Clone)]
pub struct Context {
    federation: Arc<Federation>,
    request_host: Option<String>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_host", &self.request_host)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn federation(&self) -> &Federation {
        &self.federation
    }

    /// Host name used for canonical URIs
    pub fn host(&self) -> Option<&str> {
        self.federation
            .config
            .federation
            .effective_host(self.request_host.as_deref())
    }

    /// Base URL like "https://social.example.com"
    ///
    /// # Errors
    /// `NotConfigured` when neither `federation.host` nor a request host exists
    pub fn base_url(&self) -> Result<String> {
        self.federation
            .config
            .federation
            .base_url(self.request_host.as_deref())
            .ok_or_else(|| FederationError::NotConfigured("federation.host".to_string()))
    }

    /// Absolute URI of a named route for a local identifier
    pub fn link(&self, route: RouteName, identifier: &str, cursor: Option<&str>) -> Result<String> {
        let pattern = route.pattern(&self.federation.config.routes);
        routes::build_link(&self.base_url()?, pattern, identifier, cursor)
    }

    pub fn actor_uri(&self, identifier: &str) -> Result<String> {
        self.link(RouteName::Profile, identifier, None)
    }

    pub fn inbox_uri(&self, identifier: &str) -> Result<String> {
        self.link(RouteName::Inbox, identifier, None)
    }

    pub fn outbox_uri(&self, identifier: &str) -> Result<String> {
        self.link(RouteName::Outbox, identifier, None)
    }

    pub fn followers_uri(&self, identifier: &str) -> Result<String> {
        self.link(RouteName::Followers, identifier, None)
    }

    pub fn following_uri(&self, identifier: &str) -> Result<String> {
        self.link(RouteName::Following, identifier, None)
    }

    /// Resolve an object reference, fetching it when it is a link
    pub async fn get_object<T: DeserializeOwned>(&self, reference: &ObjectRef) -> Result<Option<T>> {
        RemoteObjectResolver::from_context(self)
            .resolve(reference)
            .await
    }

    /// Deliver `activity` from a local actor to one recipient
    pub async fn send_activity(
        &self,
        sender: &str,
        recipient: &ObjectRef,
        activity: &Activity,
    ) -> Result<DeliveryOutcome> {
        delivery::send_activity(self, sender, recipient, activity).await
    }

    /// Key pair of a local actor, if the host supplies one
    pub fn key_pair(&self, identifier: &str) -> Option<KeyPair> {
        self.federation
            .key_pair_provider()
            .and_then(|provider| provider(self, identifier))
    }
}
