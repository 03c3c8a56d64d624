//! Fediverse - an embeddable ActivityPub federation core
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HTTP Layer (Axum)                         │
//! │  - WebFinger                                                │
//! │  - Actor profile, inbox, collections                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Federation Core                           │
//! │  - Discovery and profile projection                         │
//! │  - Inbox dispatch to host handlers                          │
//! │  - Collection paging                                        │
//! │  - Remote object resolution and signed delivery             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Host Callbacks                            │
//! │  - Identities, key pairs, collection pages, handlers        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The core persists nothing. Hosts register providers and handlers on a
//! [`FederationBuilder`], share the built [`Federation`] through `Arc`, and
//! mount [`api::router`] (or call the core functions from their own
//! transport).
//!
//! # Modules
//!
//! - `api`: axum routes for discovery, profile, inbox and collections
//! - `federation`: dispatch, paging, resolution, delivery, signatures
//! - `keys`: RSA key pairs, JWK and PEM conversion
//! - `vocab`: ActivityStreams wire types
//! - `routes`: named routes and link construction
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod config;
pub mod error;
pub mod federation;
pub mod keys;
pub mod metrics;
pub mod routes;
pub mod vocab;

pub use config::AppConfig;
pub use error::{FederationError, Result};
pub use federation::{
    CollectionDispatcher, CollectionKind, CollectionSlice, Context, DeliveryOutcome, Federation,
    FederationBuilder, Identity,
};
pub use keys::{KeyManager, KeyPair};
pub use routes::RouteName;
pub use vocab::{Activity, ActivityType, Actor, ObjectRef};
