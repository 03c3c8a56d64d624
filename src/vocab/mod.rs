//! ActivityStreams wire vocabulary
//!
//! Typed shapes for the documents the core reads and writes:
//! - Object references (`ObjectRef`)
//! - Activities and the closed set of activity types
//! - Actor profiles and public-key descriptors
//! - Ordered collections and collection pages

mod activity;
mod actor;
mod collection;
mod object;

pub use activity::{Activity, ActivityKind, ActivityType};
pub use actor::{Actor, CryptographicKey, Endpoints};
pub use collection::{Collection, CollectionPage, CollectionSummary};
pub use object::ObjectRef;

/// Media type for ActivityPub documents
pub const ACTIVITY_JSON: &str = "application/activity+json";

/// ActivityStreams 2.0 JSON-LD context
pub const ACTIVITY_STREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";

/// Security vocabulary context (publicKey)
pub const SECURITY_CONTEXT: &str = "https://w3id.org/security/v1";

/// Public addressing collection
pub const PUBLIC_AUDIENCE: &str = "https://www.w3.org/ns/activitystreams#Public";
