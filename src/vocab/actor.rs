//! Actor documents and public keys

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::object::ObjectRef;

/// An actor document
///
/// Used both for the local profile the core publishes and for remote
/// actors fetched during delivery, so every link is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbox: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbox: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Endpoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<CryptographicKey>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Actor {
    /// Personal inbox URI, if the actor advertises one
    pub fn inbox_uri(&self) -> Option<&str> {
        self.inbox.as_ref().and_then(ObjectRef::id)
    }

    /// Shared inbox URI, if the actor's server offers one
    pub fn shared_inbox_uri(&self) -> Option<&str> {
        self.endpoints
            .as_ref()
            .and_then(|endpoints| endpoints.shared_inbox.as_deref())
    }
}

/// Actor `endpoints` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_inbox: Option<String>,
}

/// Publishable public key (`publicKey` block)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptographicKey {
    /// Key URI: actor URI plus `#main-key`
    pub id: String,
    /// Actor URI owning the key
    pub owner: String,
    /// SPKI PEM public key
    pub public_key_pem: String,
}
