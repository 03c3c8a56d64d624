//! Activities and activity types

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ACTIVITY_STREAMS_CONTEXT, PUBLIC_AUDIENCE};
use super::object::{ObjectRef, one_or_many, single_or_many};
use crate::error::FederationError;

/// ActivityStreams 2.0 activity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    Accept,
    Add,
    Announce,
    Arrive,
    Block,
    Create,
    Delete,
    Dislike,
    Flag,
    Follow,
    Ignore,
    Invite,
    Join,
    Leave,
    Like,
    Listen,
    Move,
    Offer,
    Question,
    Read,
    Reject,
    Remove,
    TentativeAccept,
    TentativeReject,
    Travel,
    Undo,
    Update,
    View,
}

impl ActivityType {
    pub const ALL: [ActivityType; 28] = [
        Self::Accept,
        Self::Add,
        Self::Announce,
        Self::Arrive,
        Self::Block,
        Self::Create,
        Self::Delete,
        Self::Dislike,
        Self::Flag,
        Self::Follow,
        Self::Ignore,
        Self::Invite,
        Self::Join,
        Self::Leave,
        Self::Like,
        Self::Listen,
        Self::Move,
        Self::Offer,
        Self::Question,
        Self::Read,
        Self::Reject,
        Self::Remove,
        Self::TentativeAccept,
        Self::TentativeReject,
        Self::Travel,
        Self::Undo,
        Self::Update,
        Self::View,
    ];

    /// Parse activity type from its vocabulary name (case-sensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "Accept",
            Self::Add => "Add",
            Self::Announce => "Announce",
            Self::Arrive => "Arrive",
            Self::Block => "Block",
            Self::Create => "Create",
            Self::Delete => "Delete",
            Self::Dislike => "Dislike",
            Self::Flag => "Flag",
            Self::Follow => "Follow",
            Self::Ignore => "Ignore",
            Self::Invite => "Invite",
            Self::Join => "Join",
            Self::Leave => "Leave",
            Self::Like => "Like",
            Self::Listen => "Listen",
            Self::Move => "Move",
            Self::Offer => "Offer",
            Self::Question => "Question",
            Self::Read => "Read",
            Self::Reject => "Reject",
            Self::Remove => "Remove",
            Self::TentativeAccept => "TentativeAccept",
            Self::TentativeReject => "TentativeReject",
            Self::Travel => "Travel",
            Self::Undo => "Undo",
            Self::Update => "Update",
            Self::View => "View",
        }
    }

    /// Intransitive activities carry no `object`.
    pub fn is_intransitive(self) -> bool {
        matches!(self, Self::Arrive | Self::Travel | Self::Question)
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared type discriminator, known or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityKind {
    Known(ActivityType),
    /// Vocabulary this core does not model; kept verbatim
    Unknown(String),
}

impl ActivityKind {
    pub fn parse(name: &str) -> Self {
        match ActivityType::from_name(name) {
            Some(kind) => ActivityKind::Known(kind),
            None => ActivityKind::Unknown(name.to_string()),
        }
    }
}

/// An activity document
///
/// Well-known properties are typed; everything else survives a
/// decode/encode cycle through `extra`. Object-valued properties may hold
/// one reference or several; a single one is written back as a bare value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        serialize_with = "single_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub actor: Vec<ObjectRef>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        serialize_with = "single_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub object: Vec<ObjectRef>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        serialize_with = "single_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub target: Vec<ObjectRef>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        serialize_with = "single_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub origin: Vec<ObjectRef>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        serialize_with = "single_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub result: Vec<ObjectRef>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        serialize_with = "single_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub instrument: Vec<ObjectRef>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub to: Vec<ObjectRef>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub cc: Vec<ObjectRef>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub bto: Vec<ObjectRef>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub bcc: Vec<ObjectRef>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub audience: Vec<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Activity {
    /// Start an outbound activity with the ActivityStreams context
    pub fn new(kind: ActivityType, actor: impl Into<ObjectRef>) -> Self {
        Self {
            context: Some(Value::String(ACTIVITY_STREAMS_CONTEXT.to_string())),
            id: None,
            kind,
            actor: vec![actor.into()],
            object: Vec::new(),
            target: Vec::new(),
            origin: Vec::new(),
            result: Vec::new(),
            instrument: Vec::new(),
            to: Vec::new(),
            cc: Vec::new(),
            bto: Vec::new(),
            bcc: Vec::new(),
            audience: Vec::new(),
            published: None,
            summary: None,
            extra: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add an object; call again for multi-object activities
    pub fn with_object(mut self, object: impl Into<ObjectRef>) -> Self {
        self.object.push(object.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<ObjectRef>) -> Self {
        self.target.push(target.into());
        self
    }

    pub fn to(mut self, recipient: impl Into<ObjectRef>) -> Self {
        self.to.push(recipient.into());
        self
    }

    pub fn cc(mut self, recipient: impl Into<ObjectRef>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    pub fn published_now(mut self) -> Self {
        self.published = Some(chrono::Utc::now().to_rfc3339());
        self
    }

    /// Id of the first actor
    pub fn actor_id(&self) -> Option<&str> {
        self.actor.first().and_then(ObjectRef::id)
    }

    /// The first object, for activities that carry exactly one
    pub fn first_object(&self) -> Option<&ObjectRef> {
        self.object.first()
    }

    /// Addressed to the public collection in `to` or `cc`.
    ///
    /// Compact forms (`as:Public`, `Public`) count too.
    pub fn is_public(&self) -> bool {
        self.to
            .iter()
            .chain(&self.cc)
            .filter_map(ObjectRef::id)
            .any(|id| matches!(id, PUBLIC_AUDIENCE | "as:Public" | "Public"))
    }

    /// Decode an inbound document as an activity of the given type.
    ///
    /// The document may declare several types; the decoded value carries
    /// only `kind`. Transitive types must have at least one `object`.
    pub fn decode(kind: ActivityType, document: &Value) -> Result<Self, FederationError> {
        let Value::Object(fields) = document else {
            return Err(FederationError::BadRequest(
                "Activity must be a JSON object".to_string(),
            ));
        };

        let mut fields = fields.clone();
        fields.remove("@type");
        fields.insert("type".to_string(), Value::String(kind.as_str().to_string()));

        let activity: Activity = serde_json::from_value(Value::Object(fields))
            .map_err(|e| FederationError::BadRequest(format!("Invalid {} activity: {}", kind, e)))?;

        if !kind.is_intransitive() && activity.object.is_empty() {
            return Err(FederationError::BadRequest(format!(
                "{} activity requires an object",
                kind
            )));
        }

        Ok(activity)
    }
}
