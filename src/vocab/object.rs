//! Object-or-link references

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A reference to another object.
///
/// ActivityStreams lets any object-valued property hold either a bare IRI,
/// an inline `Link` (`{"type":"Link","href":…}`) or the full object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    /// Bare IRI
    Link(String),
    /// Inline object (possibly a `Link` object)
    Object(Map<String, Value>),
}

impl ObjectRef {
    pub fn link(href: impl Into<String>) -> Self {
        ObjectRef::Link(href.into())
    }

    /// Wrap a JSON value; only strings and objects are references.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(href) => Some(ObjectRef::Link(href)),
            Value::Object(map) => Some(ObjectRef::Object(map)),
            _ => None,
        }
    }

    /// IRI to dereference when this is a link rather than an inline object.
    pub fn href(&self) -> Option<&str> {
        match self {
            ObjectRef::Link(href) => Some(href.as_str()),
            ObjectRef::Object(map) if has_type(map, "Link") => {
                map.get("href").and_then(Value::as_str)
            }
            ObjectRef::Object(_) => None,
        }
    }

    /// Identifier of the referenced object.
    pub fn id(&self) -> Option<&str> {
        match self {
            ObjectRef::Link(href) => Some(href.as_str()),
            ObjectRef::Object(map) => map
                .get("id")
                .and_then(Value::as_str)
                .or_else(|| self.href()),
        }
    }

    /// Whether an inline object declares the given type.
    pub fn is_type(&self, kind: &str) -> bool {
        match self {
            ObjectRef::Link(_) => false,
            ObjectRef::Object(map) => has_type(map, kind),
        }
    }
}

impl From<&str> for ObjectRef {
    fn from(href: &str) -> Self {
        ObjectRef::Link(href.to_string())
    }
}

impl From<String> for ObjectRef {
    fn from(href: String) -> Self {
        ObjectRef::Link(href)
    }
}

impl From<url::Url> for ObjectRef {
    fn from(url: url::Url) -> Self {
        ObjectRef::Link(url.into())
    }
}

fn has_type(map: &Map<String, Value>, kind: &str) -> bool {
    match map.get("type") {
        Some(Value::String(value)) => value == kind,
        Some(Value::Array(values)) => values.iter().any(|value| value.as_str() == Some(kind)),
        _ => false,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Accept a single value, an array of values or `null`.
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

/// Write one value bare and several as an array.
#[allow(clippy::ptr_arg)]
pub(crate) fn single_or_many<S, T>(values: &Vec<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    match values.as_slice() {
        [value] => value.serialize(serializer),
        values => values.serialize(serializer),
    }
}
