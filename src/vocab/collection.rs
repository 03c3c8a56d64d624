//! Ordered collections and pages

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::object::ObjectRef;

/// Collection response: either a link-only summary or a page of items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Collection {
    OrderedCollection(CollectionSummary),
    OrderedCollectionPage(CollectionPage),
}

/// Summary collection
///
/// Points at the first page, or lists nothing when there is no paging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordered_items: Option<Vec<ObjectRef>>,
}

/// One page of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPage {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub id: String,
    pub part_of: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u64>,
    #[serde(default)]
    pub ordered_items: Vec<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}
