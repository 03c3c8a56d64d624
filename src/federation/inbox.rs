//! Inbox dispatch
//!
//! Reads the type discriminator of an inbound document and invokes the
//! registered handler for every recognized type. Signature verification
//! and replay protection are the host's concern.

use serde_json::Value;

use super::Context;
use crate::error::{FederationError, Result};
use crate::metrics::{ACTIVITIES_RECEIVED, HANDLERS_INVOKED};
use crate::vocab::{Activity, ActivityKind, ActivityType};

/// What happened to one inbound document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Discriminator values as declared, in order
    pub declared: Vec<String>,
    /// Types whose handler ran, in order
    pub handled: Vec<ActivityType>,
}

/// Dispatch a raw request body
///
/// # Errors
/// - `BadRequest` for an empty, non-JSON or untyped document
/// - `Handler` when a host handler fails
pub fn dispatch(ctx: &Context, body: &[u8]) -> Result<DispatchReport> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FederationError::BadRequest(
            "Activity document is empty".to_string(),
        ));
    }

    let document: Value = serde_json::from_slice(body)
        .map_err(|e| FederationError::BadRequest(format!("Invalid JSON: {}", e)))?;

    dispatch_value(ctx, &document)
}

/// Dispatch an already parsed document
pub fn dispatch_value(ctx: &Context, document: &Value) -> Result<DispatchReport> {
    let declared = type_discriminators(document)?;
    let mut handled = Vec::new();

    for name in &declared {
        ACTIVITIES_RECEIVED.with_label_values(&[label(name)]).inc();

        let kind = match ActivityKind::parse(name) {
            ActivityKind::Known(kind) => kind,
            ActivityKind::Unknown(name) => {
                tracing::debug!(activity_type = %name, "Skipping unknown activity type");
                continue;
            }
        };

        if handled.contains(&kind) {
            continue;
        }

        let Some(handler) = ctx.federation().handler(kind) else {
            tracing::debug!(activity_type = %kind, "No handler registered");
            continue;
        };

        let activity = Activity::decode(kind, document)?;

        if let Err(error) = handler(ctx, &activity) {
            HANDLERS_INVOKED
                .with_label_values(&[kind.as_str(), "error"])
                .inc();
            tracing::warn!(activity_type = %kind, error = %error, "Inbox handler failed");
            return Err(FederationError::Handler(error));
        }

        HANDLERS_INVOKED
            .with_label_values(&[kind.as_str(), "success"])
            .inc();
        handled.push(kind);
    }

    tracing::info!(
        declared = ?declared,
        handled = handled.len(),
        "Dispatched inbound activity"
    );

    Ok(DispatchReport { declared, handled })
}

/// Declared type names of a document.
///
/// `type` is read first and `@type` is the fallback. A string yields one
/// name; an array yields its elements with non-strings as `""`; any other
/// JSON value yields `[""]`.
///
/// # Errors
/// `BadRequest` if the document is not an object or declares no type
pub fn type_discriminators(document: &Value) -> Result<Vec<String>> {
    let Value::Object(fields) = document else {
        return Err(FederationError::BadRequest(
            "Activity must be a JSON object".to_string(),
        ));
    };

    let discriminator = [fields.get("type"), fields.get("@type")]
        .into_iter()
        .flatten()
        .find(|value| !value.is_null())
        .ok_or_else(|| FederationError::BadRequest("Activity has no type".to_string()))?;

    Ok(match discriminator {
        Value::String(name) => vec![name.clone()],
        Value::Array(values) => values
            .iter()
            .map(|value| value.as_str().unwrap_or_default().to_string())
            .collect(),
        _ => vec![String::new()],
    })
}

/// Keep metric cardinality bounded to the known vocabulary
fn label(name: &str) -> &'static str {
    ActivityType::from_name(name).map_or("unknown", ActivityType::as_str)
}
