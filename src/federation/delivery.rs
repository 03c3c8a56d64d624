//! Activity delivery
//!
//! Handles delivering activities to remote inboxes. Each delivery is a
//! single attempt; retry policy belongs to the caller.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;

use super::resolver::check_remote_url;
use super::{Context, RemoteObjectResolver, sign_request};
use crate::error::{FederationError, Result};
use crate::keys::key_id;
use crate::metrics::DELIVERIES_TOTAL;
use crate::vocab::{ACTIVITY_JSON, Activity, Actor, ObjectRef};

/// Outcome of [`send_activity`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Accepted by the recipient's inbox
    Delivered { inbox: String },
    /// Recipient could not be resolved to an inbox; nothing was sent
    Skipped { reason: String },
}

/// Result of one delivery within a fan-out
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub inbox_uri: String,
    pub success: bool,
    pub error: Option<String>,
    pub status_code: Option<u16>,
}

/// Deduplicate identical inbox URIs while keeping distinct personal inboxes.
fn unique_inbox_targets(inbox_uris: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    inbox_uris
        .into_iter()
        .filter(|inbox_uri| seen.insert(inbox_uri.clone()))
        .collect()
}

/// Deliver an activity from a local actor to one recipient.
///
/// The recipient is resolved to an actor document first. When that fails,
/// or the actor advertises no inbox, the delivery is skipped.
///
/// # Errors
/// `Delivery` when the inbox rejects the activity, `Http` on transport
/// failure, `Crypto` if signing fails
pub async fn send_activity(
    ctx: &Context,
    sender: &str,
    recipient: &ObjectRef,
    activity: &Activity,
) -> Result<DeliveryOutcome> {
    let resolver = RemoteObjectResolver::from_context(ctx);

    let actor = match resolver.resolve::<Actor>(recipient).await {
        Ok(Some(actor)) => actor,
        Ok(None) => return Ok(skipped(recipient, "recipient document is empty".to_string())),
        Err(error) => return Ok(skipped(recipient, error.to_string())),
    };

    let Some(inbox) = actor.inbox_uri().map(str::to_string) else {
        return Ok(skipped(recipient, format!("{} has no inbox", actor.id)));
    };

    deliver_to_inbox(ctx, sender, &inbox, activity).await?;
    Ok(DeliveryOutcome::Delivered { inbox })
}

fn skipped(recipient: &ObjectRef, reason: String) -> DeliveryOutcome {
    DELIVERIES_TOTAL.with_label_values(&["skipped"]).inc();
    tracing::warn!(
        recipient = recipient.id().unwrap_or("<inline>"),
        reason = %reason,
        "Skipping delivery"
    );
    DeliveryOutcome::Skipped { reason }
}

/// POST an activity to a single inbox
///
/// # Arguments
/// * `sender` - Local identifier of the sending actor
/// * `inbox_uri` - Target inbox URL
/// * `activity` - Activity to deliver
pub async fn deliver_to_inbox(
    ctx: &Context,
    sender: &str,
    inbox_uri: &str,
    activity: &Activity,
) -> Result<()> {
    let federation = ctx.federation();
    if !federation.config().http.allow_private_hosts {
        check_remote_url(inbox_uri)?;
    }

    let body = serde_json::to_vec(activity)
        .map_err(|e| FederationError::BadRequest(format!("Failed to serialize activity: {}", e)))?;

    let mut request = federation
        .http_client()
        .post(inbox_uri)
        .header(reqwest::header::CONTENT_TYPE, ACTIVITY_JSON)
        .header(reqwest::header::ACCEPT, ACTIVITY_JSON);

    match ctx.key_pair(sender) {
        Some(key_pair) => {
            let sig_headers = sign_request(
                "POST",
                inbox_uri,
                Some(&body),
                &key_pair,
                &key_id(&ctx.actor_uri(sender)?),
            )?;

            request = request
                .header("Date", sig_headers.date)
                .header("Signature", sig_headers.signature);
            if let Some(digest) = sig_headers.digest {
                request = request.header("Digest", digest);
            }
        }
        None => {
            tracing::warn!(sender, inbox = %inbox_uri, "No key pair for sender; sending unsigned");
        }
    }

    let response = request
        .body(body)
        .send()
        .await
        .inspect_err(|_| DELIVERIES_TOTAL.with_label_values(&["error"]).inc())?;

    let status = response.status();
    if !status.is_success() {
        DELIVERIES_TOTAL.with_label_values(&["rejected"]).inc();
        return Err(FederationError::Delivery {
            inbox: inbox_uri.to_string(),
            status: status.as_u16(),
        });
    }

    DELIVERIES_TOTAL.with_label_values(&["success"]).inc();
    tracing::info!(inbox = %inbox_uri, activity_type = %activity.kind, "Delivered activity");
    Ok(())
}

/// Deliver an activity to many inboxes concurrently
///
/// Identical inbox URIs are delivered once. Concurrency is bounded by
/// `delivery.max_concurrent`.
pub async fn deliver_to_inboxes(
    ctx: &Context,
    sender: &str,
    activity: &Activity,
    inbox_uris: Vec<String>,
) -> Vec<DeliveryResult> {
    let total_targets = inbox_uris.len();
    let delivery_targets = unique_inbox_targets(inbox_uris);

    tracing::info!(
        "Delivering to {} unique inboxes (deduplicated from {} total)",
        delivery_targets.len(),
        total_targets
    );

    let max_concurrent = ctx.federation().config().delivery.max_concurrent;
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let activity = Arc::new(activity.clone());
    let sender: Arc<str> = Arc::from(sender);

    let mut tasks = Vec::with_capacity(delivery_targets.len());

    for inbox_uri in delivery_targets {
        let semaphore = semaphore.clone();
        let activity = activity.clone();
        let sender = sender.clone();
        let ctx = ctx.clone();

        let task = tokio::spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = semaphore.acquire_owned().await.ok();
            let result = deliver_to_inbox(&ctx, &sender, &inbox_uri, &activity).await;

            let status_code = match &result {
                Err(FederationError::Delivery { status, .. }) => Some(*status),
                Err(FederationError::Http(error)) => error.status().map(|s| s.as_u16()),
                _ => None,
            };

            DeliveryResult {
                inbox_uri,
                success: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
                status_code,
            }
        });

        tasks.push(task);
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        match task.await {
            Ok(result) => results.push(result),
            Err(error) => tracing::error!(%error, "Delivery task panicked"),
        }
    }

    let success_count = results.iter().filter(|r| r.success).count();
    tracing::info!(
        "Batch delivery complete: {} succeeded, {} failed",
        success_count,
        results.len() - success_count
    );

    results
}
