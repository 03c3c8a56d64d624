//! Demo host binary
//!
//! Serves one in-memory actor so the federation routes can be exercised
//! against real peers. Followers are kept in memory and every Follow is
//! answered with an Accept.

use std::sync::{Arc, RwLock};

use fediverse::federation::Context;
use fediverse::{
    Activity, ActivityType, AppConfig, CollectionDispatcher, CollectionKind, CollectionSlice,
    Federation, Identity, KeyManager, ObjectRef,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PAGE_SIZE: usize = 20;

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Register providers and handlers
/// 4. Build Axum router
/// 5. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("FEDIVERSE__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "fediverse=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "fediverse=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting fediverse demo host...");

    // 2. Initialize metrics
    fediverse::metrics::init_metrics();

    // 3. Load configuration
    let config = AppConfig::load()?;
    tracing::info!(
        host = ?config.federation.host,
        protocol = %config.federation.protocol,
        "Configuration loaded"
    );

    let actor_name = std::env::var("FEDIVERSE_DEMO_ACTOR").unwrap_or_else(|_| "alice".to_string());
    let key_pair = KeyManager::new(&config.keys).generate_key_pair()?;
    let followers: Arc<RwLock<Vec<String>>> = Arc::new(RwLock::new(Vec::new()));

    // 4. Register providers and handlers
    let federation = {
        let known_actor = actor_name.clone();
        let followers_page = followers.clone();
        let followers_on_follow = followers.clone();
        let followers_on_undo = followers.clone();
        let followed_actor = actor_name.clone();

        Federation::builder(config.clone())
            .actor_dispatcher(move |_, identifier| {
                (identifier == known_actor).then(|| Identity {
                    name: Some(identifier.to_string()),
                    published: Some(chrono::Utc::now()),
                    ..Identity::new(identifier)
                })
            })
            .key_pairs_dispatcher(move |_, _| Some(key_pair.clone()))
            .collection(
                CollectionKind::Followers,
                CollectionDispatcher::new(move |_, _, cursor| {
                    let cursor = cursor?;
                    let offset: usize = cursor.parse().ok()?;
                    let followers = followers_page.read().ok()?;
                    let items: Vec<ObjectRef> = followers
                        .iter()
                        .skip(offset)
                        .take(PAGE_SIZE)
                        .cloned()
                        .map(ObjectRef::Link)
                        .collect();
                    Some(
                        CollectionSlice::new(items)
                            .with_next_cursor((offset + PAGE_SIZE).to_string())
                            .with_total_items(followers.len() as u64),
                    )
                })
                .with_first_cursor(|_, _| "0".to_string()),
            )
            .collection(
                CollectionKind::Outbox,
                CollectionDispatcher::new(|_, _, _| None),
            )
            .on(ActivityType::Follow, move |ctx, activity| {
                on_follow(ctx, activity, &followed_actor, &followers_on_follow)
            })
            .on(ActivityType::Undo, move |_, activity| {
                let undoes_other = activity
                    .object
                    .iter()
                    .any(|object| object.href().is_none() && !object.is_type("Follow"));
                let Some(follower) = activity.actor_id() else {
                    return Ok(());
                };
                if undoes_other {
                    return Ok(());
                }
                if let Ok(mut followers) = followers_on_undo.write() {
                    followers.retain(|existing| existing != follower);
                }
                Ok(())
            })
            .build()?
    };
    let federation = Arc::new(federation);

    // 5. Build Axum router
    let app = fediverse::api::router(federation).merge(fediverse::api::metrics_router::<()>());

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(actor = %actor_name, "Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Record the follower and answer with an Accept in the background
fn on_follow(
    ctx: &Context,
    activity: &Activity,
    identifier: &str,
    followers: &RwLock<Vec<String>>,
) -> anyhow::Result<()> {
    let follower = activity
        .actor_id()
        .ok_or_else(|| anyhow::anyhow!("Follow without actor"))?
        .to_string();
    let followed = activity
        .first_object()
        .and_then(ObjectRef::id)
        .ok_or_else(|| anyhow::anyhow!("Follow without object"))?;

    let local_actor = ctx.actor_uri(identifier)?;
    if followed != local_actor {
        anyhow::bail!("Follow targets {}, not {}", followed, local_actor);
    }

    {
        let mut followers = followers
            .write()
            .map_err(|_| anyhow::anyhow!("follower list poisoned"))?;
        if !followers.contains(&follower) {
            followers.push(follower.clone());
        }
    }

    let follow = ObjectRef::from_value(serde_json::to_value(activity)?)
        .ok_or_else(|| anyhow::anyhow!("Follow is not an object"))?;
    let accept = Activity::new(ActivityType::Accept, local_actor)
        .with_object(follow)
        .to(follower.clone())
        .published_now();

    let ctx = ctx.clone();
    let identifier = identifier.to_string();
    tokio::spawn(async move {
        let recipient = ObjectRef::link(follower);
        match ctx.send_activity(&identifier, &recipient, &accept).await {
            Ok(outcome) => tracing::info!(?outcome, "Accept sent"),
            Err(error) => tracing::warn!(%error, "Accept delivery failed"),
        }
    });

    Ok(())
}
