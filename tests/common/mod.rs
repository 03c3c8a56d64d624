//! Common test utilities for E2E tests
#![allow(dead_code)]

pub mod schema_validator;

use std::sync::{Arc, Mutex, OnceLock};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use fediverse::federation::Context;
use fediverse::{
    Activity, ActivityType, AppConfig, CollectionDispatcher, CollectionKind, CollectionSlice,
    Federation, Identity, KeyPair, ObjectRef,
};
use tokio::net::TcpListener;

pub const LOCAL_HOST: &str = "example.com";

/// Outbox contents served by the test host
pub const OUTBOX_SIZE: usize = 3;

/// Shared signing key; generated once per test binary
pub fn test_key_pair() -> KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = rand::thread_rng();
        let private_key = rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap();
        KeyPair::from_private_key(private_key)
    })
    .clone()
}

/// Test configuration: fixed public host, private fetches allowed
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.port = 0;
    config.federation.host = Some(LOCAL_HOST.to_string());
    config.http.allow_private_hosts = true;
    config.http.timeout_seconds = 5;
    config
}

fn outbox_item(index: usize) -> ObjectRef {
    ObjectRef::link(format!("https://{}/notes/{}", LOCAL_HOST, index))
}

/// Test server instance
///
/// Serves `alice` (with a key pair) and `bob` (without one). Follow
/// activities are recorded; Flag handlers always fail.
pub struct TestServer {
    pub addr: String,
    pub federation: Arc<Federation>,
    pub received: Arc<Mutex<Vec<Activity>>>,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let recorder = received.clone();

        let federation = Federation::builder(test_config())
            .actor_dispatcher(|_, identifier| match identifier {
                "alice" => Some(Identity {
                    name: Some("Alice".to_string()),
                    summary: Some("Test account".to_string()),
                    url: Some(format!("https://{}/@alice", LOCAL_HOST)),
                    icon: Some(format!("https://{}/media/alice.png", LOCAL_HOST)),
                    published: Some(chrono::Utc::now()),
                    ..Identity::new("alice")
                }),
                "bob" => Some(Identity::new("bob")),
                _ => None,
            })
            .key_pairs_dispatcher(|_, identifier| (identifier == "alice").then(test_key_pair))
            .on(ActivityType::Follow, move |_, activity| {
                recorder.lock().unwrap().push(activity.clone());
                Ok(())
            })
            .on(ActivityType::Flag, |_, _| Err(anyhow::anyhow!("moderation queue unavailable")))
            .collection(
                CollectionKind::Outbox,
                CollectionDispatcher::new(|_, _, cursor| {
                    let offset: usize = cursor?.parse().ok()?;
                    let items: Vec<ObjectRef> = (offset..OUTBOX_SIZE.max(offset))
                        .take(2)
                        .map(outbox_item)
                        .collect();
                    Some(
                        CollectionSlice::new(items)
                            .with_next_cursor((offset + 2).to_string())
                            .with_total_items(OUTBOX_SIZE as u64),
                    )
                }),
            )
            .collection(
                CollectionKind::Followers,
                CollectionDispatcher::new(|_, _, cursor| {
                    cursor.map(|_| CollectionSlice::new(vec![ObjectRef::link("https://remote.example/users/carol")]))
                })
                .with_first_cursor(|_, _| "first".to_string())
                .with_last_cursor(|_, _| "last".to_string()),
            )
            .build()
            .unwrap();
        let federation = Arc::new(federation);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = fediverse::api::router(federation.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            federation,
            received,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Context as seen by host code outside a request
    pub fn context(&self) -> Context {
        self.federation.context(None)
    }

    /// Follow activities recorded by the inbox handler
    pub fn received_follows(&self) -> Vec<Activity> {
        self.received.lock().unwrap().clone()
    }
}

/// A delivery recorded by [`MockPeer`]
#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone)]
struct PeerState {
    base: String,
    deliveries: Arc<Mutex<Vec<RecordedDelivery>>>,
}

/// Remote server stand-in
///
/// - `GET /users/:name` - actor documents (`nobody` has no inbox)
/// - `GET /notes/1` - a Note
/// - `GET /empty`, `/garbage`, `/missing` - empty body, non-JSON, 404
/// - `POST /users/:name/inbox` - records deliveries; `carol` answers 403
pub struct MockPeer {
    pub base: String,
    pub deliveries: Arc<Mutex<Vec<RecordedDelivery>>>,
}

impl MockPeer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let deliveries = Arc::new(Mutex::new(Vec::new()));

        let state = PeerState {
            base: base.clone(),
            deliveries: deliveries.clone(),
        };

        let app = axum::Router::new()
            .route("/users/:name", get(peer_actor))
            .route("/users/:name/inbox", post(peer_inbox))
            .route(
                "/notes/1",
                get(|State(state): State<PeerState>| async move {
                    axum::Json(serde_json::json!({
                        "id": format!("{}/notes/1", state.base),
                        "type": "Note",
                        "content": "hello from the peer"
                    }))
                }),
            )
            .route("/empty", get(|| async { StatusCode::OK }))
            .route("/garbage", get(|| async { "<html>not json</html>" }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self { base, deliveries }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.lock().unwrap().clone()
    }
}

async fn peer_actor(State(state): State<PeerState>, Path(name): Path<String>) -> Response {
    let id = format!("{}/users/{}", state.base, name);
    let mut actor = serde_json::json!({
        "@context": ["https://www.w3.org/ns/activitystreams"],
        "id": id,
        "type": "Person",
        "preferredUsername": name,
    });
    if name != "nobody" {
        actor["inbox"] = serde_json::Value::String(format!("{}/inbox", id));
    }

    (
        [(axum::http::header::CONTENT_TYPE, "application/activity+json")],
        axum::Json(actor),
    )
        .into_response()
}

async fn peer_inbox(
    State(state): State<PeerState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    state.deliveries.lock().unwrap().push(RecordedDelivery {
        path: format!("/users/{}/inbox", name),
        headers,
        body,
    });

    if name == "carol" {
        StatusCode::FORBIDDEN
    } else {
        StatusCode::ACCEPTED
    }
}
