//! Outbound federation against a stand-in remote server
//!
//! Covers object resolution and signed delivery.

mod common;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use common::{MockPeer, TestServer, test_key_pair};
use fediverse::federation::signature::parse_signature_header;
use fediverse::federation::{deliver_to_inboxes, generate_digest};
use fediverse::{Activity, ActivityType, DeliveryOutcome, FederationError, ObjectRef};
use serde_json::Value;

fn create_note(server: &TestServer, sender: &str) -> Activity {
    let actor = server.context().actor_uri(sender).unwrap();
    Activity::new(ActivityType::Create, actor.clone())
        .with_id(format!("{}/activities/1", actor))
        .with_object(ObjectRef::link("https://example.com/notes/1"))
        .published_now()
}

#[tokio::test]
async fn test_get_object_fetches_remote_document() {
    let server = TestServer::new().await;
    let peer = MockPeer::start().await;

    let note: Value = server
        .context()
        .get_object(&ObjectRef::link(peer.url("/notes/1")))
        .await
        .unwrap()
        .expect("note");

    assert_eq!(note["type"], "Note");
    assert_eq!(note["id"], peer.url("/notes/1"));
}

#[tokio::test]
async fn test_get_object_returns_inline_object_without_fetching() {
    let server = TestServer::new().await;

    let inline = ObjectRef::from_value(serde_json::json!({
        "id": "https://unreachable.invalid/notes/9",
        "type": "Note",
        "content": "inline"
    }))
    .unwrap();

    let note: Value = server.context().get_object(&inline).await.unwrap().unwrap();
    assert_eq!(note["content"], "inline");
}

#[tokio::test]
async fn test_get_object_reports_fetch_status() {
    let server = TestServer::new().await;
    let peer = MockPeer::start().await;

    let result = server
        .context()
        .get_object::<Value>(&ObjectRef::link(peer.url("/missing")))
        .await;

    match result {
        Err(FederationError::Fetch { url, status }) => {
            assert_eq!(status, 404);
            assert_eq!(url, peer.url("/missing"));
        }
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_object_empty_body_is_absent() {
    let server = TestServer::new().await;
    let peer = MockPeer::start().await;

    let result = server
        .context()
        .get_object::<Value>(&ObjectRef::link(peer.url("/empty")))
        .await
        .unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn test_get_object_undecodable_body_is_decode_error() {
    let server = TestServer::new().await;
    let peer = MockPeer::start().await;

    let result = server
        .context()
        .get_object::<Value>(&ObjectRef::link(peer.url("/garbage")))
        .await;

    assert!(matches!(result, Err(FederationError::Decode(_))));
}

#[tokio::test]
async fn test_send_activity_signs_delivery() {
    let server = TestServer::new().await;
    let peer = MockPeer::start().await;
    let activity = create_note(&server, "alice");

    let outcome = server
        .context()
        .send_activity("alice", &ObjectRef::link(peer.url("/users/bob")), &activity)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        DeliveryOutcome::Delivered {
            inbox: peer.url("/users/bob/inbox")
        }
    );

    let deliveries = peer.deliveries();
    assert_eq!(deliveries.len(), 1);
    let delivery = &deliveries[0];
    assert_eq!(delivery.path, "/users/bob/inbox");
    assert_eq!(
        delivery.headers["content-type"].to_str().unwrap(),
        "application/activity+json"
    );

    let body: Value = serde_json::from_slice(&delivery.body).unwrap();
    assert_eq!(body["type"], "Create");
    assert_eq!(body["actor"], "https://example.com/users/alice");

    let header = |name: &str| delivery.headers[name].to_str().unwrap().to_string();
    assert_eq!(header("digest"), generate_digest(&delivery.body));

    let signature = parse_signature_header(&header("signature")).unwrap();
    assert_eq!(signature.key_id, "https://example.com/users/alice#main-key");
    assert_eq!(signature.algorithm, "rsa-sha256");
    assert_eq!(signature.headers, ["(request-target)", "host", "date", "digest"]);

    let signing_string = format!(
        "(request-target): post {}\nhost: {}\ndate: {}\ndigest: {}",
        delivery.path,
        header("host"),
        header("date"),
        header("digest")
    );
    let raw_signature = BASE64.decode(&signature.signature).unwrap();
    assert!(test_key_pair().verify(signing_string.as_bytes(), &raw_signature));
}

#[tokio::test]
async fn test_send_activity_without_key_pair_is_unsigned() {
    let server = TestServer::new().await;
    let peer = MockPeer::start().await;
    let activity = create_note(&server, "bob");

    let outcome = server
        .context()
        .send_activity("bob", &ObjectRef::link(peer.url("/users/dave")), &activity)
        .await
        .unwrap();

    assert!(matches!(outcome, DeliveryOutcome::Delivered { .. }));
    let deliveries = peer.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].headers.get("signature").is_none());
}

#[tokio::test]
async fn test_send_activity_rejected_by_inbox() {
    let server = TestServer::new().await;
    let peer = MockPeer::start().await;
    let activity = create_note(&server, "alice");

    let result = server
        .context()
        .send_activity("alice", &ObjectRef::link(peer.url("/users/carol")), &activity)
        .await;

    match result {
        Err(FederationError::Delivery { inbox, status }) => {
            assert_eq!(inbox, peer.url("/users/carol/inbox"));
            assert_eq!(status, 403);
        }
        other => panic!("expected delivery error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_send_activity_skips_unresolvable_recipients() {
    let server = TestServer::new().await;
    let peer = MockPeer::start().await;
    let activity = create_note(&server, "alice");
    let ctx = server.context();

    for path in ["/users/nobody", "/missing", "/garbage"] {
        let outcome = ctx
            .send_activity("alice", &ObjectRef::link(peer.url(path)), &activity)
            .await
            .unwrap();
        assert!(
            matches!(outcome, DeliveryOutcome::Skipped { .. }),
            "{} should be skipped",
            path
        );
    }

    assert!(peer.deliveries().is_empty());
}

#[tokio::test]
async fn test_deliver_to_inboxes_deduplicates_targets() {
    let server = TestServer::new().await;
    let peer = MockPeer::start().await;
    let activity = create_note(&server, "alice");

    let results = deliver_to_inboxes(
        &server.context(),
        "alice",
        &activity,
        vec![
            peer.url("/users/bob/inbox"),
            peer.url("/users/dave/inbox"),
            peer.url("/users/bob/inbox"),
            peer.url("/users/carol/inbox"),
        ],
    )
    .await;

    assert_eq!(results.len(), 3);
    assert_eq!(peer.deliveries().len(), 3);

    let carol = results
        .iter()
        .find(|result| result.inbox_uri.ends_with("/carol/inbox"))
        .unwrap();
    assert!(!carol.success);
    assert_eq!(carol.status_code, Some(403));
    assert_eq!(results.iter().filter(|result| result.success).count(), 2);
}
