//! E2E tests for WebFinger discovery

mod common;

use common::{LOCAL_HOST, TestServer};
use serde_json::Value;

#[tokio::test]
async fn test_webfinger_resolves_local_actor() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/.well-known/webfinger"))
        .query(&[("resource", "acct:alice@example.com")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/jrd+json"
    );

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["subject"], "alice@example.com");
    assert_eq!(json["aliases"][0], "https://example.com/users/alice");

    let self_link = json["links"]
        .as_array()
        .unwrap()
        .iter()
        .find(|link| link["rel"] == "self")
        .expect("self link");
    assert_eq!(self_link["type"], "application/activity+json");
    assert_eq!(self_link["href"], "https://example.com/users/alice");
}

#[tokio::test]
async fn test_webfinger_uses_local_part_whatever_the_domain() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/.well-known/webfinger"))
        .query(&[("resource", "acct:alice@anything.invalid")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["subject"], format!("alice@{}", LOCAL_HOST));
}

#[tokio::test]
async fn test_webfinger_accepts_resource_without_scheme() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/.well-known/webfinger"))
        .query(&[("resource", "bob@example.com")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["links"][0]["href"], "https://example.com/users/bob");
}

#[tokio::test]
async fn test_webfinger_unknown_actor_is_not_found() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/.well-known/webfinger"))
        .query(&[("resource", "acct:nobody@example.com")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let json: Value = response.json().await.unwrap();
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_webfinger_without_resource_is_bad_request() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/.well-known/webfinger"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}
