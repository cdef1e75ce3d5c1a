mod common;

use common::*;
use iland_api::client::API_ACCEPT;
use iland_api::{ApiError, Token};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn empty_token_triggers_exactly_one_login() {
    let server = MockServer::start().await;
    mount_login(&server, "a-1", 1).await;
    Mock::given(method("GET"))
        .and(path("/v1/orgs/o-1"))
        .and(header("authorization", "Bearer a-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get("/v1/orgs/o-1").await.unwrap();
    client.get("/v1/orgs/o-1").await.unwrap();

    assert_eq!(hits(&server, TOKEN_PATH).await, 1);
}

#[tokio::test]
async fn sends_versioned_accept_and_json_content_type() {
    let server = MockServer::start().await;
    mount_login(&server, "a-1", 1).await;
    Mock::given(method("POST"))
        .and(path("/v1/vapps/v-1/actions/poweron"))
        .and(header("authorization", "Bearer a-1"))
        .and(header("accept", API_ACCEPT))
        .and(header("content-type", "application/json"))
        .and(body_string_contains("\"force\":true"))
        .respond_with(
            ResponseTemplate::new(202).set_body_string(r#"{"uuid":"t-1","active":true}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let task: iland_api::models::task::Task = client
        .post_json("/v1/vapps/v-1/actions/poweron", &serde_json::json!({"force": true}))
        .await
        .unwrap();

    assert_eq!(task.id, "t-1");
    assert!(task.active);
}

#[tokio::test]
async fn hijack_prefix_is_stripped_before_decoding() {
    let server = MockServer::start().await;
    mount_login(&server, "a-1", 1).await;
    Mock::given(method("GET"))
        .and(path("/v1/prefixed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#")]}'{"uuid":"x"}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"uuid":"x"}"#))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let prefixed: serde_json::Value = client.get_object("/v1/prefixed").await.unwrap();
    let plain: serde_json::Value = client.get_object("/v1/plain").await.unwrap();

    assert_eq!(prefixed, plain);
    assert_eq!(prefixed, serde_json::json!({"uuid": "x"}));
}

#[tokio::test]
async fn error_message_is_the_body_verbatim() {
    let server = MockServer::start().await;
    mount_login(&server, "a-1", 1).await;
    Mock::given(method("GET"))
        .and(path("/v1/vms/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get("/v1/vms/missing").await.unwrap_err();

    assert_eq!(err.to_string(), "not found");
    assert_eq!(err.status(), Some(404));
    match err {
        ApiError::Request { message, .. } => assert_eq!(message, "not found"),
        other => panic!("expected request error, got {other:?}"),
    }
}

#[tokio::test]
async fn status_204_is_success_and_anything_above_fails() {
    let server = MockServer::start().await;
    mount_login(&server, "a-1", 1).await;
    Mock::given(method("DELETE"))
        .and(path("/v1/vapps/gone"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/vapps/locked"))
        .respond_with(ResponseTemplate::new(409).set_body_string("vApp is busy"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.delete("/v1/vapps/gone").await.unwrap().is_empty());

    let err = client.delete("/v1/vapps/locked").await.unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.to_string(), "vApp is busy");
}

#[tokio::test]
async fn failed_login_is_authentication_error_and_no_api_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/orgs"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get("/v1/orgs").await.unwrap_err();

    assert!(err.requires_login());
    assert!(err.to_string().contains("could not retrieve a token"));
}

#[tokio::test]
async fn stale_token_is_refreshed_without_relogin() {
    let server = MockServer::start().await;
    // ttl below the safety margin: stale as soon as it is stored
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a-1", "r-1", 30)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a-2", "r-2", 3600)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/orgs"))
        .and(header("authorization", "Bearer a-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/orgs"))
        .and(header("authorization", "Bearer a-2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get("/v1/orgs").await.unwrap();
    client.get("/v1/orgs").await.unwrap();

    let current = client.current_token().await.unwrap();
    assert_eq!(current.token.access_token, "a-2");
    assert_eq!(current.token.refresh_token, "r-2");
}

#[tokio::test]
async fn rejected_refresh_falls_back_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a-1", "r-1", 0)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/orgs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get("/v1/orgs").await.unwrap();
    client.get("/v1/orgs").await.unwrap();
}

#[tokio::test]
async fn refresh_and_relogin_both_failing_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a-1", "r-1", 0)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/orgs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get("/v1/orgs").await.unwrap();

    let err = client.get("/v1/orgs").await.unwrap_err();
    assert!(matches!(err, ApiError::Authentication(_)));
}

#[tokio::test]
async fn concurrent_calls_share_one_login() {
    let server = MockServer::start().await;
    mount_login(&server, "a-1", 1).await;
    Mock::given(method("GET"))
        .and(path("/v1/orgs"))
        .and(header("authorization", "Bearer a-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(8)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move { client.get("/v1/orgs").await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(hits(&server, TOKEN_PATH).await, 1);
}

#[tokio::test]
async fn seeded_token_skips_login() {
    let server = MockServer::start().await;
    mount_login(&server, "unused", 0).await;
    Mock::given(method("GET"))
        .and(path("/v1/orgs"))
        .and(header("authorization", "Bearer seeded"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .set_token(Token {
            access_token: "seeded".into(),
            refresh_token: "r".into(),
            expires_in: 3600,
        })
        .await;
    client.get("/v1/orgs").await.unwrap();
}

#[tokio::test]
async fn oversized_token_ttl_does_not_break_dispatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("a-1", "r-1", 100_000_000_000_000)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/orgs"))
        .and(header("authorization", "Bearer a-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get("/v1/orgs").await.unwrap();
    client.get("/v1/orgs").await.unwrap();
}
