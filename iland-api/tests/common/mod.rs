#![allow(dead_code)]

use iland_api::{Client, ClientConfig, Credentials};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/auth/token";

pub fn token_body(access: &str, refresh: &str, expires_in: i64) -> serde_json::Value {
    serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": expires_in
    })
}

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new()
        .with_api_base(server.uri())
        .with_token_url(format!("{}{}", server.uri(), TOKEN_PATH))
        .with_timeout(5)
        .with_poll_interval(Duration::from_millis(10))
        .with_reconnect_delay(Duration::from_millis(50))
}

pub fn client_for(server: &MockServer) -> Client {
    client_with(config_for(server))
}

pub fn client_with(config: ClientConfig) -> Client {
    let credentials = Credentials::new("console", "s3cret", "alice", "hunter2");
    Client::new(credentials, config).expect("valid test config")
}

/// Password grant answering with a long-lived token
pub async fn mount_login(server: &MockServer, access: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access, "r-1", 3600)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Requests the mock server saw on `request_path`
pub async fn hits(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}
