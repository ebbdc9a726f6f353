#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for game command relay integration tests.
//!
//! Provides a `wiremock` trust backend, a loopback-backed client builder, and
//! helpers for decoding what the loopback session recorded.

use std::time::Duration;

use game_command_relay::protocol::CommandPayload;
use game_command_relay::sessions::{LoopbackController, LoopbackFactory};
use game_command_relay::{SessionClient, SessionClientConfig};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Install a test-writer subscriber once; `RUST_LOG` overrides the filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// ── Trust backend ───────────────────────────────────────────────────

/// Successful signing response body.
pub fn sign_ok_body(app_id: Value, signature: &str) -> Value {
    json!({"code": 1, "msg": "ok", "data": {"appid": app_id, "sign": signature}})
}

/// Rejected signing response body.
pub fn sign_rejected_body(message: &str) -> Value {
    json!({"code": 0, "msg": message, "data": []})
}

/// Start a trust backend whose signing endpoint answers every request with
/// `body`.
pub async fn trust_backend(body: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/game_sign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

/// Start a trust backend that issues app id `"100"` and signature `"s"`.
pub async fn accepting_trust_backend() -> MockServer {
    trust_backend(sign_ok_body(json!("100"), "s")).await
}

// ── Client ──────────────────────────────────────────────────────────

/// Default configuration pointed at `server`.
pub fn config_for(server: &MockServer) -> SessionClientConfig {
    SessionClientConfig::new(server.uri())
}

/// Build an HTTP-issuer client backed by a fresh loopback session factory.
pub fn client_for(config: SessionClientConfig) -> (SessionClient, LoopbackController) {
    init_tracing();
    let (factory, controller) = LoopbackFactory::new();
    let client = SessionClient::new(config, factory).expect("build session client");
    (client, controller)
}

/// Command payloads the loopback session accepted, in send order.
pub fn sent_payloads(controller: &LoopbackController) -> Vec<CommandPayload> {
    controller
        .sent_texts()
        .iter()
        .map(|text| serde_json::from_str(text).expect("command payload"))
        .collect()
}

/// Command ids the loopback session accepted, in send order.
pub fn sent_ids(controller: &LoopbackController) -> Vec<String> {
    sent_payloads(controller).into_iter().map(|p| p.id).collect()
}

/// Give the lifecycle listener a chance to apply injected events.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
