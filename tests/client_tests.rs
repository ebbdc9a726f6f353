//! Integration-style tests for `SessionClient`.
//!
//! A `wiremock` server plays the trust backend and the loopback session plays
//! the vendor SDK, so every scenario runs the real HTTP issuer, lifecycle
//! listener, queue, and drain.

#![cfg(feature = "http-issuer")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

mod common;

use std::time::Duration;

use game_command_relay::protocol::{AppId, ConversationType, QUEUED_MESSAGE};
use game_command_relay::{LifecycleEvent, VendorError};
use serde_json::json;

use common::{
    accepting_trust_backend, client_for, config_for, sent_ids, sent_payloads, settle,
    sign_ok_body, sign_rejected_body, trust_backend,
};

// ════════════════════════════════════════════════════════════════════
// Connect
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn connect_success_reports_identity() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));

    let outcome = client.connect("u1", "tok").await;

    assert!(outcome.success, "{outcome:?}");
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(
        value["data"],
        json!({"uid": "game_u1", "userId": "u1", "appId": "100"})
    );
    assert!(client.is_connected());
    assert_eq!(controller.logins(), vec![("game_u1".into(), "s".into())]);

    let status = client.status().await;
    assert!(status.connected);
    assert_eq!(status.session_user_id.as_deref(), Some("game_u1"));
    assert_eq!(status.local_user_id.as_deref(), Some("u1"));
    assert_eq!(status.app_id, Some(AppId::Text("100".into())));
    assert_eq!(status.queue_length, 0);
}

#[tokio::test]
async fn connect_sends_prefixed_uid_and_token_to_trust_backend() {
    let server = accepting_trust_backend().await;
    let (client, _controller) = client_for(config_for(&server));

    assert!(client.connect("u1", "tok").await.success);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body, json!({"uid": "game_u1", "token": "tok"}));
}

#[tokio::test]
async fn rejected_credential_fails_without_session() {
    let server = trust_backend(sign_rejected_body("bad token")).await;
    let (client, controller) = client_for(config_for(&server));

    let outcome = client.connect("u1", "tok").await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "bad token");
    assert!(outcome.data.is_none());
    assert!(!client.is_connected());
    assert!(controller.created().is_empty());
}

#[tokio::test]
async fn prefix_holds_after_failed_connect() {
    let server = trust_backend(sign_rejected_body("bad token")).await;
    let (client, _controller) = client_for(config_for(&server));

    client.connect("player-42", "tok").await;

    let status = client.status().await;
    assert_eq!(status.session_user_id.as_deref(), Some("game_player-42"));
    assert_eq!(status.local_user_id.as_deref(), Some("player-42"));
}

#[tokio::test]
async fn custom_prefix_is_applied() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server).with_user_id_prefix("cs2_"));

    let outcome = client.connect("u1", "tok").await;

    assert_eq!(outcome.data.unwrap().session_user_id, "cs2_u1");
    assert_eq!(controller.logins()[0].0, "cs2_u1");
}

#[tokio::test]
async fn numeric_app_id_reaches_the_session() {
    let server = trust_backend(sign_ok_body(json!(1_400_000_000u64), "sig")).await;
    let (client, controller) = client_for(config_for(&server));

    let outcome = client.connect("u1", "tok").await;

    assert!(outcome.success);
    assert_eq!(outcome.data.unwrap().app_id, AppId::Number(1_400_000_000));
    assert_eq!(controller.created()[0].sdk_app_id, 1_400_000_000);
}

#[tokio::test]
async fn unreachable_trust_backend_fails_connect() {
    // Nothing listens on the port of a dropped server.
    let uri = {
        let server = wiremock::MockServer::start().await;
        server.uri()
    };
    let (client, controller) = client_for(game_command_relay::SessionClientConfig::new(uri));

    let outcome = client.connect("u1", "tok").await;

    assert!(!outcome.success);
    assert!(!outcome.message.is_empty());
    assert!(controller.created().is_empty());
}

#[tokio::test]
async fn slow_trust_backend_times_out() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::path("/user/game_sign"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .set_body_json(sign_ok_body(json!("100"), "s"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let config = config_for(&server).with_credential_timeout(Some(Duration::from_millis(50)));
    let (client, controller) = client_for(config);

    let outcome = client.connect("u1", "tok").await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "signature request timed out");
    assert!(controller.created().is_empty());
}

#[tokio::test]
async fn login_rejection_is_reported() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));
    controller.fail_login(VendorError::new("userSig is expired").with_code(70001));

    let outcome = client.connect("u1", "tok").await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "userSig is expired");
    assert!(!client.is_connected());

    // A later connect with a working login succeeds.
    controller.accept_login();
    assert!(client.connect("u1", "tok").await.success);
    assert!(client.is_connected());
}

// ════════════════════════════════════════════════════════════════════
// Dispatch
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn send_while_disconnected_is_queued() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));

    let outcome = client.send_command("cmd1").await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, QUEUED_MESSAGE);
    assert!(outcome.is_queued());
    assert_eq!(client.pending_commands().await, vec!["cmd1".to_string()]);
    assert_eq!(client.status().await.queue_length, 1);
    assert!(controller.sent().is_empty());
}

#[tokio::test]
async fn queued_commands_keep_call_order() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));

    for id in ["c1", "c2", "c3", "c4"] {
        assert!(client.send_command(id).await.is_queued());
    }

    assert_eq!(client.pending_commands().await, vec!["c1", "c2", "c3", "c4"]);
    assert!(controller.sent().is_empty());
}

#[tokio::test]
async fn connected_send_targets_unprefixed_peer() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));
    assert!(client.connect("u1", "tok").await.success);

    let outcome = client.send_command("player_hurt").await;

    assert!(outcome.success, "{outcome:?}");
    assert!(outcome.data.is_some());
    let sent = controller.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message.to, "u1");
    assert_eq!(sent[0].message.conversation_type, ConversationType::C2c);
    let payload: serde_json::Value = serde_json::from_str(&sent[0].message.payload.text).unwrap();
    assert_eq!(
        payload,
        json!({"code": "game_cmd", "id": "player_hurt", "token": "tok"})
    );
}

#[tokio::test]
async fn failed_send_is_not_requeued() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));
    assert!(client.connect("u1", "tok").await.success);
    controller.script_sends([Some(VendorError::new("peer unreachable"))]);

    let outcome = client.send_command("cmd").await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "peer unreachable");
    assert!(!outcome.is_queued());
    assert_eq!(client.status().await.queue_length, 0);
}

// ════════════════════════════════════════════════════════════════════
// Drain
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn queued_commands_drain_in_order_with_pacing() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));
    client.send_command("cmd1").await;
    client.send_command("cmd2").await;

    let outcome = client.connect("u1", "tok").await;

    assert!(outcome.success);
    assert_eq!(sent_ids(&controller), vec!["cmd1", "cmd2"]);
    let sent = controller.sent();
    let gap = sent[1].at.duration_since(sent[0].at);
    assert!(gap >= Duration::from_millis(100), "gap was {gap:?}");
    assert_eq!(client.status().await.queue_length, 0);
}

#[tokio::test]
async fn drain_attempts_each_command_once_despite_failures() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(
        config_for(&server).with_pacing_interval(Duration::from_millis(10)),
    );
    for id in ["a", "b", "c"] {
        client.send_command(id).await;
    }
    controller.script_sends([None, Some(VendorError::new("rejected")), None]);

    assert!(client.connect("u1", "tok").await.success);

    // "b" failed and was dropped; "c" was still attempted.
    assert_eq!(sent_ids(&controller), vec!["a", "c"]);
    assert!(client.pending_commands().await.is_empty());
}

#[tokio::test]
async fn drained_payloads_carry_current_token() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(
        config_for(&server).with_pacing_interval(Duration::from_millis(10)),
    );
    client.send_command("x").await;

    assert!(client.connect("u1", "fresh-token").await.success);

    let payloads = sent_payloads(&controller);
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].token, "fresh-token");
}

// ════════════════════════════════════════════════════════════════════
// Lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn kicked_out_switches_to_queueing_without_disconnect() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));
    assert!(client.connect("u1", "tok").await.success);

    assert!(controller.emit(LifecycleEvent::KickedOut));
    settle().await;

    assert!(!client.is_connected());
    assert!(client.send_command("late").await.is_queued());
    assert!(controller.sent().is_empty());
    assert_eq!(controller.logouts(), 0);
}

#[tokio::test]
async fn sdk_not_ready_switches_to_queueing() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));
    assert!(client.connect("u1", "tok").await.success);

    assert!(controller.emit(LifecycleEvent::SdkNotReady));
    settle().await;

    assert!(!client.status().await.connected);
    assert!(client.send_command("late").await.is_queued());
}

#[tokio::test]
async fn informational_events_keep_session() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));
    assert!(client.connect("u1", "tok").await.success);

    controller.emit(LifecycleEvent::SdkReady);
    controller.emit(LifecycleEvent::NetStateChange {
        state: "disconnected".into(),
    });
    controller.emit(LifecycleEvent::MessageReceived {
        messages: vec![json!({"payload": {"text": "hello"}})],
    });
    controller.emit(LifecycleEvent::Error {
        code: Some(2801),
        message: "request timed out".into(),
    });
    settle().await;

    assert!(client.is_connected());
    assert!(client.send_command("still-live").await.success);
}

#[tokio::test]
async fn reconnect_after_kick_drains_queue() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(
        config_for(&server).with_pacing_interval(Duration::from_millis(10)),
    );
    assert!(client.connect("u1", "tok").await.success);
    controller.emit(LifecycleEvent::KickedOut);
    settle().await;
    client.send_command("q1").await;
    client.send_command("q2").await;

    assert!(client.connect("u1", "tok").await.success);

    assert_eq!(sent_ids(&controller), vec!["q1", "q2"]);
    assert!(client.is_connected());
}

#[tokio::test]
async fn send_during_reconnect_waits_for_new_session() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::path("/user/game_sign"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .set_body_json(sign_ok_body(json!("100"), "s"))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    let (client, controller) = client_for(
        config_for(&server).with_pacing_interval(Duration::from_millis(10)),
    );
    assert!(client.connect("u1", "old-tok").await.success);

    let (connected, mid) = tokio::join!(client.connect("u2", "new-tok"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.send_command("mid").await
    });

    assert!(connected.success, "{connected:?}");
    assert!(mid.is_queued(), "{mid:?}");
    let sent = controller.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message.to, "u2");
    assert_eq!(sent_payloads(&controller)[0].token, "new-tok");
}

// ════════════════════════════════════════════════════════════════════
// Disconnect
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn send_during_disconnect_is_queued() {
    let server = accepting_trust_backend().await;
    let config = config_for(&server).with_logout_timeout(Some(Duration::from_millis(200)));
    let (client, controller) = client_for(config);
    assert!(client.connect("u1", "tok").await.success);
    controller.hang_logout();

    let ((), outcome) = tokio::join!(client.disconnect(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.send_command("during-disconnect").await
    });

    assert!(outcome.is_queued(), "{outcome:?}");
    assert_eq!(client.pending_commands().await, vec!["during-disconnect"]);
    assert!(controller.sent().is_empty());
}

#[tokio::test]
async fn disconnect_logs_out_and_keeps_queue() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));
    assert!(client.connect("u1", "tok").await.success);

    client.disconnect().await;
    assert_eq!(controller.logouts(), 1);
    assert!(!client.is_connected());

    client.send_command("kept").await;
    client.disconnect().await;
    // No session left, so no second logout.
    assert_eq!(controller.logouts(), 1);
    assert_eq!(client.pending_commands().await, vec!["kept".to_string()]);
}

#[tokio::test]
async fn disconnect_swallows_logout_failure() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));
    assert!(client.connect("u1", "tok").await.success);
    controller.fail_logout(VendorError::new("logout failed"));

    client.disconnect().await;

    assert!(!client.is_connected());
    assert!(client.send_command("next").await.is_queued());
}

#[tokio::test]
async fn disconnect_bounds_hung_logout() {
    let server = accepting_trust_backend().await;
    let config = config_for(&server).with_logout_timeout(Some(Duration::from_millis(30)));
    let (client, controller) = client_for(config);
    assert!(client.connect("u1", "tok").await.success);
    controller.hang_logout();

    tokio::time::timeout(Duration::from_secs(2), client.disconnect())
        .await
        .expect("disconnect should not hang");

    assert!(!client.is_connected());
}

#[tokio::test]
async fn disconnect_before_connect_is_a_no_op() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));

    client.disconnect().await;

    assert!(!client.is_connected());
    assert_eq!(controller.logouts(), 0);
}

#[tokio::test]
async fn events_after_disconnect_are_ignored() {
    let server = accepting_trust_backend().await;
    let (client, controller) = client_for(config_for(&server));
    assert!(client.connect("u1", "tok").await.success);
    client.disconnect().await;

    // The listener is gone, so the sink reports the event as undeliverable.
    settle().await;
    assert!(!controller.emit(LifecycleEvent::SdkReady));
}
