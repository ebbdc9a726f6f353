//! # Loopback Relay Demo
//!
//! Drives a [`SessionClient`] end to end without any network access:
//!
//! - a fixed [`SignatureIssuer`] stands in for the trust backend
//! - the loopback session stands in for the vendor SDK
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback_relay
//! ```

use async_trait::async_trait;
use game_command_relay::protocol::{AppId, SignData};
use game_command_relay::sessions::LoopbackFactory;
use game_command_relay::{LifecycleEvent, RelayError, SessionClient, SessionClientConfig, SignatureIssuer};

// ─────────────────────────────────────────────────────────────────────
// Step 1: A signature issuer that never leaves the process
// ─────────────────────────────────────────────────────────────────────

struct FixedIssuer;

#[async_trait]
impl SignatureIssuer for FixedIssuer {
    async fn request_signature(
        &self,
        session_user_id: &str,
        _auth_token: &str,
    ) -> Result<SignData, RelayError> {
        tracing::info!("issuing demo signature for {session_user_id}");
        Ok(SignData {
            app_id: AppId::Text("1400000000".into()),
            signature: format!("demo-sig-{session_user_id}"),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: Queue, connect, relay, get kicked, queue again
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (factory, controller) = LoopbackFactory::new();
    let client = SessionClient::with_issuer(SessionClientConfig::default(), FixedIssuer, factory);

    // No session yet: both commands are deferred.
    for command in ["round_start", "player_hurt"] {
        let outcome = client.send_command(command).await;
        tracing::info!(command, queued = outcome.is_queued(), "submitted");
    }
    tracing::info!("status before connect: {}", serde_json::to_string(&client.status().await)?);

    let outcome = client.connect("demo-player", "demo-token").await;
    tracing::info!("connect outcome: {}", serde_json::to_string(&outcome)?);

    let outcome = client.send_command("player_death").await;
    tracing::info!("send outcome: {}", serde_json::to_string(&outcome)?);

    // Simulate another login taking over the account.
    controller.emit(LifecycleEvent::KickedOut);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let outcome = client.send_command("round_end").await;
    tracing::info!(queued = outcome.is_queued(), "submitted after kick");

    for text in controller.sent_texts() {
        tracing::info!("peer received: {text}");
    }

    client.disconnect().await;
    tracing::info!("status after disconnect: {}", serde_json::to_string(&client.status().await)?);

    Ok(())
}
