//! # Game Command Relay
//!
//! Session client that relays short game commands to a peer over a vendor
//! instant-messaging session.
//!
//! The crate orchestrates the session; it does not implement the messaging
//! transport. It:
//!
//! - **acquires credentials** from a trust-issuing backend ([`SignatureIssuer`])
//! - **opens and tracks a session** through a pluggable vendor capability
//!   ([`SessionFactory`] / [`Session`]) and its [`LifecycleEvent`]s
//! - **queues commands** while disconnected and replays them, paced, on the
//!   next successful connect
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use game_command_relay::sessions::LoopbackFactory;
//! use game_command_relay::{SessionClient, SessionClientConfig};
//!
//! # async fn example() -> Result<(), game_command_relay::RelayError> {
//! let (factory, _controller) = LoopbackFactory::new();
//! let client = SessionClient::new(SessionClientConfig::default(), factory)?;
//!
//! let outcome = client.connect("u1", "token").await;
//! if !outcome.success {
//!     eprintln!("connect failed: {}", outcome.message);
//! }
//! client.send_command("player_hurt").await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod credential;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod sessions;

// Re-export primary types for ergonomic imports.
pub use client::{SessionClient, SessionClientConfig};
#[cfg(feature = "http-issuer")]
pub use credential::HttpSignatureIssuer;
pub use credential::SignatureIssuer;
pub use error::{RelayError, VendorError};
pub use event::LifecycleEvent;
pub use protocol::{ConnectInfo, Outcome, StatusSnapshot};
pub use session::{Session, SessionFactory};
