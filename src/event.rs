//! Lifecycle notifications emitted by a vendor session.
//!
//! A [`Session`](crate::Session) pushes [`LifecycleEvent`]s into the
//! [`EventSink`] it was given in [`Session::subscribe`](crate::Session::subscribe).
//! The client applies them through a single exhaustive handler; only
//! [`SdkNotReady`](LifecycleEvent::SdkNotReady) and
//! [`KickedOut`](LifecycleEvent::KickedOut) change client state.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Sender half handed to a session for lifecycle delivery.
pub type EventSink = mpsc::UnboundedSender<LifecycleEvent>;

/// A lifecycle notification from the vendor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The SDK finished initializing and can be used.
    SdkReady,
    /// The SDK is no longer usable (e.g. the signature expired).
    SdkNotReady,
    /// Another login for the same user forced this session out.
    KickedOut,
    /// The underlying network state changed.
    NetStateChange { state: String },
    /// Inbound messages arrived. Inbound processing is out of scope; these are
    /// only logged.
    MessageReceived { messages: Vec<serde_json::Value> },
    /// A transport-level error was reported.
    Error {
        #[serde(default)]
        code: Option<i64>,
        message: String,
    },
}

impl LifecycleEvent {
    /// Returns `true` if this event means the session is definitively lost.
    ///
    /// Transport errors and network changes are transient and never downgrade
    /// the session on their own.
    pub fn downgrades_session(&self) -> bool {
        match self {
            Self::SdkNotReady | Self::KickedOut => true,
            Self::SdkReady
            | Self::NetStateChange { .. }
            | Self::MessageReceived { .. }
            | Self::Error { .. } => false,
        }
    }

    /// Short, stable name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SdkReady => "sdk_ready",
            Self::SdkNotReady => "sdk_not_ready",
            Self::KickedOut => "kicked_out",
            Self::NetStateChange { .. } => "net_state_change",
            Self::MessageReceived { .. } => "message_received",
            Self::Error { .. } => "error",
        }
    }
}
