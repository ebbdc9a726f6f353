//! Error types for the game command relay.

use thiserror::Error;

/// Errors that can occur while acquiring credentials, opening a session, or
/// delivering a command.
///
/// These never cross the public boundary of
/// [`SessionClient::connect`](crate::SessionClient::connect) or
/// [`SessionClient::send_command`](crate::SessionClient::send_command); both
/// convert them into a failed [`Outcome`](crate::Outcome).
#[derive(Debug, Error)]
pub enum RelayError {
    /// The trust backend was unreachable, answered with something undecodable,
    /// or reported a non-ok status.
    #[error("credential error: {message}")]
    Credential {
        /// Backend-provided message, or a generic fallback.
        message: String,
    },

    /// The vendor session could not be created or rejected the login.
    #[error("session open error: {message}")]
    SessionOpen {
        /// Vendor-provided message.
        message: String,
    },

    /// A command could not be delivered over the open session.
    #[error("delivery error: {message}")]
    Delivery {
        /// Vendor-provided message.
        message: String,
    },

    /// A bounded step did not complete within its configured limit.
    #[error("{operation} timed out")]
    Timeout {
        /// The step that expired (e.g. `"login"`).
        operation: &'static str,
    },

    /// Attempted a send without an open session handle.
    #[error("not connected to messaging session")]
    NotConnected,

    /// Failed to serialize a command payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    /// The message shown to callers in a failed [`Outcome`](crate::Outcome).
    ///
    /// Backend and vendor messages are passed through verbatim so a caller sees
    /// exactly what the remote side reported.
    pub fn user_message(&self) -> String {
        match self {
            Self::Credential { message }
            | Self::SessionOpen { message }
            | Self::Delivery { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Failure reported by a vendor session capability call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct VendorError {
    /// Vendor-specific numeric code, when one was reported.
    pub code: Option<i64>,
    /// Human-readable description.
    pub message: String,
}

impl VendorError {
    /// Create a vendor error with no code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Attach a vendor-specific code.
    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

/// A specialized [`Result`] type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
