//! Wire types shared with the trust backend, the vendor session, and callers.
//!
//! - Trust backend: [`SignRequest`] / [`SignResponse`] / [`SignData`]
//! - Peer payload: [`CommandPayload`] carried as the text of a [`TextMessage`]
//! - Caller-facing shapes: [`Outcome`], [`ConnectInfo`], [`StatusSnapshot`]

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status code the trust backend uses to signal success.
pub const SIGN_OK: i64 = 1;

/// Payload discriminator expected by the peer.
pub const GAME_COMMAND_CODE: &str = "game_cmd";

/// Message of the [`Outcome`] returned when a command is deferred.
pub const QUEUED_MESSAGE: &str = "queued";

/// Opaque receipt returned by the vendor after a successful send.
pub type DeliveryReceipt = serde_json::Value;

// ── Trust backend ───────────────────────────────────────────────────

/// Body of `POST <trust-base>/user/game_sign`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignRequest {
    /// Prefixed session user id.
    pub uid: String,
    /// Caller-supplied auth token.
    pub token: String,
}

/// Envelope returned by the trust backend.
///
/// Every field is optional on the wire; [`crate::credential::interpret_sign_response`]
/// decides what counts as success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignResponse {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Signature material issued for one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignData {
    #[serde(rename = "appid")]
    pub app_id: AppId,
    #[serde(rename = "sign")]
    pub signature: String,
}

/// Application identifier on the messaging backend.
///
/// The trust backend sends it either as a JSON number or as a string; the
/// backend representation is kept so it round-trips to callers unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AppId {
    Number(u64),
    Text(String),
}

impl AppId {
    /// Numeric form handed to the vendor SDK, if the id is numeric.
    pub fn as_sdk_app_id(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ── Vendor session ──────────────────────────────────────────────────

/// Conversation kind of an outgoing message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ConversationType {
    /// One-to-one conversation.
    #[default]
    #[serde(rename = "C2C")]
    C2c,
    /// Group conversation.
    #[serde(rename = "GROUP")]
    Group,
}

/// Vendor SDK log verbosity, most verbose first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Verbose = 0,
    Release = 1,
    Warning = 2,
    Error = 3,
    Off = 4,
}

/// Text payload of a [`TextMessage`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextPayload {
    pub text: String,
}

/// A point-to-point text message ready to hand to
/// [`Session::send_message`](crate::Session::send_message).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    pub to: String,
    pub conversation_type: ConversationType,
    pub payload: TextPayload,
}

/// Application payload relayed to the peer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandPayload {
    pub code: String,
    pub id: String,
    pub token: String,
}

impl CommandPayload {
    /// Build a `game_cmd` payload.
    pub fn game_command(id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            code: GAME_COMMAND_CODE.to_string(),
            id: id.into(),
            token: token.into(),
        }
    }
}

// ── Caller-facing shapes ────────────────────────────────────────────

/// Structured result of a public operation: `{success, message, data?}`.
///
/// A deferred send is reported as `success == false` with the message
/// [`QUEUED_MESSAGE`]; use [`Outcome::is_queued`] to tell it apart from a
/// real failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outcome<T> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Outcome<T> {
    /// A successful outcome carrying `data`.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    /// A failed outcome.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// The outcome of a command deferred until the session is open.
    pub fn queued() -> Self {
        Self::failed(QUEUED_MESSAGE)
    }

    /// Returns `true` if this outcome reports a deferred command.
    pub fn is_queued(&self) -> bool {
        !self.success && self.message == QUEUED_MESSAGE
    }
}

/// Identity of an established session, returned by a successful connect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectInfo {
    /// Prefixed id used on the messaging backend.
    #[serde(rename = "uid")]
    pub session_user_id: String,
    /// Unprefixed id supplied by the caller.
    #[serde(rename = "userId")]
    pub local_user_id: String,
    #[serde(rename = "appId")]
    pub app_id: AppId,
}

/// Point-in-time view of a [`SessionClient`](crate::SessionClient).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub connected: bool,
    pub session_user_id: Option<String>,
    pub local_user_id: Option<String>,
    pub app_id: Option<AppId>,
    pub queue_length: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn app_id_accepts_string_or_number() {
        let text: SignData = serde_json::from_value(json!({"appid": "100", "sign": "s"})).unwrap();
        assert_eq!(text.app_id, AppId::Text("100".into()));
        assert_eq!(text.app_id.as_sdk_app_id(), Some(100));

        let number: SignData =
            serde_json::from_value(json!({"appid": 1400000000u64, "sign": "s"})).unwrap();
        assert_eq!(number.app_id, AppId::Number(1_400_000_000));
        assert_eq!(number.app_id.to_string(), "1400000000");
    }

    #[test]
    fn non_numeric_app_id_has_no_sdk_form() {
        assert_eq!(AppId::Text("abc".into()).as_sdk_app_id(), None);
    }

    #[test]
    fn command_payload_wire_shape() {
        let payload = CommandPayload::game_command("cmd1", "tok");
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"code": "game_cmd", "id": "cmd1", "token": "tok"})
        );
    }

    #[test]
    fn outcome_omits_absent_data() {
        let queued: Outcome<ConnectInfo> = Outcome::queued();
        assert!(queued.is_queued());
        assert_eq!(
            serde_json::to_value(&queued).unwrap(),
            json!({"success": false, "message": "queued"})
        );
    }

    #[test]
    fn connect_info_uses_caller_field_names() {
        let info = ConnectInfo {
            session_user_id: "game_u1".into(),
            local_user_id: "u1".into(),
            app_id: AppId::Text("100".into()),
        };
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"uid": "game_u1", "userId": "u1", "appId": "100"})
        );
    }

    #[test]
    fn status_snapshot_is_camel_case() {
        let status = StatusSnapshot {
            connected: false,
            session_user_id: None,
            local_user_id: None,
            app_id: None,
            queue_length: 2,
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["queueLength"], json!(2));
        assert_eq!(value["sessionUserId"], json!(null));
    }

    #[test]
    fn text_message_wire_shape() {
        let msg = TextMessage {
            to: "u1".into(),
            conversation_type: ConversationType::C2c,
            payload: TextPayload { text: "hi".into() },
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"to": "u1", "conversationType": "C2C", "payload": {"text": "hi"}})
        );
    }
}
