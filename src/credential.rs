//! Credential acquisition from the trust-issuing backend.
//!
//! The backend exchanges a prefixed user id and an opaque token for the
//! application id and a short-lived signature needed to open a session:
//!
//! ```text
//! POST <trust-base>/user/game_sign   {"uid": "game_u1", "token": "…"}
//!   → {"code": 1, "data": {"appid": "1400000000", "sign": "…"}}
//!   → {"code": 0, "msg": "bad token"}
//! ```
//!
//! There is no retry here; retrying is the caller's decision.

use async_trait::async_trait;

use crate::error::{RelayError, Result};
use crate::protocol::{SignData, SignResponse, SIGN_OK};

/// Fallback message when the backend gives no reason.
pub const SIGN_FAILED_MESSAGE: &str = "failed to acquire session signature";

/// Path of the signing endpoint, relative to the trust base URL.
pub const SIGN_PATH: &str = "/user/game_sign";

/// Issues session signatures.
#[async_trait]
pub trait SignatureIssuer: Send + Sync + 'static {
    /// Request a signature for `session_user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Credential`] on any failure.
    async fn request_signature(&self, session_user_id: &str, auth_token: &str)
        -> Result<SignData>;
}

/// Decide whether a raw trust backend body is a usable signature.
///
/// Success requires `code == 1` and a `data` object that decodes to
/// [`SignData`]. Everything else is a [`RelayError::Credential`] carrying the
/// backend's `msg` when present.
pub fn interpret_sign_response(body: &[u8]) -> Result<SignData> {
    let response: SignResponse =
        serde_json::from_slice(body).map_err(|e| RelayError::Credential {
            message: format!("malformed signature response: {e}"),
        })?;

    let ok = response
        .code
        .as_ref()
        .and_then(serde_json::Value::as_i64)
        .is_some_and(|code| code == SIGN_OK);

    let data = if ok {
        response
            .data
            .filter(|data| !data.is_null())
            .and_then(|data| serde_json::from_value::<SignData>(data).ok())
    } else {
        None
    };

    data.ok_or_else(|| RelayError::Credential {
        message: response
            .msg
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| SIGN_FAILED_MESSAGE.to_string()),
    })
}

/// Shorten a token for logs, keeping a 10-character prefix.
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(10).collect();
    if prefix.len() < token.len() {
        format!("{prefix}...")
    } else {
        prefix
    }
}

#[cfg(feature = "http-issuer")]
pub use http::HttpSignatureIssuer;

#[cfg(feature = "http-issuer")]
mod http {
    use tracing::{debug, warn};

    use super::*;
    use crate::protocol::SignRequest;

    /// [`SignatureIssuer`] backed by the trust backend's HTTP API.
    #[derive(Debug, Clone)]
    pub struct HttpSignatureIssuer {
        client: reqwest::Client,
        endpoint: String,
    }

    impl HttpSignatureIssuer {
        /// Create an issuer for `base_url` (e.g. `https://host/api.php`).
        ///
        /// # Errors
        ///
        /// Returns [`RelayError::Credential`] if the HTTP client cannot be
        /// built.
        pub fn new(base_url: &str) -> Result<Self> {
            let client = reqwest::Client::builder()
                .user_agent(concat!("game-command-relay/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| RelayError::Credential {
                    message: format!("failed to build HTTP client: {e}"),
                })?;
            Ok(Self::with_client(base_url, client))
        }

        /// Create an issuer reusing an existing `reqwest` client.
        pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
            Self {
                client,
                endpoint: format!("{}{SIGN_PATH}", base_url.trim_end_matches('/')),
            }
        }

        /// Full URL of the signing endpoint.
        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    #[async_trait]
    impl SignatureIssuer for HttpSignatureIssuer {
        async fn request_signature(
            &self,
            session_user_id: &str,
            auth_token: &str,
        ) -> Result<SignData> {
            if auth_token.is_empty() {
                return Err(RelayError::Credential {
                    message: "auth token must not be empty".into(),
                });
            }

            debug!(
                uid = %session_user_id,
                token = %redact_token(auth_token),
                endpoint = %self.endpoint,
                "requesting session signature"
            );

            let request = SignRequest {
                uid: session_user_id.to_string(),
                token: auth_token.to_string(),
            };

            // The backend reports failures in the body, so the HTTP status is
            // not consulted.
            let body = self
                .client
                .post(&self.endpoint)
                .json(&request)
                .send()
                .await
                .map_err(|e| RelayError::Credential {
                    message: e.to_string(),
                })?
                .bytes()
                .await
                .map_err(|e| RelayError::Credential {
                    message: e.to_string(),
                })?;

            interpret_sign_response(&body).inspect_err(|e| {
                warn!(uid = %session_user_id, "signature request failed: {e}");
            })
        }
    }
}
