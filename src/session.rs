//! Vendor session capability.
//!
//! The messaging SDK is a black box to this crate: it already handles the
//! transport, wire protocol, and delivery guarantees. [`SessionFactory`] and
//! [`Session`] describe the small surface the client relies on, so any SDK
//! binding (or the in-process [`loopback`](crate::sessions::loopback) session)
//! can be plugged in.
//!
//! # Implementing a Session
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use game_command_relay::error::VendorError;
//! use game_command_relay::event::EventSink;
//! use game_command_relay::protocol::{DeliveryReceipt, LogLevel, TextMessage};
//! use game_command_relay::session::{Session, SessionFactory, SessionOptions};
//!
//! struct MySdk;
//!
//! impl SessionFactory for MySdk {
//!     fn create(&self, _options: SessionOptions) -> Result<Arc<dyn Session>, VendorError> {
//!         Ok(Arc::new(MySession))
//!     }
//! }
//!
//! struct MySession;
//!
//! #[async_trait]
//! impl Session for MySession {
//!     fn set_log_level(&self, _level: LogLevel) {}
//!     fn subscribe(&self, _sink: EventSink) {}
//!     async fn login(&self, _user_id: &str, _user_sig: &str) -> Result<(), VendorError> {
//!         Ok(())
//!     }
//!     async fn logout(&self) -> Result<(), VendorError> {
//!         Ok(())
//!     }
//!     async fn send_message(&self, _message: TextMessage) -> Result<DeliveryReceipt, VendorError> {
//!         Ok(serde_json::Value::Null)
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VendorError;
use crate::event::EventSink;
use crate::protocol::{ConversationType, DeliveryReceipt, LogLevel, TextMessage, TextPayload};

/// Options used to instantiate a vendor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Numeric application id issued alongside the signature.
    pub sdk_app_id: u64,
}

/// Creates vendor sessions.
pub trait SessionFactory: Send + Sync + 'static {
    /// Instantiate a new, not-yet-logged-in session.
    ///
    /// # Errors
    ///
    /// Returns a [`VendorError`] if the SDK refuses the options.
    fn create(&self, options: SessionOptions) -> Result<Arc<dyn Session>, VendorError>;
}

/// One vendor messaging session.
///
/// All methods take `&self`; implementations synchronize internally. The
/// client holds the session behind an [`Arc`] and never awaits a call while
/// holding its own locks.
#[async_trait]
pub trait Session: Send + Sync {
    /// Set the SDK's diagnostic verbosity.
    fn set_log_level(&self, level: LogLevel);

    /// Register the sink that receives every lifecycle notification.
    ///
    /// Called before [`login`](Session::login) so early events are not lost.
    fn subscribe(&self, sink: EventSink);

    /// Open the session.
    ///
    /// # Errors
    ///
    /// Returns a [`VendorError`] if the credentials are rejected or the
    /// session cannot be established.
    async fn login(&self, user_id: &str, user_sig: &str) -> Result<(), VendorError>;

    /// Close the session.
    ///
    /// # Errors
    ///
    /// Returns a [`VendorError`] if the SDK reports a logout failure.
    async fn logout(&self) -> Result<(), VendorError>;

    /// Build a text message addressed to `to`.
    fn create_text_message(
        &self,
        to: &str,
        conversation_type: ConversationType,
        text: String,
    ) -> TextMessage {
        TextMessage {
            to: to.to_string(),
            conversation_type,
            payload: TextPayload { text },
        }
    }

    /// Deliver a message and return the vendor receipt.
    ///
    /// # Errors
    ///
    /// Returns a [`VendorError`] if the message was not accepted.
    async fn send_message(&self, message: TextMessage) -> Result<DeliveryReceipt, VendorError>;
}
