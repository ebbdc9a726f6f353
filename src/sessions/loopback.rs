//! In-process vendor session that records traffic instead of sending it.
//!
//! [`LoopbackFactory`] implements [`SessionFactory`]; every session it creates
//! shares state with a [`LoopbackController`], which lets a test or demo:
//!
//! - inspect what was created, logged in, and sent (with timestamps),
//! - inject [`LifecycleEvent`]s as if the SDK had emitted them,
//! - script login, send, and logout failures or hangs.
//!
//! ```rust
//! use game_command_relay::sessions::loopback::LoopbackFactory;
//!
//! let (factory, controller) = LoopbackFactory::new();
//! assert!(controller.sent().is_empty());
//! # drop(factory);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::error::VendorError;
use crate::event::{EventSink, LifecycleEvent};
use crate::protocol::{DeliveryReceipt, LogLevel, TextMessage};
use crate::session::{Session, SessionFactory, SessionOptions};

/// A message accepted by a loopback session.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: TextMessage,
    pub at: Instant,
    pub message_id: Uuid,
}

/// How a scripted call should behave.
#[derive(Debug, Clone)]
enum Script {
    Fail(VendorError),
    Hang,
}

#[derive(Default)]
struct Shared {
    created: Vec<SessionOptions>,
    log_levels: Vec<LogLevel>,
    logins: Vec<(String, String)>,
    logouts: usize,
    sent: Vec<SentMessage>,
    sink: Option<EventSink>,
    subscribed_before_login: Vec<bool>,
    login_script: Option<Script>,
    logout_script: Option<Script>,
    /// Per-send scripts, consumed in order; an empty queue means success.
    send_scripts: VecDeque<Option<Script>>,
    ready_on_login: bool,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_script(script: Option<Script>) -> Result<(), VendorError> {
    match script {
        None => Ok(()),
        Some(Script::Fail(err)) => Err(err),
        Some(Script::Hang) => std::future::pending().await,
    }
}

/// [`SessionFactory`] producing [`LoopbackSession`]s.
#[derive(Clone)]
pub struct LoopbackFactory {
    shared: Arc<Mutex<Shared>>,
}

impl LoopbackFactory {
    /// Create a factory together with the controller observing it.
    pub fn new() -> (Self, LoopbackController) {
        let shared = Arc::new(Mutex::new(Shared {
            ready_on_login: true,
            ..Shared::default()
        }));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            LoopbackController { shared },
        )
    }
}

impl SessionFactory for LoopbackFactory {
    fn create(&self, options: SessionOptions) -> Result<Arc<dyn Session>, VendorError> {
        debug!(sdk_app_id = options.sdk_app_id, "loopback session created");
        let mut shared = lock(&self.shared);
        shared.created.push(options);
        // A fresh session has no subscriber until `subscribe` is called.
        shared.sink = None;
        Ok(Arc::new(LoopbackSession {
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// A session that records calls into the shared loopback state.
pub struct LoopbackSession {
    shared: Arc<Mutex<Shared>>,
}

#[async_trait]
impl Session for LoopbackSession {
    fn set_log_level(&self, level: LogLevel) {
        lock(&self.shared).log_levels.push(level);
    }

    fn subscribe(&self, sink: EventSink) {
        lock(&self.shared).sink = Some(sink);
    }

    async fn login(&self, user_id: &str, user_sig: &str) -> Result<(), VendorError> {
        let script = {
            let mut shared = lock(&self.shared);
            let subscribed = shared.sink.is_some();
            shared.subscribed_before_login.push(subscribed);
            shared.logins.push((user_id.to_string(), user_sig.to_string()));
            shared.login_script.clone()
        };
        run_script(script).await?;

        let shared = lock(&self.shared);
        if shared.ready_on_login {
            if let Some(sink) = &shared.sink {
                let _ = sink.send(LifecycleEvent::SdkReady);
            }
        }
        Ok(())
    }

    async fn logout(&self) -> Result<(), VendorError> {
        let script = {
            let mut shared = lock(&self.shared);
            shared.logouts += 1;
            shared.logout_script.clone()
        };
        run_script(script).await
    }

    async fn send_message(&self, message: TextMessage) -> Result<DeliveryReceipt, VendorError> {
        let at = Instant::now();
        let script = lock(&self.shared).send_scripts.pop_front().flatten();
        run_script(script).await?;

        let message_id = Uuid::new_v4();
        let receipt = json!({
            "message": {
                "ID": message_id.to_string(),
                "to": message.to,
                "conversationType": message.conversation_type,
            }
        });
        lock(&self.shared).sent.push(SentMessage {
            message,
            at,
            message_id,
        });
        Ok(receipt)
    }
}

/// Observer and driver for the sessions of a [`LoopbackFactory`].
#[derive(Clone)]
pub struct LoopbackController {
    shared: Arc<Mutex<Shared>>,
}

impl LoopbackController {
    /// Options of every session created so far.
    pub fn created(&self) -> Vec<SessionOptions> {
        lock(&self.shared).created.clone()
    }

    /// Log levels set on sessions, in call order.
    pub fn log_levels(&self) -> Vec<LogLevel> {
        lock(&self.shared).log_levels.clone()
    }

    /// `(user_id, user_sig)` of every login attempt.
    pub fn logins(&self) -> Vec<(String, String)> {
        lock(&self.shared).logins.clone()
    }

    /// For each login attempt, whether a subscriber was registered first.
    pub fn subscribed_before_login(&self) -> Vec<bool> {
        lock(&self.shared).subscribed_before_login.clone()
    }

    /// Number of logout calls.
    pub fn logouts(&self) -> usize {
        lock(&self.shared).logouts
    }

    /// Every accepted message, in send order.
    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.shared).sent.clone()
    }

    /// Texts of every accepted message, in send order.
    pub fn sent_texts(&self) -> Vec<String> {
        lock(&self.shared)
            .sent
            .iter()
            .map(|sent| sent.message.payload.text.clone())
            .collect()
    }

    /// Deliver a lifecycle event to the current subscriber.
    ///
    /// Returns `false` if no session has subscribed or the subscriber is gone.
    pub fn emit(&self, event: LifecycleEvent) -> bool {
        lock(&self.shared)
            .sink
            .as_ref()
            .is_some_and(|sink| sink.send(event).is_ok())
    }

    /// Emit `SdkReady` automatically after each successful login (default on).
    pub fn set_ready_on_login(&self, ready: bool) {
        lock(&self.shared).ready_on_login = ready;
    }

    /// Make every following login fail with `error`.
    pub fn fail_login(&self, error: VendorError) {
        lock(&self.shared).login_script = Some(Script::Fail(error));
    }

    /// Make every following login wait forever.
    pub fn hang_login(&self) {
        lock(&self.shared).login_script = Some(Script::Hang);
    }

    /// Let logins succeed again.
    pub fn accept_login(&self) {
        lock(&self.shared).login_script = None;
    }

    /// Make every following logout fail with `error`.
    pub fn fail_logout(&self, error: VendorError) {
        lock(&self.shared).logout_script = Some(Script::Fail(error));
    }

    /// Make every following logout wait forever.
    pub fn hang_logout(&self) {
        lock(&self.shared).logout_script = Some(Script::Hang);
    }

    /// Script the next sends: `None` succeeds, `Some(err)` fails.
    pub fn script_sends(&self, outcomes: impl IntoIterator<Item = Option<VendorError>>) {
        lock(&self.shared)
            .send_scripts
            .extend(outcomes.into_iter().map(|o| o.map(Script::Fail)));
    }

    /// Make the next send wait forever.
    pub fn hang_next_send(&self) {
        lock(&self.shared).send_scripts.push_back(Some(Script::Hang));
    }
}
