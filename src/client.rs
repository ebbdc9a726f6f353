//! Messaging session client.
//!
//! [`SessionClient`] owns one vendor session at a time. It acquires a
//! signature, opens the session, listens to its lifecycle notifications on a
//! background task, and relays game commands to the peer. Commands submitted
//! while no session is open are queued and replayed in order, with pacing,
//! right after the next successful [`connect`](SessionClient::connect).
//!
//! # Example
//!
//! ```rust,ignore
//! let (factory, _controller) = LoopbackFactory::new();
//! let client = SessionClient::new(SessionClientConfig::default(), factory)?;
//!
//! // Queued: no session yet.
//! assert!(client.send_command("cmd1").await.is_queued());
//!
//! let outcome = client.connect("u1", "token").await;
//! if outcome.success {
//!     // cmd1 has been delivered by now.
//!     client.send_command("cmd2").await;
//! }
//! client.disconnect().await;
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::credential::{redact_token, SignatureIssuer};
use crate::error::{RelayError, Result};
use crate::event::LifecycleEvent;
use crate::protocol::{
    AppId, CommandPayload, ConnectInfo, ConversationType, DeliveryReceipt, LogLevel, Outcome,
    SignData, StatusSnapshot,
};
use crate::session::{Session, SessionFactory, SessionOptions};

/// Default trust backend base URL.
pub const DEFAULT_TRUST_BASE_URL: &str = "https://suo.jiushu1234.com/api.php";

/// Default namespace prefix applied to the local user id.
pub const DEFAULT_USER_ID_PREFIX: &str = "game_";

/// Default delay between two queued commands during a drain.
pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_millis(100);

/// Default limit for the credential request, login, and send steps.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default limit for the best-effort logout.
pub const DEFAULT_LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Vendor log level applied to every session.
pub const SESSION_LOG_LEVEL: LogLevel = LogLevel::Release;

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`SessionClient`].
///
/// # Example
///
/// ```
/// use game_command_relay::client::SessionClientConfig;
/// use std::time::Duration;
///
/// let config = SessionClientConfig::new("https://trust.example.com/api.php")
///     .with_pacing_interval(Duration::from_millis(250))
///     .with_login_timeout(None);
/// assert_eq!(config.user_id_prefix, "game_");
/// assert!(config.login_timeout.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct SessionClientConfig {
    /// Base URL of the trust-issuing backend.
    pub trust_base_url: String,
    /// Namespace prefix turning a local user id into a session user id.
    pub user_id_prefix: String,
    /// Delay after each command sent during a queue drain.
    ///
    /// Defaults to **100 ms**.
    pub pacing_interval: Duration,
    /// Limit for the signature request. `None` waits indefinitely.
    pub credential_timeout: Option<Duration>,
    /// Limit for the vendor login. `None` waits indefinitely.
    pub login_timeout: Option<Duration>,
    /// Limit for each vendor send. `None` waits indefinitely.
    pub send_timeout: Option<Duration>,
    /// Limit for the best-effort logout. `None` waits indefinitely.
    pub logout_timeout: Option<Duration>,
}

impl SessionClientConfig {
    /// Create a configuration for the given trust backend with default values.
    pub fn new(trust_base_url: impl Into<String>) -> Self {
        Self {
            trust_base_url: trust_base_url.into(),
            user_id_prefix: DEFAULT_USER_ID_PREFIX.to_string(),
            pacing_interval: DEFAULT_PACING_INTERVAL,
            credential_timeout: Some(DEFAULT_STEP_TIMEOUT),
            login_timeout: Some(DEFAULT_STEP_TIMEOUT),
            send_timeout: Some(DEFAULT_STEP_TIMEOUT),
            logout_timeout: Some(DEFAULT_LOGOUT_TIMEOUT),
        }
    }

    /// Set the user id namespace prefix.
    #[must_use]
    pub fn with_user_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_id_prefix = prefix.into();
        self
    }

    /// Set the delay between queued commands during a drain.
    #[must_use]
    pub fn with_pacing_interval(mut self, interval: Duration) -> Self {
        self.pacing_interval = interval;
        self
    }

    /// Set the signature request limit.
    #[must_use]
    pub fn with_credential_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.credential_timeout = timeout;
        self
    }

    /// Set the login limit.
    #[must_use]
    pub fn with_login_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Set the per-send limit.
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the logout limit.
    #[must_use]
    pub fn with_logout_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.logout_timeout = timeout;
        self
    }
}

impl Default for SessionClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TRUST_BASE_URL)
    }
}

// ── Shared state ────────────────────────────────────────────────────

/// Caller identity and the app id issued for it.
///
/// The signature is only needed for the login call and is not retained.
#[derive(Debug, Default)]
struct Identity {
    local_user_id: Option<String>,
    session_user_id: Option<String>,
    auth_token: Option<String>,
    app_id: Option<AppId>,
}

/// State shared between the client handle and the lifecycle listener.
struct ClientState {
    connected: AtomicBool,
    identity: Mutex<Identity>,
    pending: Mutex<VecDeque<String>>,
    session: Mutex<Option<Arc<dyn Session>>>,
}

impl ClientState {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            identity: Mutex::new(Identity::default()),
            pending: Mutex::new(VecDeque::new()),
            session: Mutex::new(None),
        }
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Messaging session client.
///
/// Construct one per application and share it (e.g. in an [`Arc`]) with the
/// modules that relay commands. All methods take `&self`.
pub struct SessionClient {
    config: SessionClientConfig,
    issuer: Arc<dyn SignatureIssuer>,
    factory: Arc<dyn SessionFactory>,
    state: Arc<ClientState>,
    /// Lifecycle listener of the current session.
    listener: Mutex<Option<JoinHandle<()>>>,
    /// Serializes connect attempts.
    connect_lock: Mutex<()>,
}

impl SessionClient {
    /// Create a client that obtains signatures from `config.trust_base_url`
    /// over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Credential`] if the HTTP client cannot be built.
    #[cfg(feature = "http-issuer")]
    pub fn new(config: SessionClientConfig, factory: impl SessionFactory) -> Result<Self> {
        let issuer = crate::credential::HttpSignatureIssuer::new(&config.trust_base_url)?;
        Ok(Self::with_issuer(config, issuer, factory))
    }

    /// Create a client with an explicit signature issuer.
    pub fn with_issuer(
        config: SessionClientConfig,
        issuer: impl SignatureIssuer,
        factory: impl SessionFactory,
    ) -> Self {
        Self {
            config,
            issuer: Arc::new(issuer),
            factory: Arc::new(factory),
            state: Arc::new(ClientState::new()),
            listener: Mutex::new(None),
            connect_lock: Mutex::new(()),
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &SessionClientConfig {
        &self.config
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Acquire a signature and open a session for `local_user_id`.
    ///
    /// Never fails with an error: any failure is reported as an [`Outcome`]
    /// with `success == false`, `connected` is cleared, and no session is
    /// kept. On success the pending queue is drained before returning.
    pub async fn connect(&self, local_user_id: &str, auth_token: &str) -> Outcome<ConnectInfo> {
        let _guard = self.connect_lock.lock().await;

        info!(
            user_id = %local_user_id,
            token = %redact_token(auth_token),
            "connecting messaging session"
        );

        match self.open_session(local_user_id, auth_token).await {
            Ok(info) => {
                info!(uid = %info.session_user_id, app_id = %info.app_id, "messaging session open");
                self.flush_message_queue().await;
                Outcome::ok("connected", info)
            }
            Err(e) => {
                error!("messaging session connect failed: {e}");
                self.state.connected.store(false, Ordering::Release);
                self.stop_listener().await;
                *self.state.session.lock().await = None;
                Outcome::failed(e.user_message())
            }
        }
    }

    /// Close the current session.
    ///
    /// Logout is best-effort: a failure or timeout is logged and teardown
    /// proceeds. Queued commands are kept for the next connect.
    pub async fn disconnect(&self) {
        // Queue new commands while logout is in flight.
        self.state.connected.store(false, Ordering::Release);
        let session = self.state.session.lock().await.take();
        self.stop_listener().await;

        if let Some(session) = session {
            match with_timeout(self.config.logout_timeout, "logout", session.logout()).await {
                Ok(Ok(())) => info!("messaging session closed"),
                Ok(Err(e)) => warn!("logout failed: {e}"),
                Err(e) => warn!("logout failed: {e}"),
            }
        }

        self.state.connected.store(false, Ordering::Release);
    }

    // ── Dispatch ────────────────────────────────────────────────────

    /// Relay `command_id` to the peer, or queue it if no session is open.
    ///
    /// A queued command yields [`Outcome::queued`]. A failed send is reported
    /// and not re-queued.
    pub async fn send_command(&self, command_id: &str) -> Outcome<DeliveryReceipt> {
        if !self.is_connected() {
            let mut pending = self.state.pending.lock().await;
            pending.push_back(command_id.to_string());
            warn!(
                command_id,
                queue_length = pending.len(),
                "not connected, command queued"
            );
            return Outcome::queued();
        }

        match self.deliver(command_id).await {
            Ok(receipt) => Outcome::ok("command sent", receipt),
            Err(e) => {
                error!(command_id, "command delivery failed: {e}");
                Outcome::failed(e.user_message())
            }
        }
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Returns `true` if commands are currently sent immediately.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// Snapshot of connection state, identity, and queue length.
    pub async fn status(&self) -> StatusSnapshot {
        let identity = self.state.identity.lock().await;
        let queue_length = self.state.pending.lock().await.len();
        StatusSnapshot {
            connected: self.is_connected(),
            session_user_id: identity.session_user_id.clone(),
            local_user_id: identity.local_user_id.clone(),
            app_id: identity.app_id.clone(),
            queue_length,
        }
    }

    /// Command ids waiting for a session, oldest first.
    pub async fn pending_commands(&self) -> Vec<String> {
        self.state.pending.lock().await.iter().cloned().collect()
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Steps 1–7 of a connect; the caller turns errors into an outcome.
    async fn open_session(&self, local_user_id: &str, auth_token: &str) -> Result<ConnectInfo> {
        let session_user_id = format!("{}{local_user_id}", self.config.user_id_prefix);
        // A previous session must not send with the new identity.
        self.state.connected.store(false, Ordering::Release);
        {
            let mut identity = self.state.identity.lock().await;
            identity.local_user_id = Some(local_user_id.to_string());
            identity.session_user_id = Some(session_user_id.clone());
            identity.auth_token = Some(auth_token.to_string());
            identity.app_id = None;
        }

        if auth_token.is_empty() {
            return Err(RelayError::Credential {
                message: "auth token must not be empty".into(),
            });
        }

        let SignData { app_id, signature } = with_timeout(
            self.config.credential_timeout,
            "signature request",
            self.issuer.request_signature(&session_user_id, auth_token),
        )
        .await??;
        debug!(app_id = %app_id, "signature acquired");
        self.state.identity.lock().await.app_id = Some(app_id.clone());

        let sdk_app_id = app_id.as_sdk_app_id().ok_or_else(|| RelayError::SessionOpen {
            message: format!("app id {app_id} is not numeric"),
        })?;
        let session = self
            .factory
            .create(SessionOptions { sdk_app_id })
            .map_err(|e| RelayError::SessionOpen { message: e.message })?;
        session.set_log_level(SESSION_LOG_LEVEL);

        // Subscribe before login so early notifications are not missed.
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        session.subscribe(event_tx);
        self.replace_listener(tokio::spawn(lifecycle_loop(
            event_rx,
            Arc::clone(&self.state),
        )))
        .await;

        with_timeout(
            self.config.login_timeout,
            "login",
            session.login(&session_user_id, &signature),
        )
        .await?
        .map_err(|e| RelayError::SessionOpen { message: e.message })?;

        let previous = self.state.session.lock().await.replace(session);
        if previous.is_some() {
            debug!("replaced previous messaging session");
        }
        self.state.connected.store(true, Ordering::Release);

        Ok(ConnectInfo {
            session_user_id,
            local_user_id: local_user_id.to_string(),
            app_id,
        })
    }

    /// Send one command over the open session.
    async fn deliver(&self, command_id: &str) -> Result<DeliveryReceipt> {
        let session = self
            .state
            .session
            .lock()
            .await
            .clone()
            .ok_or(RelayError::NotConnected)?;
        let (to, token) = {
            let identity = self.state.identity.lock().await;
            (
                identity.local_user_id.clone().unwrap_or_default(),
                identity.auth_token.clone().unwrap_or_default(),
            )
        };

        let text = serde_json::to_string(&CommandPayload::game_command(command_id, token))?;
        // The peer is addressed without the namespace prefix.
        let message = session.create_text_message(&to, ConversationType::C2c, text);
        let receipt = with_timeout(self.config.send_timeout, "send", session.send_message(message))
            .await?
            .map_err(|e| RelayError::Delivery { message: e.message })?;

        info!(command_id, to = %to, "command sent");
        Ok(receipt)
    }

    /// Replay queued commands once, oldest first, pacing each send.
    ///
    /// The pass covers the commands queued when it starts. It stops early if
    /// the session is lost, leaving the rest queued in order.
    async fn flush_message_queue(&self) {
        let pass = self.state.pending.lock().await.len();
        if pass == 0 {
            return;
        }
        info!(count = pass, "sending queued commands");

        for _ in 0..pass {
            if !self.is_connected() {
                warn!("session lost during drain, keeping remaining commands queued");
                break;
            }
            let Some(command_id) = self.state.pending.lock().await.pop_front() else {
                break;
            };
            // Delivered directly so a downgrade mid-pass cannot move it to the tail.
            match self.deliver(&command_id).await {
                Ok(_) => {}
                Err(RelayError::NotConnected) => {
                    self.state.pending.lock().await.push_front(command_id);
                    warn!("session closed during drain, keeping remaining commands queued");
                    break;
                }
                Err(e) => error!(command_id = %command_id, "queued command delivery failed: {e}"),
            }
            tokio::time::sleep(self.config.pacing_interval).await;
        }
    }

    /// Install a new lifecycle listener, aborting the previous one.
    async fn replace_listener(&self, task: JoinHandle<()>) {
        if let Some(old) = self.listener.lock().await.replace(task) {
            old.abort();
        }
    }

    async fn stop_listener(&self) {
        if let Some(task) = self.listener.lock().await.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("connected", &self.is_connected())
            .field("config", &self.config)
            .finish()
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        if let Some(task) = self.listener.get_mut().take() {
            task.abort();
        }
    }
}

// ── Lifecycle listener ──────────────────────────────────────────────

/// Apply lifecycle notifications until the session drops its sink.
async fn lifecycle_loop(mut events: mpsc::UnboundedReceiver<LifecycleEvent>, state: Arc<ClientState>) {
    debug!("lifecycle listener started");
    while let Some(event) = events.recv().await {
        handle_lifecycle_event(&state, &event);
    }
    debug!("lifecycle listener exited");
}

/// The lifecycle transition table.
fn handle_lifecycle_event(state: &ClientState, event: &LifecycleEvent) {
    if event.downgrades_session() {
        state.connected.store(false, Ordering::Release);
    }
    match event {
        LifecycleEvent::SdkReady => info!("messaging SDK ready"),
        LifecycleEvent::SdkNotReady => warn!("messaging SDK not ready, commands will be queued"),
        LifecycleEvent::KickedOut => warn!("messaging session kicked out, commands will be queued"),
        LifecycleEvent::NetStateChange { state: net_state } => {
            info!(state = %net_state, "network state changed");
        }
        LifecycleEvent::MessageReceived { messages } => {
            debug!(count = messages.len(), "messages received");
        }
        LifecycleEvent::Error { code, message } => {
            error!(code = ?code, "messaging transport error: {message}");
        }
    }
}

/// Await `fut`, bounded by `limit` when one is set.
async fn with_timeout<F: Future>(
    limit: Option<Duration>,
    operation: &'static str,
    fut: F,
) -> Result<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| RelayError::Timeout { operation }),
        None => Ok(fut.await),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::error::VendorError;
    use crate::sessions::loopback::{LoopbackController, LoopbackFactory};
    use async_trait::async_trait;

    /// Issuer that returns a fixed response without network traffic.
    struct StaticIssuer {
        response: std::result::Result<SignData, String>,
    }

    impl StaticIssuer {
        fn ok(app_id: &str, signature: &str) -> Self {
            Self {
                response: Ok(SignData {
                    app_id: AppId::Text(app_id.into()),
                    signature: signature.into(),
                }),
            }
        }

        fn rejecting(message: &str) -> Self {
            Self {
                response: Err(message.into()),
            }
        }
    }

    #[async_trait]
    impl SignatureIssuer for StaticIssuer {
        async fn request_signature(&self, _uid: &str, _token: &str) -> Result<SignData> {
            self.response
                .clone()
                .map_err(|message| RelayError::Credential { message })
        }
    }

    fn client_with(issuer: StaticIssuer) -> (SessionClient, LoopbackController) {
        let (factory, controller) = LoopbackFactory::new();
        let config = SessionClientConfig::new("http://unused.invalid")
            .with_pacing_interval(Duration::from_millis(10));
        (SessionClient::with_issuer(config, issuer, factory), controller)
    }

    #[test]
    fn config_defaults() {
        let config = SessionClientConfig::default();
        assert_eq!(config.trust_base_url, DEFAULT_TRUST_BASE_URL);
        assert_eq!(config.user_id_prefix, "game_");
        assert_eq!(config.pacing_interval, Duration::from_millis(100));
        assert_eq!(config.credential_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.login_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.send_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.logout_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn config_builder_methods() {
        let config = SessionClientConfig::new("http://trust")
            .with_user_id_prefix("p_")
            .with_credential_timeout(None)
            .with_send_timeout(Some(Duration::from_secs(1)))
            .with_logout_timeout(None);
        assert_eq!(config.user_id_prefix, "p_");
        assert!(config.credential_timeout.is_none());
        assert_eq!(config.send_timeout, Some(Duration::from_secs(1)));
        assert!(config.logout_timeout.is_none());
    }

    #[tokio::test]
    async fn status_before_connect_is_empty() {
        let (client, _controller) = client_with(StaticIssuer::ok("100", "s"));
        let status = client.status().await;
        assert!(!status.connected);
        assert!(status.session_user_id.is_none());
        assert!(status.local_user_id.is_none());
        assert!(status.app_id.is_none());
        assert_eq!(status.queue_length, 0);
    }

    #[tokio::test]
    async fn connect_sets_log_level_and_subscribes_first() {
        let (client, controller) = client_with(StaticIssuer::ok("100", "sig"));
        let outcome = client.connect("u1", "tok").await;
        assert!(outcome.success, "{outcome:?}");

        assert_eq!(controller.created()[0].sdk_app_id, 100);
        assert_eq!(controller.log_levels(), vec![LogLevel::Release]);
        assert_eq!(controller.subscribed_before_login(), vec![true]);
        assert_eq!(controller.logins(), vec![("game_u1".into(), "sig".into())]);
    }

    #[tokio::test]
    async fn credential_failure_creates_no_session() {
        let (client, controller) = client_with(StaticIssuer::rejecting("bad token"));
        let outcome = client.connect("u1", "tok").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "bad token");
        assert!(controller.created().is_empty());
        assert!(!client.is_connected());
        assert_eq!(
            client.status().await.session_user_id.as_deref(),
            Some("game_u1")
        );
    }

    #[tokio::test]
    async fn empty_token_is_rejected_before_issuer() {
        let (client, controller) = client_with(StaticIssuer::ok("100", "s"));
        let outcome = client.connect("u1", "").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "auth token must not be empty");
        assert!(controller.created().is_empty());
    }

    #[tokio::test]
    async fn non_numeric_app_id_fails_session_open() {
        let (client, controller) = client_with(StaticIssuer::ok("not-a-number", "s"));
        let outcome = client.connect("u1", "tok").await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("not numeric"));
        assert!(controller.created().is_empty());
    }

    #[tokio::test]
    async fn login_failure_clears_session() {
        let (client, controller) = client_with(StaticIssuer::ok("100", "s"));
        controller.fail_login(VendorError::new("userSig expired").with_code(70001));

        let outcome = client.connect("u1", "tok").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "userSig expired");
        assert!(!client.is_connected());

        // Dispatch falls back to queueing.
        assert!(client.send_command("cmd").await.is_queued());
    }

    #[tokio::test]
    async fn login_timeout_is_reported() {
        let (factory, controller) = LoopbackFactory::new();
        let config = SessionClientConfig::new("http://unused.invalid")
            .with_login_timeout(Some(Duration::from_millis(20)));
        let client = SessionClient::with_issuer(config, StaticIssuer::ok("100", "s"), factory);
        controller.hang_login();

        let outcome = client.connect("u1", "tok").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "login timed out");
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn send_timeout_is_reported_and_not_requeued() {
        let (factory, controller) = LoopbackFactory::new();
        let config = SessionClientConfig::new("http://unused.invalid")
            .with_send_timeout(Some(Duration::from_millis(20)));
        let client = SessionClient::with_issuer(config, StaticIssuer::ok("100", "s"), factory);
        assert!(client.connect("u1", "tok").await.success);

        controller.hang_next_send();
        let outcome = client.send_command("slow").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "send timed out");
        assert_eq!(client.status().await.queue_length, 0);
    }

    #[tokio::test]
    async fn kicked_out_downgrades_to_queueing() {
        let (client, controller) = client_with(StaticIssuer::ok("100", "s"));
        assert!(client.connect("u1", "tok").await.success);

        assert!(controller.emit(LifecycleEvent::KickedOut));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!client.is_connected());
        assert!(client.send_command("after-kick").await.is_queued());
        assert!(controller.sent().is_empty());
    }

    #[tokio::test]
    async fn transport_error_does_not_downgrade() {
        let (client, controller) = client_with(StaticIssuer::ok("100", "s"));
        assert!(client.connect("u1", "tok").await.success);

        controller.emit(LifecycleEvent::Error {
            code: Some(2801),
            message: "request timed out".into(),
        });
        controller.emit(LifecycleEvent::NetStateChange {
            state: "connecting".into(),
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn drain_stops_when_session_is_lost() {
        let (client, controller) = client_with(StaticIssuer::ok("100", "s"));
        for id in ["a", "b", "c"] {
            client.send_command(id).await;
        }
        // The first send succeeds, then the session is reported gone.
        let state = Arc::clone(&client.state);
        let watcher = tokio::spawn(async move {
            loop {
                if !state.pending.lock().await.iter().any(|c| c == "a") {
                    state.connected.store(false, Ordering::Release);
                    break;
                }
                tokio::task::yield_now().await;
            }
        });

        let outcome = client.connect("u1", "tok").await;
        watcher.await.unwrap();
        assert!(outcome.success);
        assert!(controller.sent_texts().len() <= 1);
        assert_eq!(client.pending_commands().await, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn drain_without_session_keeps_queue_order() {
        let (client, controller) = client_with(StaticIssuer::ok("100", "s"));
        for id in ["a", "b"] {
            client.send_command(id).await;
        }
        // Flag still set but the handle already taken, as during teardown.
        client.state.connected.store(true, Ordering::Release);

        client.flush_message_queue().await;

        assert!(controller.sent().is_empty());
        assert_eq!(client.pending_commands().await, vec!["a", "b"]);
    }

    #[test]
    fn config_accessor_returns_construction_config() {
        let (client, _controller) = client_with(StaticIssuer::ok("100", "s"));
        assert_eq!(client.config().trust_base_url, "http://unused.invalid");
        assert_eq!(client.config().pacing_interval, Duration::from_millis(10));
    }

    #[tokio::test]
    async fn reconnect_replaces_listener() {
        let (client, controller) = client_with(StaticIssuer::ok("100", "s"));
        assert!(client.connect("u1", "tok").await.success);
        assert!(client.connect("u1", "tok").await.success);
        assert_eq!(controller.created().len(), 2);

        // Only the second session's sink is live.
        assert!(controller.emit(LifecycleEvent::SdkNotReady));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn handle_lifecycle_event_table() {
        let state = ClientState::new();
        state.connected.store(true, Ordering::Release);

        handle_lifecycle_event(&state, &LifecycleEvent::SdkReady);
        handle_lifecycle_event(
            &state,
            &LifecycleEvent::MessageReceived {
                messages: vec![serde_json::json!({"text": "hi"})],
            },
        );
        assert!(state.connected.load(Ordering::Acquire));

        handle_lifecycle_event(&state, &LifecycleEvent::SdkNotReady);
        assert!(!state.connected.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn with_timeout_none_waits_for_completion() {
        let value = with_timeout(None, "noop", async { 5 }).await.unwrap();
        assert_eq!(value, 5);

        let err = with_timeout(
            Some(Duration::from_millis(5)),
            "stall",
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RelayError::Timeout { operation: "stall" }));
    }
}
