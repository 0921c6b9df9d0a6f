//! Live transcription WebSocket client
//!
//! Manages the WebSocket connection lifecycle for streaming transcription.
//!
//! # Connection Flow
//!
//! 1. `connect()` - Validate credential and quota, open the transport, wait
//!    for the open signal
//! 2. `send_audio()` - Stream binary audio frames (non-blocking, warn-and-drop
//!    when the transport is closed)
//! 3. Registered callbacks receive transcripts, errors, and connection-state
//!    transitions
//! 4. `disconnect()` - Clean shutdown with a normal-closure code
//!
//! # Reconnection Strategy
//!
//! Unexpected closes (code != 1000, not a manual disconnect) reconnect with
//! exponential backoff: `min(base * 2^(n-1), cap)`, sequential attempts,
//! bounded by `max_reconnect_attempts`. Exhausting the cap reports a terminal
//! `MAX_RECONNECT_ATTEMPTS` error and stops. Manual disconnects and normal
//! closes never reconnect.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        handshake::client::Request,
        http::HeaderValue,
        protocol::{frame::coding::CloseCode, CloseFrame},
        Error as WsError, Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::credentials::{self, CredentialStore};
use crate::error::{classify_close, codes, VoiceError};
use crate::usage::{SessionUsage, UsageTracker};

use super::protocol::{
    ControlMessage, ServerMessage, SessionConfig, SessionConfigUpdate, TranscriptEvent,
    DEFAULT_ENDPOINT,
};

/// Normal-closure WebSocket code; anything else is an unexpected close.
const NORMAL_CLOSE: u16 = 1000;

/// Synthesized close code when the transport drops without a close frame.
const ABNORMAL_CLOSE: u16 = 1006;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
type ConnectResult = Result<(), VoiceError>;

type TranscriptCallback = Arc<dyn Fn(TranscriptEvent) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(VoiceError) + Send + Sync>;
type StateCallback = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Transport lifecycle state, owned exclusively by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables for one client instance.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Streaming endpoint URL, without query parameters
    pub endpoint: String,
    /// Abort `connect()` if the transport has not opened within this time
    pub connect_timeout: Duration,
    /// Pause between the transport open signal and `connect()` resolving.
    /// Empirical settle window so the first send never races the open.
    pub settle_delay: Duration,
    /// Reconnections per outage before the terminal error
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff (doubles each attempt)
    pub reconnect_base_delay: Duration,
    /// Backoff ceiling
    pub reconnect_max_delay: Duration,
    /// Interval between keep-alive frames
    pub keepalive_interval: Duration,
    /// Feature tag attached to usage reports
    pub feature_tag: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(50),
            max_reconnect_attempts: 3,
            reconnect_base_delay: Duration::from_millis(1000),
            reconnect_max_delay: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(8),
            feature_tag: "live_dictation".to_string(),
        }
    }
}

/// Backoff delay for the n-th reconnection attempt: `min(base * 2^(n-1), cap)`.
fn reconnect_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let factor = 1u32 << exp;
    (base * factor).min(cap)
}

fn classify_connect_error(err: WsError) -> VoiceError {
    match &err {
        WsError::Io(_) => VoiceError::network(format!("connection failed: {}", err)),
        WsError::Http(response) => {
            let status = response.status().as_u16();
            if status == 401 || status == 403 {
                VoiceError::connection(
                    format!("server rejected credentials (status {})", status),
                    codes::AUTH_FAILED,
                )
            } else {
                VoiceError::unknown(format!("handshake failed with status {}", status), None)
            }
        }
        _ => VoiceError::unknown(format!("connection failed: {}", err), None),
    }
}

enum ConnectTarget {
    Request(Request),
    Url(String),
}

/// Primary path: token in an Authorization header. If the request cannot be
/// built that way, fall back to embedding the token in the URL.
fn build_connect_target(url: &str, key: &str) -> ConnectTarget {
    let request = url.into_client_request();
    let header = HeaderValue::from_str(&format!("Token {}", key));
    match (request, header) {
        (Ok(mut request), Ok(value)) => {
            request.headers_mut().insert("Authorization", value);
            ConnectTarget::Request(request)
        }
        _ => {
            log::warn!("LiveClient: header auth unavailable, falling back to URL token");
            ConnectTarget::Url(format!("{}&token={}", url, key))
        }
    }
}

/// Bookkeeping for one open transport.
struct SessionHandle {
    id: Uuid,
    opened_at: Instant,
    started_at: chrono::DateTime<chrono::Utc>,
    model: String,
    cancel: CancellationToken,
}

struct ClientInner {
    options: ClientOptions,
    config: Mutex<SessionConfig>,
    credentials: Arc<dyn CredentialStore>,
    usage: Arc<dyn UsageTracker>,

    state: Mutex<ConnectionState>,
    /// In-flight connect attempt; followers wait on this instead of opening
    /// a second transport
    flight: Mutex<Option<watch::Receiver<Option<ConnectResult>>>>,
    sink: tokio::sync::Mutex<Option<WsSink>>,
    session: Mutex<Option<SessionHandle>>,
    manual_close: AtomicBool,
    reconnect_attempts: AtomicU32,

    on_transcript: Mutex<Option<TranscriptCallback>>,
    on_error: Mutex<Option<ErrorCallback>>,
    on_state: Mutex<Option<StateCallback>>,
}

/// Handle to one logical streaming session.
///
/// Cheap to clone; all clones share the same transport and callbacks. Create
/// one per recording session and tear it down with [`LiveClient::disconnect`].
#[derive(Clone)]
pub struct LiveClient {
    inner: Arc<ClientInner>,
}

impl LiveClient {
    pub fn new(
        config: SessionConfig,
        options: ClientOptions,
        credentials: Arc<dyn CredentialStore>,
        usage: Arc<dyn UsageTracker>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                options,
                config: Mutex::new(config),
                credentials,
                usage,
                state: Mutex::new(ConnectionState::Disconnected),
                flight: Mutex::new(None),
                sink: tokio::sync::Mutex::new(None),
                session: Mutex::new(None),
                manual_close: AtomicBool::new(false),
                reconnect_attempts: AtomicU32::new(0),
                on_transcript: Mutex::new(None),
                on_error: Mutex::new(None),
                on_state: Mutex::new(None),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Callback registration (single slot, last registration wins)
    // ------------------------------------------------------------------

    pub fn on_transcript(&self, callback: impl Fn(TranscriptEvent) + Send + Sync + 'static) {
        *self.inner.on_transcript.lock().unwrap() = Some(Arc::new(callback));
    }

    pub fn on_error(&self, callback: impl Fn(VoiceError) + Send + Sync + 'static) {
        *self.inner.on_error.lock().unwrap() = Some(Arc::new(callback));
    }

    pub fn on_connection_state(&self, callback: impl Fn(ConnectionState) + Send + Sync + 'static) {
        *self.inner.on_state.lock().unwrap() = Some(Arc::new(callback));
    }

    // ------------------------------------------------------------------
    // State accessors
    // ------------------------------------------------------------------

    pub fn connection_state(&self) -> ConnectionState {
        *self.inner.state.lock().unwrap()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Snapshot of the session config that the next `connect()` will use.
    pub fn config(&self) -> SessionConfig {
        self.inner.config.lock().unwrap().clone()
    }

    /// Merge a partial config update; effective on the next `connect()`.
    pub fn update_config(&self, update: SessionConfigUpdate) {
        self.inner.config.lock().unwrap().apply(update);
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    /// Open the streaming transport.
    ///
    /// Idempotent: resolves immediately when already connected, and joins
    /// the in-flight attempt (same resolution, no second transport) when one
    /// is underway.
    pub async fn connect(&self) -> ConnectResult {
        if self.is_connected() {
            return Ok(());
        }

        enum Role {
            Leader(watch::Sender<Option<ConnectResult>>),
            Follower(watch::Receiver<Option<ConnectResult>>),
        }

        let role = {
            let mut flight = self.inner.flight.lock().unwrap();
            match flight.as_ref() {
                Some(rx) => Role::Follower(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *flight = Some(rx);
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Follower(mut rx) => loop {
                {
                    let value = rx.borrow();
                    if let Some(result) = value.as_ref() {
                        return result.clone();
                    }
                }
                if rx.changed().await.is_err() {
                    return Err(VoiceError::connection(
                        "connect attempt was abandoned",
                        codes::CONNECTION_TIMEOUT,
                    ));
                }
            },
            Role::Leader(tx) => {
                let result = self.try_connect().await;
                *self.inner.flight.lock().unwrap() = None;
                let _ = tx.send(Some(result.clone()));
                result
            }
        }
    }

    async fn try_connect(&self) -> ConnectResult {
        let result = self.open_transport().await;
        if result.is_err() {
            self.set_state(ConnectionState::Disconnected);
        }
        result
    }

    async fn open_transport(&self) -> ConnectResult {
        let key = self.inner.credentials.api_key().ok_or_else(|| {
            VoiceError::connection("no API key configured", codes::INVALID_API_KEY)
        })?;
        if !credentials::is_valid_api_key(&key) {
            return Err(VoiceError::connection(
                "API key is not a 40-character hex string",
                codes::INVALID_API_KEY,
            ));
        }

        self.inner.usage.check_quota().await?;

        self.inner.manual_close.store(false, Ordering::SeqCst);
        self.set_state(ConnectionState::Connecting);

        let config = self.config();
        let url = format!("{}?{}", self.inner.options.endpoint, config.query_string());
        log::info!(
            "LiveClient: connecting (model {}, language {})",
            config.model,
            config.language
        );

        let dial = match build_connect_target(&url, &key) {
            ConnectTarget::Request(request) => {
                timeout(self.inner.options.connect_timeout, connect_async(request)).await
            }
            ConnectTarget::Url(url) => {
                timeout(self.inner.options.connect_timeout, connect_async(url)).await
            }
        };

        let (ws_stream, _response) = dial
            .map_err(|_| {
                VoiceError::connection(
                    format!(
                        "transport did not open within {:?}",
                        self.inner.options.connect_timeout
                    ),
                    codes::CONNECTION_TIMEOUT,
                )
            })?
            .map_err(classify_connect_error)?;

        log::info!("LiveClient: transport open");

        let (sink, source) = ws_stream.split();
        *self.inner.sink.lock().await = Some(sink);

        let cancel = CancellationToken::new();
        *self.inner.session.lock().unwrap() = Some(SessionHandle {
            id: Uuid::new_v4(),
            opened_at: Instant::now(),
            started_at: chrono::Utc::now(),
            model: config.model,
            cancel: cancel.clone(),
        });

        self.spawn_read_task(source, cancel.clone());
        self.spawn_keepalive(cancel);

        self.inner.reconnect_attempts.store(0, Ordering::SeqCst);
        self.set_state(ConnectionState::Connected);

        // Settle window between "open" and first send
        tokio::time::sleep(self.inner.options.settle_delay).await;

        Ok(())
    }

    /// Forward one binary audio frame to the open transport.
    ///
    /// Never fails: a frame sent while the transport is closed is dropped
    /// with a warning.
    pub async fn send_audio(&self, frame: &[u8]) {
        let mut guard = self.inner.sink.lock().await;
        match guard.as_mut() {
            Some(sink) => {
                if let Err(e) = sink.send(Message::Binary(frame.to_vec())).await {
                    log::warn!("LiveClient: failed to send audio frame: {}", e);
                }
            }
            None => log::warn!("LiveClient: dropping audio frame, transport not open"),
        }
    }

    /// Ask the server to flush buffered audio into a final result.
    pub async fn finalize(&self) {
        self.send_control(ControlMessage::Finalize).await;
    }

    async fn send_control(&self, message: ControlMessage) {
        let mut guard = self.inner.sink.lock().await;
        match guard.as_mut() {
            Some(sink) => {
                if let Err(e) = sink.send(Message::Text(message.to_json())).await {
                    log::warn!("LiveClient: failed to send control message: {}", e);
                }
            }
            None => log::debug!("LiveClient: skipping control message, transport not open"),
        }
    }

    /// Close the session.
    ///
    /// Marks the session as manually closed (suppressing reconnection), sends
    /// `CloseStream`, and closes with a normal-closure code. Idempotent.
    pub async fn disconnect(&self) {
        self.inner.manual_close.store(true, Ordering::SeqCst);

        let handle = self.inner.session.lock().unwrap().take();
        let Some(handle) = handle else {
            return;
        };

        self.set_state(ConnectionState::Closing);
        handle.cancel.cancel();

        {
            let mut guard = self.inner.sink.lock().await;
            if let Some(mut sink) = guard.take() {
                let _ = sink
                    .send(Message::Text(ControlMessage::CloseStream.to_json()))
                    .await;
                let _ = sink
                    .send(Message::Close(Some(CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client disconnect".into(),
                    })))
                    .await;
                let _ = sink.close().await;
            }
        }

        self.report_usage(&handle);
        self.set_state(ConnectionState::Disconnected);
        log::info!("LiveClient: disconnected");
    }

    /// Tear the transport down and dial again, bypassing the manual-close
    /// suppression and resetting the attempt counter.
    pub async fn force_reconnect(&self) -> ConnectResult {
        log::info!("LiveClient: forcing reconnect");
        self.disconnect().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.inner.reconnect_attempts.store(0, Ordering::SeqCst);
        self.inner.manual_close.store(false, Ordering::SeqCst);
        self.connect().await
    }

    // ------------------------------------------------------------------
    // Transport event handling
    // ------------------------------------------------------------------

    fn spawn_read_task(&self, mut source: WsSource, cancel: CancellationToken) {
        let client = self.clone();
        tokio::spawn(async move {
            let close_info: Option<(u16, String)> = loop {
                tokio::select! {
                    _ = cancel.cancelled() => break None,
                    incoming = source.next() => match incoming {
                        Some(Ok(Message::Text(text))) => client.handle_text(&text),
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.to_string()))
                                .unwrap_or((ABNORMAL_CLOSE, String::new()));
                            break Some((code, reason));
                        }
                        Some(Ok(_)) => {} // Ignore ping/pong/binary
                        Some(Err(e)) => {
                            log::warn!("LiveClient: transport error: {}", e);
                            break Some((ABNORMAL_CLOSE, e.to_string()));
                        }
                        None => break Some((ABNORMAL_CLOSE, "stream ended".to_string())),
                    }
                }
            };

            if let Some((code, reason)) = close_info {
                client.handle_close(code, reason).await;
            }
            log::debug!("LiveClient: read task exiting");
        });
    }

    fn spawn_keepalive(&self, cancel: CancellationToken) {
        let client = self.clone();
        let interval = self.inner.options.keepalive_interval;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        let mut guard = client.inner.sink.lock().await;
                        let Some(sink) = guard.as_mut() else { break };
                        if let Err(e) = sink
                            .send(Message::Text(ControlMessage::KeepAlive.to_json()))
                            .await
                        {
                            log::debug!("LiveClient: keep-alive send failed: {}", e);
                            break;
                        }
                    }
                }
            }
        });
    }

    fn handle_text(&self, text: &str) {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => match &message {
                ServerMessage::Results { .. } => {
                    if let Some(event) = message.transcript_event() {
                        self.emit_transcript(event);
                    }
                }
                ServerMessage::Error {
                    error_code,
                    error_message,
                } => {
                    let code = error_code.map(|c| c.to_string());
                    self.emit_error(VoiceError::api(error_message.clone(), code.as_deref()));
                }
                ServerMessage::UtteranceEnd { last_word_end } => {
                    log::debug!("LiveClient: utterance ended at {:.2}s", last_word_end);
                }
                ServerMessage::SpeechStarted { timestamp } => {
                    log::debug!("LiveClient: speech started at {:.2}s", timestamp);
                }
                ServerMessage::Metadata { request_id, .. } => {
                    log::debug!("LiveClient: session metadata (request {})", request_id);
                }
                ServerMessage::Unknown => {
                    log::debug!("LiveClient: ignoring unrecognized message type");
                }
            },
            Err(e) => log::warn!("LiveClient: failed to parse message: {}", e),
        }
    }

    async fn handle_close(&self, code: u16, reason: String) {
        let handle = self.inner.session.lock().unwrap().take();
        let Some(handle) = handle else {
            // Manual disconnect already tore the session down
            return;
        };
        handle.cancel.cancel();

        *self.inner.sink.lock().await = None;
        self.set_state(ConnectionState::Disconnected);
        self.report_usage(&handle);

        let manual = self.inner.manual_close.load(Ordering::SeqCst);
        if code == NORMAL_CLOSE || manual {
            log::info!("LiveClient: connection closed (code {})", code);
            return;
        }

        log::warn!(
            "LiveClient: unexpected close (code {}, reason {:?})",
            code,
            reason
        );
        self.emit_error(classify_close(code, &reason, handle.opened_at.elapsed()));
        self.reconnect_loop().await;
    }

    /// Sequential reconnection: each attempt is only scheduled after the
    /// previous one settles.
    async fn reconnect_loop(&self) {
        let options = &self.inner.options;
        let max = options.max_reconnect_attempts;

        loop {
            let attempt = self.inner.reconnect_attempts.load(Ordering::SeqCst) + 1;
            if attempt > max {
                self.emit_error(VoiceError::connection(
                    format!("giving up after {} reconnection attempts", max),
                    codes::MAX_RECONNECT_ATTEMPTS,
                ));
                return;
            }
            self.inner.reconnect_attempts.store(attempt, Ordering::SeqCst);

            let delay = reconnect_delay(
                attempt,
                options.reconnect_base_delay,
                options.reconnect_max_delay,
            );
            log::info!(
                "LiveClient: reconnecting in {:?} (attempt {}/{})",
                delay,
                attempt,
                max
            );
            tokio::time::sleep(delay).await;

            if self.inner.manual_close.load(Ordering::SeqCst) {
                log::debug!("LiveClient: reconnect cancelled by disconnect");
                return;
            }

            match self.connect().await {
                Ok(()) => {
                    log::info!("LiveClient: reconnected");
                    return;
                }
                Err(e) => {
                    log::warn!("LiveClient: reconnect attempt {} failed: {}", attempt, e);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Callback dispatch and usage reporting
    // ------------------------------------------------------------------

    fn set_state(&self, next: ConnectionState) {
        let changed = {
            let mut state = self.inner.state.lock().unwrap();
            let changed = *state != next;
            *state = next;
            changed
        };
        if changed {
            log::debug!("LiveClient: connection state -> {}", next);
            let callback = self.inner.on_state.lock().unwrap().clone();
            if let Some(callback) = callback {
                callback(next);
            }
        }
    }

    fn emit_transcript(&self, event: TranscriptEvent) {
        let callback = self.inner.on_transcript.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    fn emit_error(&self, error: VoiceError) {
        log::warn!("LiveClient: {} error: {}", error.kind, error);
        let callback = self.inner.on_error.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(error);
        }
    }

    /// Report the finished session to the usage collaborator. Failures are
    /// logged, never propagated.
    fn report_usage(&self, handle: &SessionHandle) {
        let usage = self.inner.usage.clone();
        let record = SessionUsage {
            session_id: handle.id,
            started_at: handle.started_at,
            duration_minutes: handle.opened_at.elapsed().as_secs_f64() / 60.0,
            model: handle.model.clone(),
            feature: self.inner.options.feature_tag.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = usage.log_session(&record).await {
                log::warn!("LiveClient: failed to log session usage: {}", e);
            }
        });
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        // Ensure background tasks stop if the client is dropped without
        // disconnect()
        if let Ok(mut session) = self.session.lock() {
            if let Some(handle) = session.take() {
                handle.cancel.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_delay_doubles_and_caps() {
        let base = Duration::from_millis(1000);
        let cap = Duration::from_secs(10);

        assert_eq!(reconnect_delay(1, base, cap), Duration::from_millis(1000));
        assert_eq!(reconnect_delay(2, base, cap), Duration::from_millis(2000));
        assert_eq!(reconnect_delay(3, base, cap), Duration::from_millis(4000));
        assert_eq!(reconnect_delay(4, base, cap), Duration::from_millis(8000));
        assert_eq!(reconnect_delay(5, base, cap), Duration::from_secs(10));
        assert_eq!(reconnect_delay(12, base, cap), Duration::from_secs(10));
    }

    #[test]
    fn test_client_options_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.connect_timeout, Duration::from_secs(10));
        assert_eq!(options.settle_delay, Duration::from_millis(50));
        assert_eq!(options.max_reconnect_attempts, 3);
        assert_eq!(options.reconnect_base_delay, Duration::from_millis(1000));
        assert_eq!(options.reconnect_max_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_connect_target_prefers_auth_header() {
        let key = "0123456789abcdef0123456789abcdef01234567";
        match build_connect_target("ws://127.0.0.1:9999/v1/listen?model=nova-2", key) {
            ConnectTarget::Request(request) => {
                let auth = request.headers().get("Authorization").unwrap();
                assert_eq!(auth.to_str().unwrap(), format!("Token {}", key));
            }
            ConnectTarget::Url(_) => panic!("expected header-authenticated request"),
        }
    }

    #[test]
    fn test_connect_target_falls_back_to_url_token() {
        // A key that cannot be a header value forces the URL path
        match build_connect_target("ws://127.0.0.1:9999/v1/listen?model=nova-2", "bad\nkey") {
            ConnectTarget::Url(url) => assert!(url.contains("&token=")),
            ConnectTarget::Request(_) => panic!("expected URL fallback"),
        }
    }

    #[test]
    fn test_io_error_classified_as_network() {
        let err = classify_connect_error(WsError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )));
        assert_eq!(err.kind, crate::error::ErrorKind::Network);
        assert!(err.has_code(codes::NETWORK_ERROR));
    }
}
