//! Session status state machine
//!
//! UI-facing lifecycle tracking for one dictation session, layered above the
//! connection client. The machine never touches the transport; it only
//! reacts to errors and transitions handed to it, and decides retry and
//! offline policy.
//!
//! Timers (state timeout, connection timeout, scheduled retries) are guarded
//! by an epoch counter: every transition bumps the epoch, and a timer only
//! acts if the machine is still in the generation that installed it. A timer
//! firing after `reset()` or a later transition is a no-op.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::{codes, ErrorKind, VoiceError};

/// Deferred action queued while offline. Failures are logged by the drain
/// loop and never stop it.
pub type OfflineAction = Box<dyn FnOnce() -> Result<(), String> + Send>;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Ready,
    Connecting,
    Connected,
    Listening,
    Processing,
    Parsing,
    Complete,
    Error,
    Disconnected,
    Offline,
    Timeout,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Ready => "ready",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Listening => "listening",
            SessionStatus::Processing => "processing",
            SessionStatus::Parsing => "parsing",
            SessionStatus::Complete => "complete",
            SessionStatus::Error => "error",
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Offline => "offline",
            SessionStatus::Timeout => "timeout",
        }
    }

    /// CSS color class for this status.
    pub fn color_class(&self) -> &'static str {
        match self {
            SessionStatus::Ready => "text-muted",
            SessionStatus::Connecting => "text-warning",
            SessionStatus::Connected | SessionStatus::Listening => "text-success",
            SessionStatus::Processing | SessionStatus::Parsing => "text-info",
            SessionStatus::Complete => "text-success",
            SessionStatus::Error | SessionStatus::Timeout => "text-danger",
            SessionStatus::Disconnected | SessionStatus::Offline => "text-muted",
        }
    }

    /// Icon name for this status.
    pub fn icon_name(&self) -> &'static str {
        match self {
            SessionStatus::Ready => "mic",
            SessionStatus::Connecting => "loader",
            SessionStatus::Connected => "plug",
            SessionStatus::Listening => "mic",
            SessionStatus::Processing => "cpu",
            SessionStatus::Parsing => "file-text",
            SessionStatus::Complete => "check-circle",
            SessionStatus::Error => "alert-circle",
            SessionStatus::Disconnected => "plug-off",
            SessionStatus::Offline => "cloud-off",
            SessionStatus::Timeout => "clock",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine tunables.
#[derive(Debug, Clone)]
pub struct StatusOptions {
    /// Listening/processing/parsing time out after this long with no
    /// transition
    pub state_timeout: Duration,
    /// Connecting times out after this long
    pub connection_timeout: Duration,
    /// Recovery retries before MAX_RETRIES_EXCEEDED
    pub max_retries: u32,
    /// Delay before a scheduled retry fires
    pub retry_delay: Duration,
    /// Connection attempts before the offline fallback
    pub max_connection_attempts: u32,
    /// Enables the offline queue and the offline fallback
    pub offline_enabled: bool,
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self {
            state_timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            max_connection_attempts: 5,
            offline_enabled: true,
        }
    }
}

struct StatusInner {
    status: SessionStatus,
    error: Option<VoiceError>,
    error_at: Option<Instant>,
    retry_count: u32,
    connection_attempts: u32,
    is_retrying: bool,
    last_activity: Instant,
    /// Bumped on every transition; pending timers compare against it
    epoch: u64,
    offline_queue: VecDeque<OfflineAction>,
}

type StatusHook = Arc<dyn Fn(SessionStatus) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(VoiceError) + Send + Sync>;
type UnitHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct HookSlots {
    status_change: Mutex<Option<StatusHook>>,
    error: Mutex<Option<ErrorHook>>,
    timeout: Mutex<Option<UnitHook>>,
    offline_mode: Mutex<Option<UnitHook>>,
}

/// Session status state machine.
///
/// Cheap to clone; all clones share state. Construct one per UI mount and
/// discard it (or `reset()`) when the view goes away.
#[derive(Clone)]
pub struct StatusMachine {
    options: Arc<StatusOptions>,
    inner: Arc<Mutex<StatusInner>>,
    hooks: Arc<HookSlots>,
}

impl StatusMachine {
    pub fn new(options: StatusOptions) -> Self {
        Self {
            options: Arc::new(options),
            inner: Arc::new(Mutex::new(StatusInner {
                status: SessionStatus::Ready,
                error: None,
                error_at: None,
                retry_count: 0,
                connection_attempts: 0,
                is_retrying: false,
                last_activity: Instant::now(),
                epoch: 0,
                offline_queue: VecDeque::new(),
            })),
            hooks: Arc::new(HookSlots::default()),
        }
    }

    // ------------------------------------------------------------------
    // Hook registration (single slot, last registration wins)
    // ------------------------------------------------------------------

    pub fn on_status_change(&self, hook: impl Fn(SessionStatus) + Send + Sync + 'static) {
        *self.hooks.status_change.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn on_error(&self, hook: impl Fn(VoiceError) + Send + Sync + 'static) {
        *self.hooks.error.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn on_timeout(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.hooks.timeout.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn on_offline_mode(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.hooks.offline_mode.lock().unwrap() = Some(Arc::new(hook));
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn status(&self) -> SessionStatus {
        self.inner.lock().unwrap().status
    }

    pub fn error(&self) -> Option<VoiceError> {
        self.inner.lock().unwrap().error.clone()
    }

    pub fn retry_count(&self) -> u32 {
        self.inner.lock().unwrap().retry_count
    }

    pub fn connection_attempts(&self) -> u32 {
        self.inner.lock().unwrap().connection_attempts
    }

    pub fn is_retrying(&self) -> bool {
        self.inner.lock().unwrap().is_retrying
    }

    pub fn offline_queue_len(&self) -> usize {
        self.inner.lock().unwrap().offline_queue.len()
    }

    pub fn time_since_last_activity(&self) -> Duration {
        self.inner.lock().unwrap().last_activity.elapsed()
    }

    /// Time since the current error was recorded, if one is set.
    pub fn time_since_error(&self) -> Option<Duration> {
        self.inner.lock().unwrap().error_at.map(|at| at.elapsed())
    }

    /// Human-readable message for the current status, with attempt
    /// interpolation while connecting.
    pub fn status_message(&self) -> String {
        let inner = self.inner.lock().unwrap();
        match inner.status {
            SessionStatus::Ready => "Ready to record".to_string(),
            SessionStatus::Connecting => {
                format!("Connecting… (attempt {})", inner.connection_attempts + 1)
            }
            SessionStatus::Connected => "Connected".to_string(),
            SessionStatus::Listening => "Listening…".to_string(),
            SessionStatus::Processing => "Processing audio…".to_string(),
            SessionStatus::Parsing => "Interpreting results…".to_string(),
            SessionStatus::Complete => "Done".to_string(),
            SessionStatus::Error => inner
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Something went wrong".to_string()),
            SessionStatus::Disconnected => "Disconnected".to_string(),
            SessionStatus::Offline => "Offline, changes will sync when reconnected".to_string(),
            SessionStatus::Timeout => "Timed out waiting for a response".to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Transition to `next`.
    ///
    /// Clears any pending per-state timer, stamps last activity, and installs
    /// the timers the new state requires.
    pub fn set_status(&self, next: SessionStatus) {
        let epoch = {
            let mut inner = self.inner.lock().unwrap();
            inner.epoch += 1;
            inner.status = next;
            inner.last_activity = Instant::now();
            if next == SessionStatus::Connected {
                inner.connection_attempts = 0;
            }
            inner.epoch
        };

        log::debug!("StatusMachine: status -> {}", next);
        self.fire_status_change(next);

        match next {
            SessionStatus::Listening | SessionStatus::Processing | SessionStatus::Parsing => {
                self.spawn_state_timeout(epoch);
            }
            SessionStatus::Connecting => {
                self.spawn_connection_timeout(epoch);
            }
            SessionStatus::Offline => {
                if self.options.offline_enabled {
                    self.fire_offline_mode();
                }
            }
            _ => {}
        }
    }

    /// Store an error, forcing status to `Error`.
    ///
    /// `connection`-kind errors increment the connection-attempt counter;
    /// `network`-kind errors with retries remaining auto-schedule a
    /// `retry()` after the retry delay.
    pub fn set_error(&self, error: VoiceError) {
        let (schedule_retry, epoch) = {
            let mut inner = self.inner.lock().unwrap();
            inner.epoch += 1;
            inner.status = SessionStatus::Error;
            inner.error = Some(error.clone());
            inner.error_at = Some(Instant::now());
            inner.last_activity = Instant::now();
            if error.kind == ErrorKind::Connection {
                inner.connection_attempts += 1;
            }
            let schedule =
                error.kind == ErrorKind::Network && inner.retry_count < self.options.max_retries;
            (schedule, inner.epoch)
        };

        log::warn!("StatusMachine: {} error: {}", error.kind, error);
        self.fire_status_change(SessionStatus::Error);
        self.fire_error(error);

        if schedule_retry {
            let machine = self.clone();
            let delay = self.options.retry_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if machine.epoch_matches(epoch) {
                    machine.retry();
                }
            });
        }
    }

    /// Attempt a recovery retry.
    ///
    /// Refuses when the retry or connection-attempt ceiling is reached;
    /// otherwise clears the error and returns to `Ready` after the retry
    /// delay.
    pub fn retry(&self) {
        enum Refusal {
            MaxRetries,
            MaxAttempts,
        }

        let (decision, epoch) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.retry_count >= self.options.max_retries {
                (Some(Refusal::MaxRetries), inner.epoch)
            } else if inner.connection_attempts >= self.options.max_connection_attempts {
                (Some(Refusal::MaxAttempts), inner.epoch)
            } else {
                inner.epoch += 1;
                inner.is_retrying = true;
                inner.retry_count += 1;
                inner.error = None;
                inner.last_activity = Instant::now();
                (None, inner.epoch)
            }
        };

        match decision {
            Some(Refusal::MaxRetries) => {
                self.set_error(VoiceError::api(
                    format!("retry limit of {} reached", self.options.max_retries),
                    Some(codes::MAX_RETRIES_EXCEEDED),
                ));
            }
            Some(Refusal::MaxAttempts) => {
                self.set_error(VoiceError::connection(
                    format!(
                        "connection attempt limit of {} reached",
                        self.options.max_connection_attempts
                    ),
                    codes::MAX_CONNECTION_ATTEMPTS_EXCEEDED,
                ));
                if self.options.offline_enabled {
                    self.set_status(SessionStatus::Offline);
                }
            }
            None => {
                let machine = self.clone();
                let delay = self.options.retry_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let fire = {
                        let mut inner = machine.inner.lock().unwrap();
                        if inner.epoch == epoch {
                            inner.epoch += 1;
                            inner.is_retrying = false;
                            inner.status = SessionStatus::Ready;
                            inner.last_activity = Instant::now();
                            true
                        } else {
                            false
                        }
                    };
                    if fire {
                        machine.fire_status_change(SessionStatus::Ready);
                    }
                });
            }
        }
    }

    /// Restore the full initial state and cancel all pending timers.
    pub fn reset(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.epoch += 1;
            inner.status = SessionStatus::Ready;
            inner.error = None;
            inner.error_at = None;
            inner.retry_count = 0;
            inner.connection_attempts = 0;
            inner.is_retrying = false;
            inner.last_activity = Instant::now();
            inner.offline_queue.clear();
        }
        log::debug!("StatusMachine: reset");
        self.fire_status_change(SessionStatus::Ready);
    }

    // ------------------------------------------------------------------
    // Offline queue
    // ------------------------------------------------------------------

    /// Queue a deferred action. Dropped (with a log line) when offline mode
    /// is disabled.
    pub fn add_to_offline_queue(&self, action: OfflineAction) {
        if !self.options.offline_enabled {
            log::debug!("StatusMachine: offline mode disabled, dropping queued action");
            return;
        }
        self.inner.lock().unwrap().offline_queue.push_back(action);
    }

    /// Drain the queue, running every action in FIFO order. An action
    /// failure is logged and draining continues.
    pub fn process_offline_queue(&self) {
        let actions: Vec<OfflineAction> = {
            let mut inner = self.inner.lock().unwrap();
            inner.offline_queue.drain(..).collect()
        };

        if actions.is_empty() {
            return;
        }
        log::info!("StatusMachine: processing {} queued actions", actions.len());

        for (index, action) in actions.into_iter().enumerate() {
            if let Err(e) = action() {
                log::warn!("StatusMachine: offline action {} failed: {}", index, e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn epoch_matches(&self, epoch: u64) -> bool {
        self.inner.lock().unwrap().epoch == epoch
    }

    fn spawn_state_timeout(&self, epoch: u64) {
        let machine = self.clone();
        let timeout = self.options.state_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            let error = {
                let mut inner = machine.inner.lock().unwrap();
                if inner.epoch != epoch {
                    return; // A later transition superseded this timer
                }
                inner.epoch += 1;
                inner.status = SessionStatus::Timeout;
                let error = VoiceError::api(
                    format!("no response within {:?}", timeout),
                    Some(codes::SESSION_TIMEOUT),
                );
                inner.error = Some(error.clone());
                inner.error_at = Some(Instant::now());
                inner.last_activity = Instant::now();
                error
            };

            log::warn!("StatusMachine: state timed out: {}", error);
            machine.fire_status_change(SessionStatus::Timeout);
            machine.fire_timeout();
        });
    }

    fn spawn_connection_timeout(&self, epoch: u64) {
        let machine = self.clone();
        let timeout = self.options.connection_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if !machine.epoch_matches(epoch) {
                return;
            }
            machine.set_error(VoiceError::connection(
                format!("connection not established within {:?}", timeout),
                codes::CONNECTION_TIMEOUT,
            ));
        });
    }

    // ------------------------------------------------------------------
    // Hook dispatch
    // ------------------------------------------------------------------

    fn fire_status_change(&self, status: SessionStatus) {
        let hook = self.hooks.status_change.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook(status);
        }
    }

    fn fire_error(&self, error: VoiceError) {
        let hook = self.hooks.error.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook(error);
        }
    }

    fn fire_timeout(&self) {
        let hook = self.hooks.timeout.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn fire_offline_mode(&self) {
        let hook = self.hooks.offline_mode.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::new(StatusOptions::default())
    }
}
