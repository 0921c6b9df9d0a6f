//! Error taxonomy and failure classification
//!
//! Every failure surfaced by this crate is a [`VoiceError`], a semantic
//! `{kind, message, code}` record. Raw transport exceptions, close codes,
//! and platform capture failures are classified here and never leak to
//! callers.

use std::time::Duration;

/// Close with 4001 (invalid credential) or 1008 (policy violation) this soon
/// after the transport opened is treated as an authentication failure.
const AUTH_CLOSE_WINDOW: Duration = Duration::from_millis(1000);

/// Stable error codes attached to [`VoiceError`] records.
pub mod codes {
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const NO_MICROPHONE: &str = "NO_MICROPHONE";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const AUTH_FAILED: &str = "AUTH_FAILED";
    pub const INVALID_API_KEY: &str = "INVALID_API_KEY";
    pub const QUOTA_EXCEEDED: &str = "QUOTA_EXCEEDED";
    pub const CONNECTION_TIMEOUT: &str = "CONNECTION_TIMEOUT";
    pub const SESSION_TIMEOUT: &str = "SESSION_TIMEOUT";
    pub const MAX_RECONNECT_ATTEMPTS: &str = "MAX_RECONNECT_ATTEMPTS";
    pub const MAX_RETRIES_EXCEEDED: &str = "MAX_RETRIES_EXCEEDED";
    pub const MAX_CONNECTION_ATTEMPTS_EXCEEDED: &str = "MAX_CONNECTION_ATTEMPTS_EXCEEDED";
}

/// Semantic error categories. Closed set; every failure maps to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport or authentication failure
    Connection,
    /// Device/permission denial at the audio-capture layer
    Permission,
    /// Lower-level connectivity failure
    Network,
    /// Backend-reported or timeout-derived failure
    Api,
    /// Anything that did not match a known failure shape
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Permission => "permission",
            ErrorKind::Network => "network",
            ErrorKind::Api => "api",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure record.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceError {
    pub kind: ErrorKind,
    pub message: String,
    pub code: Option<String>,
}

impl VoiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: code.map(str::to_string),
        }
    }

    pub fn connection(message: impl Into<String>, code: &str) -> Self {
        Self::new(ErrorKind::Connection, message, Some(code))
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message, Some(codes::NETWORK_ERROR))
    }

    pub fn api(message: impl Into<String>, code: Option<&str>) -> Self {
        Self::new(ErrorKind::Api, message, code)
    }

    pub fn unknown(message: impl Into<String>, code: Option<&str>) -> Self {
        Self::new(ErrorKind::Unknown, message, code)
    }

    /// True when the code matches one of the stable constants in [`codes`].
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl std::fmt::Display for VoiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " ({})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for VoiceError {}

/// Classify a transport close.
///
/// Close codes `4001` (invalid credential) and `1008` (policy violation)
/// arriving inside the auth window after open mean the backend rejected the
/// credential during handshake. Any other abnormal close is passed through
/// as `unknown` with the close code attached.
pub fn classify_close(code: u16, reason: &str, since_open: Duration) -> VoiceError {
    if (code == 4001 || code == 1008) && since_open < AUTH_CLOSE_WINDOW {
        let detail = if reason.is_empty() {
            format!("authentication rejected by server (close code {})", code)
        } else {
            format!("authentication rejected by server: {}", reason)
        };
        return VoiceError::connection(detail, codes::AUTH_FAILED);
    }

    let message = if reason.is_empty() {
        format!("connection closed unexpectedly (code {})", code)
    } else {
        reason.to_string()
    };
    let code = code.to_string();
    VoiceError::unknown(message, Some(code.as_str()))
}

/// Classify a raw audio-capture failure by its platform error text.
///
/// Mirrors the capture-layer error names: permission denial and missing
/// devices map to `permission`, plain connectivity failures to `network`,
/// everything else passes through as `unknown`.
pub fn classify_capture_error(detail: &str) -> VoiceError {
    let lowered = detail.to_lowercase();

    if lowered.contains("permission")
        || lowered.contains("not allowed")
        || lowered.contains("denied")
    {
        return VoiceError::new(
            ErrorKind::Permission,
            "microphone access was denied",
            Some(codes::PERMISSION_DENIED),
        );
    }

    if lowered.contains("not found") || lowered.contains("no device") {
        return VoiceError::new(
            ErrorKind::Permission,
            "no audio input device found",
            Some(codes::NO_MICROPHONE),
        );
    }

    if lowered.contains("network") {
        return VoiceError::network(detail.to_string());
    }

    VoiceError::unknown(detail.to_string(), None)
}
