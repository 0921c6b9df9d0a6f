//! Streaming voice transcription client
//!
//! Connection management for live speech-to-text sessions: a WebSocket
//! client with bounded-backoff reconnection, a UI-facing status state
//! machine with timeouts and an offline queue, and a closed error taxonomy.
//!
//! ```text
//! host app ──▶ VoiceSession ──▶ LiveClient ──▶ WebSocket ──▶ speech service
//!                   │                │
//!                   ▼                ▼ callbacks
//!             StatusMachine   transcripts / errors / connection state
//! ```

pub mod credentials;
pub mod error;
pub mod session;
pub mod settings;
pub mod status;
pub mod streaming;
pub mod usage;

pub use credentials::{CredentialStore, KeyringCredentialStore, StaticCredentials};
pub use error::{ErrorKind, VoiceError};
pub use session::VoiceSession;
pub use settings::{load_settings, save_settings, VoiceSettings};
pub use status::{SessionStatus, StatusMachine, StatusOptions};
pub use streaming::{
    ClientOptions, ConnectionState, LiveClient, SessionConfig, SessionConfigUpdate, TranscriptEvent,
};
pub use usage::{HttpUsageTracker, NullUsageTracker, SessionUsage, UsageTracker};
