//! Streaming transcription module for real-time speech-to-text
//!
//! This module owns the WebSocket session to the speech service: the wire
//! protocol types and the connection client with its reconnection logic.
//!
//! # Architecture
//!
//! ```text
//! Audio Frames (binary) ──▶ LiveClient ──▶ WebSocket ──▶ Speech Service
//!                               │
//!                               ▼ callbacks
//!                  TranscriptEvent / VoiceError / ConnectionState
//! ```
//!
//! # Failure Strategy
//!
//! - Unexpected closes reconnect with exponential backoff (bounded attempts)
//! - Normal closes and manual disconnects never reconnect
//! - Every close reports session duration to the usage collaborator

mod client;
mod protocol;

pub use client::{ClientOptions, ConnectionState, LiveClient};
pub use protocol::{
    Alternative, Channel, ControlMessage, ServerMessage, SessionConfig, SessionConfigUpdate,
    TranscriptEvent, Word, DEFAULT_ENDPOINT,
};
