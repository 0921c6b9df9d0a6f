//! Session orchestration
//!
//! [`VoiceSession`] pairs a connection client with a status machine and
//! wires the client's callbacks into status transitions, so hosts get the
//! full lifecycle (`ready → connecting → listening → … → complete`) without
//! wiring the two by hand. Lifecycle is explicit (create, use, dispose);
//! there are no process-wide instances.

use std::sync::Arc;

use crate::credentials::CredentialStore;
use crate::error::VoiceError;
use crate::settings::VoiceSettings;
use crate::status::{SessionStatus, StatusMachine};
use crate::streaming::{ConnectionState, LiveClient, SessionConfig, TranscriptEvent};
use crate::usage::UsageTracker;

/// One dictation session: a connection client plus its status machine.
pub struct VoiceSession {
    client: LiveClient,
    status: StatusMachine,
}

impl VoiceSession {
    pub fn new(
        config: SessionConfig,
        settings: &VoiceSettings,
        credentials: Arc<dyn CredentialStore>,
        usage: Arc<dyn UsageTracker>,
    ) -> Self {
        let client = LiveClient::new(config, settings.client_options(), credentials, usage);
        let status = StatusMachine::new(settings.status_options());

        // Connection-state changes drive the status machine; errors flow in
        // already classified, so the machine only decides policy.
        let machine = status.clone();
        client.on_connection_state(move |state| match state {
            ConnectionState::Connected => machine.set_status(SessionStatus::Connected),
            ConnectionState::Disconnected => {
                // Keep richer terminal statuses (error/offline/processing)
                // intact; only live states collapse to disconnected.
                if matches!(
                    machine.status(),
                    SessionStatus::Connected | SessionStatus::Listening
                ) {
                    machine.set_status(SessionStatus::Disconnected);
                }
            }
            ConnectionState::Connecting | ConnectionState::Closing => {}
        });

        let machine = status.clone();
        client.on_error(move |error| machine.set_error(error));

        Self { client, status }
    }

    /// Open the transport and move the session into `Listening`.
    pub async fn start(&self) -> Result<(), VoiceError> {
        self.status.set_status(SessionStatus::Connecting);
        match self.client.connect().await {
            Ok(()) => {
                self.status.set_status(SessionStatus::Listening);
                Ok(())
            }
            Err(error) => {
                self.status.set_error(error.clone());
                Err(error)
            }
        }
    }

    /// Forward one audio frame; dropped with a warning when not connected.
    pub async fn send_audio(&self, frame: &[u8]) {
        self.client.send_audio(frame).await;
    }

    /// Register the transcript consumer (single slot, last wins).
    pub fn on_transcript(&self, callback: impl Fn(TranscriptEvent) + Send + Sync + 'static) {
        self.client.on_transcript(callback);
    }

    /// Stop sending audio and flush the final transcript.
    pub async fn finish(&self) {
        self.status.set_status(SessionStatus::Processing);
        self.client.finalize().await;
        self.client.disconnect().await;
    }

    /// Downstream result interpretation has begun.
    pub fn begin_parsing(&self) {
        self.status.set_status(SessionStatus::Parsing);
    }

    /// The session's results have been fully handled.
    pub fn complete(&self) {
        self.status.set_status(SessionStatus::Complete);
    }

    /// Tear down the transport and restore the status machine.
    pub async fn dispose(&self) {
        self.client.disconnect().await;
        self.status.reset();
    }

    pub fn client(&self) -> &LiveClient {
        &self.client
    }

    pub fn status(&self) -> &StatusMachine {
        &self.status
    }
}
