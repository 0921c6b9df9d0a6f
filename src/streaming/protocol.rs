//! Live-listen wire protocol types
//!
//! This module defines the JSON message types exchanged with the
//! speech-to-text streaming endpoint over WebSocket.
//!
//! # Protocol Overview
//!
//! 1. Connect to `wss://<host>/v1/listen?model=...&language=...` with the
//!    session config encoded as query parameters
//! 2. Stream raw binary audio frames
//! 3. Receive `Results` envelopes with incremental and final transcripts
//! 4. Send `CloseStream` and close with a normal-closure code to finish
//!
//! Inbound envelopes are discriminated by a `type` field; unrecognized
//! types deserialize into `Unknown` instead of failing.

use serde::{Deserialize, Serialize};

/// Default live-listen endpoint
pub const DEFAULT_ENDPOINT: &str = "wss://api.deepgram.com/v1/listen";

/// Recognition parameters for one streaming session.
///
/// Immutable while a session is open; [`SessionConfigUpdate`] merges take
/// effect on the next connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Recognition model identifier
    pub model: String,
    /// BCP-47 language tag
    pub language: String,
    /// Input sample rate in Hz
    pub sample_rate: u32,
    /// Input channel count
    pub channels: u16,
    /// Add punctuation to transcripts
    pub punctuate: bool,
    /// Apply smart formatting (dates, numbers, currency)
    pub smart_format: bool,
    /// Deliver partial results while speech is in progress
    pub interim_results: bool,
    /// Tag words with speaker ids
    pub diarize: bool,
    /// Emit `UtteranceEnd` after this many ms of silence
    pub utterance_end_ms: Option<u32>,
    /// Emit `SpeechStarted` events from server-side VAD
    pub vad_events: bool,
    /// Server-side endpointing silence threshold in ms
    pub endpointing: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: "nova-2".to_string(),
            language: "en-US".to_string(),
            sample_rate: 16_000,
            channels: 1,
            punctuate: true,
            smart_format: true,
            interim_results: true,
            diarize: false,
            utterance_end_ms: Some(1000),
            vad_events: true,
            endpointing: None,
        }
    }
}

impl SessionConfig {
    /// Render the config as the endpoint query string.
    pub fn query_string(&self) -> String {
        let mut params = vec![
            format!("model={}", self.model),
            format!("language={}", self.language),
            "encoding=linear16".to_string(),
            format!("sample_rate={}", self.sample_rate),
            format!("channels={}", self.channels),
            format!("punctuate={}", self.punctuate),
            format!("smart_format={}", self.smart_format),
            format!("interim_results={}", self.interim_results),
            format!("diarize={}", self.diarize),
            format!("vad_events={}", self.vad_events),
        ];
        if let Some(ms) = self.utterance_end_ms {
            params.push(format!("utterance_end_ms={}", ms));
        }
        if let Some(ms) = self.endpointing {
            params.push(format!("endpointing={}", ms));
        }
        params.join("&")
    }

    /// Merge a partial update into this config.
    pub fn apply(&mut self, update: SessionConfigUpdate) {
        if let Some(model) = update.model {
            self.model = model;
        }
        if let Some(language) = update.language {
            self.language = language;
        }
        if let Some(sample_rate) = update.sample_rate {
            self.sample_rate = sample_rate;
        }
        if let Some(channels) = update.channels {
            self.channels = channels;
        }
        if let Some(punctuate) = update.punctuate {
            self.punctuate = punctuate;
        }
        if let Some(smart_format) = update.smart_format {
            self.smart_format = smart_format;
        }
        if let Some(interim_results) = update.interim_results {
            self.interim_results = interim_results;
        }
        if let Some(diarize) = update.diarize {
            self.diarize = diarize;
        }
        if let Some(utterance_end_ms) = update.utterance_end_ms {
            self.utterance_end_ms = utterance_end_ms;
        }
        if let Some(vad_events) = update.vad_events {
            self.vad_events = vad_events;
        }
        if let Some(endpointing) = update.endpointing {
            self.endpointing = endpointing;
        }
    }
}

/// Partial session config; `None` fields are left untouched by
/// [`SessionConfig::apply`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfigUpdate {
    pub model: Option<String>,
    pub language: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub punctuate: Option<bool>,
    pub smart_format: Option<bool>,
    pub interim_results: Option<bool>,
    pub diarize: Option<bool>,
    pub utterance_end_ms: Option<Option<u32>>,
    pub vad_events: Option<bool>,
    pub endpointing: Option<Option<u32>>,
}

// ============================================================================
// Client Messages (sent TO the endpoint)
// ============================================================================

/// Text control messages sent alongside binary audio frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Keep an idle connection open
    KeepAlive,
    /// Flush any buffered audio into a final result
    Finalize,
    /// Signal end of audio; the server finishes and closes
    CloseStream,
}

impl ControlMessage {
    /// Serialize to the JSON text frame for the wire.
    pub fn to_json(&self) -> String {
        // Serialization of a fieldless tagged enum cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ============================================================================
// Server Messages (received FROM the endpoint)
// ============================================================================

/// One word in a transcript alternative.
#[derive(Debug, Clone, Deserialize)]
pub struct Word {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub speaker: Option<i32>,
    #[serde(default)]
    pub punctuated_word: Option<String>,
}

/// One recognition hypothesis.
#[derive(Debug, Clone, Deserialize)]
pub struct Alternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub words: Vec<Word>,
}

/// Per-channel recognition results; alternatives are ordered best-first.
#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

/// Messages received from the streaming endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Incremental or final recognition results
    Results {
        #[serde(default)]
        start: f64,
        #[serde(default)]
        duration: f64,
        #[serde(default)]
        is_final: bool,
        #[serde(default)]
        speech_final: bool,
        channel: Channel,
    },

    /// Server-side silence detection fired
    UtteranceEnd {
        #[serde(default)]
        last_word_end: f64,
    },

    /// Server-side VAD detected speech
    SpeechStarted {
        #[serde(default)]
        timestamp: f64,
    },

    /// End-of-stream summary
    Metadata {
        #[serde(default)]
        request_id: String,
        #[serde(default)]
        duration: f64,
    },

    /// Backend-reported error
    Error {
        #[serde(default)]
        error_code: Option<i32>,
        #[serde(default)]
        error_message: String,
    },

    /// Catch-all for message types we don't handle
    /// This prevents deserialization failures for unknown types
    #[serde(other)]
    Unknown,
}

/// A recognition result forwarded to the transcript callback.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEvent {
    pub text: String,
    /// Recognition confidence, 0.0–1.0
    pub confidence: f64,
    pub is_final: bool,
    /// Speaker id from diarization, when words carry one
    pub speaker_id: Option<i32>,
    /// Segment start offset from session begin, in ms
    pub start_ms: Option<u64>,
    /// Segment end offset from session begin, in ms
    pub end_ms: Option<u64>,
}

impl ServerMessage {
    /// Check if this is an error message
    pub fn is_error(&self) -> bool {
        matches!(self, ServerMessage::Error { .. })
    }

    /// Extract the top alternative of a `Results` envelope.
    ///
    /// Returns `None` for anything that is not a `Results` message, and for
    /// empty interim results: an empty transcript that is not final is
    /// recognizer noise and must not reach the callback.
    pub fn transcript_event(&self) -> Option<TranscriptEvent> {
        let ServerMessage::Results {
            start,
            duration,
            is_final,
            channel,
            ..
        } = self
        else {
            return None;
        };

        let alternative = channel.alternatives.first()?;
        if alternative.transcript.is_empty() && !is_final {
            return None;
        }

        let speaker_id = alternative.words.first().and_then(|w| w.speaker);
        let (start_ms, end_ms) = if *start == 0.0 && *duration == 0.0 {
            (None, None)
        } else {
            (
                Some((start * 1000.0).round() as u64),
                Some(((start + duration) * 1000.0).round() as u64),
            )
        };

        Some(TranscriptEvent {
            text: alternative.transcript.clone(),
            confidence: alternative.confidence,
            is_final: *is_final,
            speaker_id,
            start_ms,
            end_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string_contains_session_parameters() {
        let config = SessionConfig::default();
        let query = config.query_string();

        assert!(query.contains("model=nova-2"));
        assert!(query.contains("language=en-US"));
        assert!(query.contains("encoding=linear16"));
        assert!(query.contains("sample_rate=16000"));
        assert!(query.contains("channels=1"));
        assert!(query.contains("interim_results=true"));
        assert!(query.contains("utterance_end_ms=1000"));
        assert!(!query.contains("endpointing"));
    }

    #[test]
    fn test_config_update_merges_only_set_fields() {
        let mut config = SessionConfig::default();
        config.apply(SessionConfigUpdate {
            model: Some("nova-2-meeting".to_string()),
            diarize: Some(true),
            utterance_end_ms: Some(None),
            ..Default::default()
        });

        assert_eq!(config.model, "nova-2-meeting");
        assert!(config.diarize);
        assert!(config.utterance_end_ms.is_none());
        // Untouched fields keep their values
        assert_eq!(config.language, "en-US");
        assert!(config.punctuate);
    }

    #[test]
    fn test_control_message_serialization() {
        assert_eq!(ControlMessage::KeepAlive.to_json(), r#"{"type":"KeepAlive"}"#);
        assert_eq!(ControlMessage::Finalize.to_json(), r#"{"type":"Finalize"}"#);
        assert_eq!(
            ControlMessage::CloseStream.to_json(),
            r#"{"type":"CloseStream"}"#
        );
    }

    #[test]
    fn test_results_deserialization() {
        let json = r#"{
            "type": "Results",
            "start": 1.5,
            "duration": 0.8,
            "is_final": true,
            "speech_final": true,
            "channel": {
                "alternatives": [
                    { "transcript": "hello world", "confidence": 0.92, "words": [] }
                ]
            }
        }"#;

        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let event = msg.transcript_event().expect("final result should yield an event");

        assert_eq!(event.text, "hello world");
        assert_eq!(event.confidence, 0.92);
        assert!(event.is_final);
        assert!(event.speaker_id.is_none());
        assert_eq!(event.start_ms, Some(1500));
        assert_eq!(event.end_ms, Some(2300));
    }

    #[test]
    fn test_empty_interim_result_is_suppressed() {
        let json = r#"{
            "type": "Results",
            "is_final": false,
            "channel": { "alternatives": [ { "transcript": "", "confidence": 0.0 } ] }
        }"#;

        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert!(msg.transcript_event().is_none());
    }

    #[test]
    fn test_empty_final_result_is_forwarded() {
        let json = r#"{
            "type": "Results",
            "is_final": true,
            "channel": { "alternatives": [ { "transcript": "", "confidence": 0.0 } ] }
        }"#;

        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let event = msg.transcript_event().expect("final result should be forwarded");
        assert!(event.text.is_empty());
        assert!(event.is_final);
    }

    #[test]
    fn test_speaker_id_comes_from_first_word() {
        let json = r#"{
            "type": "Results",
            "is_final": true,
            "channel": {
                "alternatives": [{
                    "transcript": "table four is ready",
                    "confidence": 0.88,
                    "words": [
                        { "word": "table", "start": 0.1, "end": 0.3, "confidence": 0.9, "speaker": 2 },
                        { "word": "four", "start": 0.3, "end": 0.5, "confidence": 0.9, "speaker": 2 }
                    ]
                }]
            }
        }"#;

        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let event = msg.transcript_event().unwrap();
        assert_eq!(event.speaker_id, Some(2));
    }

    #[test]
    fn test_error_deserialization() {
        let json = r#"{
            "type": "Error",
            "error_code": 4001,
            "error_message": "invalid credentials"
        }"#;

        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert!(msg.is_error());
        match msg {
            ServerMessage::Error {
                error_code,
                error_message,
            } => {
                assert_eq!(error_code, Some(4001));
                assert_eq!(error_message, "invalid credentials");
            }
            _ => panic!("Expected Error"),
        }
    }

    #[test]
    fn test_utterance_end_deserialization() {
        let json = r#"{ "type": "UtteranceEnd", "last_word_end": 4.2 }"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ServerMessage::UtteranceEnd { last_word_end } if last_word_end == 4.2));
    }

    #[test]
    fn test_unknown_message_type() {
        let json = r#"{ "type": "SomeFutureMessageType", "data": "whatever" }"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ServerMessage::Unknown));
    }

    #[test]
    fn test_missing_alternatives_yields_no_event() {
        let json = r#"{ "type": "Results", "is_final": true, "channel": { "alternatives": [] } }"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert!(msg.transcript_event().is_none());
    }
}
