//! Integration tests for session orchestration
//!
//! Verifies that `VoiceSession` wires the connection client's callbacks into
//! the status machine: lifecycle transitions, error propagation, teardown.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

use voicewire::{
    ErrorKind, NullUsageTracker, SessionConfig, SessionStatus, StaticCredentials, VoiceSession,
    VoiceSettings,
};

const TEST_KEY: &str = "0123456789abcdef0123456789abcdef01234567";

/// Accept connections forever and hold each one open.
async fn idle_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                if let Ok(mut ws) = accept_async(stream).await {
                    while let Some(Ok(_)) = ws.next().await {}
                }
            });
        }
    });
    format!("ws://{}/v1/listen", addr)
}

/// An address where every dial is refused.
async fn refused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("ws://{}/v1/listen", addr)
}

fn test_settings(endpoint: String) -> VoiceSettings {
    let mut settings = VoiceSettings::default();
    settings.endpoint = endpoint;
    settings.connection_timeout_ms = 2_000;
    settings
}

fn test_session(settings: &VoiceSettings) -> VoiceSession {
    VoiceSession::new(
        SessionConfig::default(),
        settings,
        Arc::new(StaticCredentials(TEST_KEY.to_string())),
        Arc::new(NullUsageTracker),
    )
}

#[tokio::test]
async fn start_moves_the_session_into_listening() {
    let settings = test_settings(idle_server().await);
    let session = test_session(&settings);

    session.start().await.expect("start should succeed");

    assert!(session.client().is_connected());
    assert_eq!(session.status().status(), SessionStatus::Listening);

    session.dispose().await;
}

#[tokio::test]
async fn start_failure_surfaces_as_error_status() {
    let settings = test_settings(refused_endpoint().await);
    let session = test_session(&settings);

    let err = session.start().await.expect_err("start should fail");
    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(session.status().status(), SessionStatus::Error);
    assert!(session.status().error().is_some());
}

#[tokio::test]
async fn finish_keeps_processing_status_through_disconnect() {
    let settings = test_settings(idle_server().await);
    let session = test_session(&settings);

    session.start().await.expect("start");
    session.finish().await;

    // The manual disconnect must not collapse processing to disconnected
    assert_eq!(session.status().status(), SessionStatus::Processing);
    assert!(!session.client().is_connected());

    session.begin_parsing();
    assert_eq!(session.status().status(), SessionStatus::Parsing);

    session.complete();
    assert_eq!(session.status().status(), SessionStatus::Complete);
}

#[tokio::test]
async fn dispose_restores_the_initial_state() {
    let settings = test_settings(idle_server().await);
    let session = test_session(&settings);

    session.start().await.expect("start");
    session.dispose().await;

    assert!(!session.client().is_connected());
    assert_eq!(session.status().status(), SessionStatus::Ready);
    assert_eq!(session.status().connection_attempts(), 0);
}
