//! Data structures for session usage accounting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One completed streaming session, reported to the usage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUsage {
    /// Client-generated session id
    pub session_id: Uuid,
    /// When the transport opened
    pub started_at: DateTime<Utc>,
    /// Billable duration in minutes
    pub duration_minutes: f64,
    /// Recognition model used
    pub model: String,
    /// Feature that consumed the session (e.g. "live_dictation")
    pub feature: String,
}

impl SessionUsage {
    pub fn new(model: impl Into<String>, feature: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            duration_minutes: 0.0,
            model: model.into(),
            feature: feature.into(),
        }
    }
}

/// Whether a new session may proceed.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl QuotaDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

// ============================================================================
// Usage API Response Types
// ============================================================================

/// Response from the quota endpoint
#[derive(Debug, Deserialize)]
pub struct QuotaResponse {
    pub allowed: bool,
    #[serde(default)]
    pub reason: Option<String>,
    /// Streaming minutes left in the current billing period
    #[serde(default)]
    pub minutes_remaining: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_usage_starts_with_zero_duration() {
        let usage = SessionUsage::new("nova-2", "live_dictation");
        assert_eq!(usage.duration_minutes, 0.0);
        assert_eq!(usage.model, "nova-2");
        assert_eq!(usage.feature, "live_dictation");
    }

    #[test]
    fn quota_response_tolerates_missing_fields() {
        let resp: QuotaResponse = serde_json::from_str(r#"{ "allowed": true }"#).unwrap();
        assert!(resp.allowed);
        assert!(resp.reason.is_none());
        assert!(resp.minutes_remaining.is_none());
    }

    #[test]
    fn quota_response_carries_denial_reason() {
        let resp: QuotaResponse = serde_json::from_str(
            r#"{ "allowed": false, "reason": "monthly minutes exhausted", "minutes_remaining": 0.0 }"#,
        )
        .unwrap();
        assert!(!resp.allowed);
        assert_eq!(resp.reason.as_deref(), Some("monthly minutes exhausted"));
    }
}
