//! Usage/quota API client.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;

use crate::error::{codes, ErrorKind, VoiceError};

use super::cache::QuotaCache;
use super::types::{QuotaDecision, QuotaResponse, SessionUsage};

/// Global HTTP client for reuse across requests (avoids TLS handshake overhead)
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .expect("Failed to build HTTP client")
});

/// Usage collaborator: quota gate before a session and accounting after it.
///
/// `log_session` failures are reported as plain strings so callers can log
/// and move on; a failed usage report must never fail a session.
#[async_trait]
pub trait UsageTracker: Send + Sync {
    /// Check whether a new streaming session may proceed.
    async fn check_quota(&self) -> Result<(), VoiceError>;

    /// Record a completed session (duration, model, feature).
    async fn log_session(&self, usage: &SessionUsage) -> Result<(), String>;
}

/// HTTP-backed tracker against the usage service.
pub struct HttpUsageTracker {
    base_url: String,
    api_key: String,
    cache: Mutex<QuotaCache>,
}

impl HttpUsageTracker {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            cache: Mutex::new(QuotaCache::new()),
        }
    }

    fn cached_decision(&self) -> Option<QuotaDecision> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get().cloned())
    }

    fn store_decision(&self, decision: QuotaDecision) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.set(decision);
        }
    }

    fn quota_error(decision: &QuotaDecision) -> VoiceError {
        let reason = decision
            .reason
            .clone()
            .unwrap_or_else(|| "usage quota exhausted".to_string());
        VoiceError::api(reason, Some(codes::QUOTA_EXCEEDED))
    }
}

#[async_trait]
impl UsageTracker for HttpUsageTracker {
    async fn check_quota(&self) -> Result<(), VoiceError> {
        if let Some(decision) = self.cached_decision() {
            if decision.allowed {
                return Ok(());
            }
            return Err(Self::quota_error(&decision));
        }

        let url = format!("{}/usage/quota", self.base_url);
        let response = HTTP_CLIENT
            .get(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .send()
            .await
            .map_err(|e| VoiceError::network(format!("quota check failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => VoiceError::connection(
                    "usage service rejected the API key",
                    codes::AUTH_FAILED,
                ),
                429 => VoiceError::api(
                    "usage service rate limited the quota check",
                    Some(codes::QUOTA_EXCEEDED),
                ),
                code => VoiceError::new(
                    ErrorKind::Api,
                    format!("quota check returned status {}", code),
                    None,
                ),
            });
        }

        let quota: QuotaResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::api(format!("failed to parse quota response: {}", e), None))?;

        let decision = if quota.allowed {
            QuotaDecision::allowed()
        } else {
            QuotaDecision {
                allowed: false,
                reason: quota.reason,
            }
        };
        self.store_decision(decision.clone());

        if decision.allowed {
            if let Some(minutes) = quota.minutes_remaining {
                log::debug!("Usage: quota ok, {:.1} minutes remaining", minutes);
            }
            Ok(())
        } else {
            Err(Self::quota_error(&decision))
        }
    }

    async fn log_session(&self, usage: &SessionUsage) -> Result<(), String> {
        let url = format!("{}/usage/sessions", self.base_url);
        let response = HTTP_CLIENT
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .json(usage)
            .send()
            .await
            .map_err(|e| format!("Network error logging session: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => "Invalid API key".to_string(),
                403 => "API key lacks usage write permission".to_string(),
                429 => "Rate limited - try again later".to_string(),
                _ => format!("API error {}: {}", status, body),
            });
        }

        log::debug!(
            "Usage: logged session {} ({:.2} min, model {})",
            usage.session_id,
            usage.duration_minutes,
            usage.model
        );
        Ok(())
    }
}

/// Tracker that allows every session and discards reports.
///
/// For tests and deployments without a usage backend.
#[derive(Debug, Default, Clone)]
pub struct NullUsageTracker;

#[async_trait]
impl UsageTracker for NullUsageTracker {
    async fn check_quota(&self) -> Result<(), VoiceError> {
        Ok(())
    }

    async fn log_session(&self, usage: &SessionUsage) -> Result<(), String> {
        log::debug!(
            "Usage: discarding session report {} ({:.2} min)",
            usage.session_id,
            usage.duration_minutes
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_tracker_always_allows() {
        let tracker = NullUsageTracker;
        assert!(tracker.check_quota().await.is_ok());

        let usage = SessionUsage::new("nova-2", "live_dictation");
        assert!(tracker.log_session(&usage).await.is_ok());
    }

    #[test]
    fn quota_error_carries_reason_and_code() {
        let decision = QuotaDecision::denied("monthly minutes exhausted");
        let err = HttpUsageTracker::quota_error(&decision);
        assert_eq!(err.kind, ErrorKind::Api);
        assert!(err.has_code(codes::QUOTA_EXCEEDED));
        assert!(err.message.contains("exhausted"));
    }
}
