//! Caching layer for quota decisions to avoid API spam.

use std::time::{Duration, Instant};

use super::types::QuotaDecision;

/// Cache duration (60 seconds)
const CACHE_DURATION: Duration = Duration::from_secs(60);

/// Cache for the most recent quota decision.
pub struct QuotaCache {
    decision: Option<QuotaDecision>,
    cached_at: Option<Instant>,
}

impl QuotaCache {
    pub fn new() -> Self {
        Self {
            decision: None,
            cached_at: None,
        }
    }

    /// Get the cached decision if still valid.
    pub fn get(&self) -> Option<&QuotaDecision> {
        match (&self.decision, self.cached_at) {
            (Some(decision), Some(cached_at)) => {
                if cached_at.elapsed() < CACHE_DURATION {
                    Some(decision)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Update the cached decision.
    pub fn set(&mut self, decision: QuotaDecision) {
        self.decision = Some(decision);
        self.cached_at = Some(Instant::now());
    }

    /// Clear the cache.
    pub fn clear(&mut self) {
        self.decision = None;
        self.cached_at = None;
    }
}

impl Default for QuotaCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cache_returns_none() {
        let cache = QuotaCache::new();
        assert!(cache.get().is_none());
    }

    #[test]
    fn fresh_decision_is_returned() {
        let mut cache = QuotaCache::new();
        cache.set(QuotaDecision::allowed());
        assert_eq!(cache.get(), Some(&QuotaDecision::allowed()));
    }

    #[test]
    fn clear_drops_decision() {
        let mut cache = QuotaCache::new();
        cache.set(QuotaDecision::denied("exhausted"));
        cache.clear();
        assert!(cache.get().is_none());
    }
}
