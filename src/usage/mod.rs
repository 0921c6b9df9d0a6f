//! Usage/quota collaborator for streaming sessions.
//!
//! This module provides:
//! - The [`UsageTracker`] seam the connection client calls before opening a
//!   session (quota gate) and after every close (session accounting)
//! - An HTTP implementation against the usage service
//! - Caching of quota decisions to avoid API spam

mod cache;
mod client;
mod types;

pub use cache::QuotaCache;
pub use client::{HttpUsageTracker, NullUsageTracker, UsageTracker};
pub use types::{QuotaDecision, QuotaResponse, SessionUsage};
