//! Observer seam.
//!
//! The core pushes lifecycle and progress events through this trait and
//! never waits for acknowledgment beyond the callback future completing —
//! implementations must hand off quickly (log, enqueue, notify) rather
//! than block.

use async_trait::async_trait;

use crate::account::AccountKey;
use crate::error::StartError;
use crate::session::TerminalReason;
use crate::stats::SessionStats;

/// Callbacks for one session's lifecycle. All methods default to no-ops so
/// observers implement only what they render.
#[async_trait]
pub trait MatchObserver: Send + Sync {
    async fn on_session_started(&self, _key: &AccountKey) {}

    /// Emitted once per completed cycle with a snapshot of the counters.
    async fn on_progress(&self, _key: &AccountKey, _stats: SessionStats) {}

    /// Emitted exactly once, after the session has left the registry.
    async fn on_session_terminated(
        &self,
        _key: &AccountKey,
        _stats: SessionStats,
        _reason: TerminalReason,
    ) {
    }

    /// Emitted when a session could not start at all. No terminated-session
    /// report follows.
    async fn on_start_failed(&self, _key: &AccountKey, _error: &StartError) {}
}

/// Observer that renders everything as structured tracing events. Used by
/// `matcherd`; a chat front end would substitute its own implementation.
pub struct LogObserver;

#[async_trait]
impl MatchObserver for LogObserver {
    async fn on_session_started(&self, key: &AccountKey) {
        tracing::info!(account = %key, "matching session started");
    }

    async fn on_progress(&self, key: &AccountKey, stats: SessionStats) {
        tracing::info!(
            account = %key,
            requests = stats.requests_sent,
            cycles = stats.cycles_completed,
            matched = stats.matched,
            errors = stats.errors,
            "cycle complete"
        );
    }

    async fn on_session_terminated(
        &self,
        key: &AccountKey,
        stats: SessionStats,
        reason: TerminalReason,
    ) {
        tracing::info!(
            account = %key,
            reason = %reason,
            requests = stats.requests_sent,
            cycles = stats.cycles_completed,
            matched = stats.matched,
            errors = stats.errors,
            "matching session ended"
        );
    }

    async fn on_start_failed(&self, key: &AccountKey, error: &StartError) {
        tracing::error!(account = %key, error = %error, "matching session failed to start");
    }
}
