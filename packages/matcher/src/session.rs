//! One account's matching lifecycle.
//!
//! A session owns its transport, its statistics, and the poll → dispatch
//! loop. It runs until the remote side signals a stop condition, the
//! catalog dries up, or it is cancelled from outside; nothing a session
//! encounters ever crashes the process.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use meeff_client::{classify, Outcome};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::account::AccountKey;
use crate::batch::BatchRunner;
use crate::catalog::CatalogApi;
use crate::observer::MatchObserver;
use crate::pacing;
use crate::stats::SessionStats;

/// Consecutive empty polls before the session gives up on the catalog.
pub const EMPTY_POLL_LIMIT: u32 = 6;

/// Why a session ended. One of these accompanies every terminated-session
/// report; external cancellation maps to `UserRequested`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    TokenExpired,
    LimitExceeded,
    NoUsersFound,
    UserRequested,
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminalReason::TokenExpired => "Token expired",
            TerminalReason::LimitExceeded => "Daily limit reached",
            TerminalReason::NoUsersFound => "No users found repeatedly",
            TerminalReason::UserRequested => "Matching stopped",
        };
        f.write_str(text)
    }
}

pub struct MatchingSession {
    key: AccountKey,
    api: Arc<dyn CatalogApi>,
    catalog_url: Url,
    observer: Arc<dyn MatchObserver>,
    batch: BatchRunner,
    stats: SessionStats,
}

impl MatchingSession {
    pub fn new(
        key: AccountKey,
        api: Arc<dyn CatalogApi>,
        catalog_url: Url,
        observer: Arc<dyn MatchObserver>,
    ) -> Self {
        Self {
            key,
            api,
            catalog_url,
            observer,
            batch: BatchRunner::new(),
            stats: SessionStats::default(),
        }
    }

    /// Run the session to completion.
    ///
    /// The caller (supervisor task) is responsible for deregistering the
    /// session and emitting the terminated report with the returned values
    /// — removal must happen first, so the counters and reason travel back
    /// instead of being consumed here.
    pub async fn run(mut self, cancel: CancellationToken) -> (SessionStats, TerminalReason) {
        self.observer.on_session_started(&self.key).await;

        let mut empty_polls: u32 = 0;

        let reason = loop {
            if cancel.is_cancelled() {
                break TerminalReason::UserRequested;
            }

            // Polling
            let fetched = tokio::select! {
                _ = cancel.cancelled() => break TerminalReason::UserRequested,
                result = self.api.fetch_candidates(&self.catalog_url) => result,
            };

            let page = match fetched {
                Ok(page) => page,
                Err(e) => {
                    // Transport failure: count it and re-poll. Not an empty
                    // poll — the catalog said nothing either way.
                    self.stats.errors += 1;
                    tracing::warn!(account = %self.key, error = %e, "explore fetch failed");
                    if !self.pause(&cancel, pacing::empty_poll_delay()).await {
                        break TerminalReason::UserRequested;
                    }
                    continue;
                }
            };

            if classify(page.status, &page.body) == Outcome::AuthExpired {
                break TerminalReason::TokenExpired;
            }

            let candidate_ids = page.candidate_ids();
            if candidate_ids.is_empty() {
                empty_polls += 1;
                tracing::debug!(account = %self.key, empty_polls, "empty poll");
                if empty_polls >= EMPTY_POLL_LIMIT {
                    break TerminalReason::NoUsersFound;
                }
                if !self.pause(&cancel, pacing::empty_poll_delay()).await {
                    break TerminalReason::UserRequested;
                }
                continue;
            }
            empty_polls = 0;

            // Dispatching
            let report = self
                .batch
                .run(Arc::clone(&self.api), &candidate_ids, &cancel)
                .await;
            self.stats.requests_sent += report.dispatched;
            self.stats.errors += report.errors;
            self.stats.matched += report.matched;

            match report.first_terminal() {
                Some(Outcome::AuthExpired) => break TerminalReason::TokenExpired,
                Some(Outcome::RateLimited) => break TerminalReason::LimitExceeded,
                _ => {}
            }
            if cancel.is_cancelled() {
                // The batch was cut short; its issued dispatches are
                // already counted.
                break TerminalReason::UserRequested;
            }

            self.stats.cycles_completed += 1;
            self.observer.on_progress(&self.key, self.stats).await;

            if !self.pause(&cancel, pacing::cycle_delay()).await {
                break TerminalReason::UserRequested;
            }
        };

        tracing::debug!(account = %self.key, reason = %reason, "session loop exited");
        (self.stats, reason)
    }

    /// Sleep unless cancelled first. Returns `false` on cancellation.
    async fn pause(&self, cancel: &CancellationToken, duration: Duration) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Credential, OwnerId};
    use crate::testing::{pages, RecordingObserver, ScriptedCatalog};
    use meeff_client::MeeffError;

    fn key() -> AccountKey {
        AccountKey::new(OwnerId(7), Credential::new("test-token-abcdef"))
    }

    fn explore_url() -> Url {
        Url::parse("https://api.example.com/explore").unwrap()
    }

    fn session(api: Arc<ScriptedCatalog>, observer: Arc<RecordingObserver>) -> MatchingSession {
        MatchingSession::new(key(), api, explore_url(), observer)
    }

    #[tokio::test(start_paused = true)]
    async fn six_consecutive_empty_polls_terminate_without_dispatching() {
        let api = Arc::new(ScriptedCatalog::new());
        let observer = Arc::new(RecordingObserver::default());
        // Script nothing: every poll comes back empty.

        let (stats, reason) = session(api.clone(), observer.clone())
            .run(CancellationToken::new())
            .await;

        assert_eq!(reason, TerminalReason::NoUsersFound);
        assert_eq!(stats.requests_sent, 0);
        assert_eq!(stats.cycles_completed, 0);
        assert!(api.accepted_ids().is_empty());
        assert_eq!(api.fetch_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn full_cycle_counts_and_reports_progress() {
        let api = Arc::new(ScriptedCatalog::new());
        api.queue_fetch(pages::with_ids(&["a", "b", "c"]));
        let observer = Arc::new(RecordingObserver::default());

        let (stats, reason) = session(api.clone(), observer.clone())
            .run(CancellationToken::new())
            .await;

        // One full cycle, then the scripted feed dries up.
        assert_eq!(reason, TerminalReason::NoUsersFound);
        assert_eq!(stats.requests_sent, 3);
        assert_eq!(stats.cycles_completed, 1);
        assert_eq!(stats.matched, 3);
        assert_eq!(stats.errors, 0);
        assert_eq!(observer.progress_count(), 1);
        assert!(observer.started());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_counter_resets_on_candidates() {
        let api = Arc::new(ScriptedCatalog::new());
        for _ in 0..5 {
            api.queue_fetch(pages::empty());
        }
        api.queue_fetch(pages::with_ids(&["a"]));
        // Feed exhausts afterwards: six more empty polls end the session.
        let observer = Arc::new(RecordingObserver::default());

        let (stats, reason) = session(api.clone(), observer.clone())
            .run(CancellationToken::new())
            .await;

        assert_eq!(reason, TerminalReason::NoUsersFound);
        // The 6th poll had a candidate, so the counter reset: the session
        // dispatched once and went through six further empty polls.
        assert_eq!(stats.requests_sent, 1);
        assert_eq!(stats.cycles_completed, 1);
        assert_eq!(api.fetch_count(), 5 + 1 + 6);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_expired_fetch_terminates_with_token_expired() {
        let api = Arc::new(ScriptedCatalog::new());
        api.queue_fetch(pages::status(401, "unauthorized"));
        let observer = Arc::new(RecordingObserver::default());

        let (stats, reason) = session(api.clone(), observer.clone())
            .run(CancellationToken::new())
            .await;

        assert_eq!(reason, TerminalReason::TokenExpired);
        assert_eq!(stats.requests_sent, 0);
        assert!(api.accepted_ids().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn auth_marker_in_fetch_body_terminates() {
        let api = Arc::new(ScriptedCatalog::new());
        api.queue_fetch(pages::status(200, "{\"errorCode\":\"AuthRequired\"}"));
        let observer = Arc::new(RecordingObserver::default());

        let (_, reason) = session(api, observer).run(CancellationToken::new()).await;

        assert_eq!(reason, TerminalReason::TokenExpired);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_expired_dispatch_terminates_after_batch() {
        let api = Arc::new(ScriptedCatalog::new());
        api.queue_fetch(pages::with_ids(&["a", "b", "c"]));
        api.queue_accepts(vec![
            Ok(Outcome::Continue),
            Ok(Outcome::AuthExpired),
            Ok(Outcome::Continue),
        ]);
        let observer = Arc::new(RecordingObserver::default());

        let (stats, reason) = session(api.clone(), observer.clone())
            .run(CancellationToken::new())
            .await;

        assert_eq!(reason, TerminalReason::TokenExpired);
        // The whole group still resolved and was counted.
        assert_eq!(stats.requests_sent, 3);
        assert_eq!(stats.matched, 2);
        assert_eq!(stats.cycles_completed, 0);
        assert_eq!(observer.progress_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_dispatch_terminates_with_limit_exceeded() {
        let api = Arc::new(ScriptedCatalog::new());
        api.queue_fetch(pages::with_ids(&["a"]));
        api.queue_accepts(vec![Ok(Outcome::RateLimited)]);
        let observer = Arc::new(RecordingObserver::default());

        let (_, reason) = session(api, observer).run(CancellationToken::new()).await;

        assert_eq!(reason, TerminalReason::LimitExceeded);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_transport_error_is_counted_and_survived() {
        let api = Arc::new(ScriptedCatalog::new());
        api.queue_fetch_error(MeeffError::Api {
            status: 0,
            message: "connection reset".into(),
        });
        let observer = Arc::new(RecordingObserver::default());

        let (stats, reason) = session(api.clone(), observer.clone())
            .run(CancellationToken::new())
            .await;

        // The error poll is followed by six scripted-empty polls.
        assert_eq!(reason, TerminalReason::NoUsersFound);
        assert_eq!(stats.errors, 1);
        assert_eq!(api.fetch_count(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn entities_without_ids_are_skipped_silently() {
        let api = Arc::new(ScriptedCatalog::new());
        api.queue_fetch(pages::with_optional_ids(&[Some("a"), None, Some("b")]));
        let observer = Arc::new(RecordingObserver::default());

        let (stats, reason) = session(api.clone(), observer.clone())
            .run(CancellationToken::new())
            .await;

        assert_eq!(reason, TerminalReason::NoUsersFound);
        assert_eq!(stats.requests_sent, 2);
        assert_eq!(api.accepted_ids(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_session_stops_immediately() {
        let api = Arc::new(ScriptedCatalog::new());
        api.queue_fetch(pages::with_ids(&["a"]));
        let observer = Arc::new(RecordingObserver::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (stats, reason) = session(api.clone(), observer.clone()).run(cancel).await;

        assert_eq!(reason, TerminalReason::UserRequested);
        assert_eq!(stats.requests_sent, 0);
        assert_eq!(api.fetch_count(), 0);
    }
}
