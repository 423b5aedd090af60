//! Test support: a scripted catalog transport and a recording observer.
//!
//! Everything here is deterministic and in-memory so session and
//! supervisor behavior can be asserted without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use meeff_client::{Candidate, FetchResult, MeeffError, Outcome};
use url::Url;

use crate::account::{AccountKey, Credential};
use crate::catalog::{CatalogApi, CatalogApiFactory};
use crate::error::StartError;
use crate::observer::MatchObserver;
use crate::session::TerminalReason;
use crate::stats::SessionStats;

/// Canned [`FetchResult`] builders.
pub mod pages {
    use super::*;

    /// A 200 with no candidates.
    pub fn empty() -> FetchResult {
        FetchResult {
            status: 200,
            body: r#"{"users":[]}"#.to_string(),
            candidates: Some(Vec::new()),
        }
    }

    /// A 200 carrying one candidate per id.
    pub fn with_ids(ids: &[&str]) -> FetchResult {
        with_optional_ids(&ids.iter().map(|id| Some(*id)).collect::<Vec<_>>())
    }

    /// A 200 whose entities may lack identifiers.
    pub fn with_optional_ids(ids: &[Option<&str>]) -> FetchResult {
        let users: Vec<Candidate> = ids
            .iter()
            .map(|id| Candidate {
                id: id.map(str::to_string),
                name: None,
            })
            .collect();
        FetchResult {
            status: 200,
            body: String::new(),
            candidates: Some(users),
        }
    }

    /// An arbitrary raw response (no decoded candidates).
    pub fn status(status: u16, body: &str) -> FetchResult {
        FetchResult {
            status,
            body: body.to_string(),
            candidates: None,
        }
    }
}

/// One entry in the dispatch log: a dispatch either starting or resolving.
#[derive(Debug, Clone)]
pub struct DispatchEvent {
    pub candidate_id: String,
    /// `true` when the dispatch was issued, `false` when it resolved.
    pub started: bool,
}

/// Scripted [`CatalogApi`]: fetches and accept outcomes are served from
/// queues, with an empty page / `Continue` once a queue runs dry. The dry
/// fetch default means an unscripted tail ends a session through the
/// empty-poll limit rather than hanging a test.
#[derive(Default)]
pub struct ScriptedCatalog {
    fetches: Mutex<VecDeque<Result<FetchResult, MeeffError>>>,
    accepts: Mutex<VecDeque<Result<Outcome, MeeffError>>>,
    dispatch_log: Mutex<Vec<DispatchEvent>>,
    fetch_count: Mutex<usize>,
    accept_latency: Option<Duration>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every accept take this long before resolving.
    pub fn with_accept_latency(mut self, latency: Duration) -> Self {
        self.accept_latency = Some(latency);
        self
    }

    pub fn queue_fetch(&self, result: FetchResult) {
        self.fetches.lock().unwrap().push_back(Ok(result));
    }

    pub fn queue_fetch_error(&self, error: MeeffError) {
        self.fetches.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_accepts(&self, outcomes: Vec<Result<Outcome, MeeffError>>) {
        self.accepts.lock().unwrap().extend(outcomes);
    }

    /// Ids of all dispatches issued, in issuance order.
    pub fn accepted_ids(&self) -> Vec<String> {
        self.dispatch_log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.started)
            .map(|e| e.candidate_id.clone())
            .collect()
    }

    pub fn dispatch_log(&self) -> Vec<DispatchEvent> {
        self.dispatch_log.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetch_count.lock().unwrap()
    }

    fn log(&self, candidate_id: &str, started: bool) {
        self.dispatch_log.lock().unwrap().push(DispatchEvent {
            candidate_id: candidate_id.to_string(),
            started,
        });
    }
}

#[async_trait]
impl CatalogApi for ScriptedCatalog {
    async fn fetch_candidates(&self, _url: &Url) -> Result<FetchResult, MeeffError> {
        *self.fetch_count.lock().unwrap() += 1;
        self.fetches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(pages::empty()))
    }

    async fn accept(&self, candidate_id: &str) -> Result<Outcome, MeeffError> {
        self.log(candidate_id, true);
        if let Some(latency) = self.accept_latency {
            tokio::time::sleep(latency).await;
        }
        let outcome = self
            .accepts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Outcome::Continue));
        self.log(candidate_id, false);
        outcome
    }
}

/// Factory that hands the same transport to every session.
pub struct FixedApiFactory(pub Arc<dyn CatalogApi>);

impl CatalogApiFactory for FixedApiFactory {
    fn create(&self, _credential: &Credential) -> Result<Arc<dyn CatalogApi>, MeeffError> {
        Ok(Arc::clone(&self.0))
    }
}

/// Everything an observer can be told, in arrival order.
#[derive(Debug, Clone)]
pub enum ObservedEvent {
    Started(AccountKey),
    Progress(AccountKey, SessionStats),
    Terminated(AccountKey, SessionStats, TerminalReason),
    StartFailed(AccountKey, String),
}

/// Observer that records every callback for later inspection.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, ObservedEvent::Started(_)))
    }

    pub fn progress_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ObservedEvent::Progress(..)))
            .count()
    }

    /// Final stats and reason of the first terminated-session report.
    pub fn terminated(&self) -> Option<(SessionStats, TerminalReason)> {
        self.events().iter().find_map(|e| match e {
            ObservedEvent::Terminated(_, stats, reason) => Some((*stats, *reason)),
            _ => None,
        })
    }

    pub fn start_failures(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                ObservedEvent::StartFailed(_, message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl MatchObserver for RecordingObserver {
    async fn on_session_started(&self, key: &AccountKey) {
        self.events
            .lock()
            .unwrap()
            .push(ObservedEvent::Started(key.clone()));
    }

    async fn on_progress(&self, key: &AccountKey, stats: SessionStats) {
        self.events
            .lock()
            .unwrap()
            .push(ObservedEvent::Progress(key.clone(), stats));
    }

    async fn on_session_terminated(
        &self,
        key: &AccountKey,
        stats: SessionStats,
        reason: TerminalReason,
    ) {
        self.events
            .lock()
            .unwrap()
            .push(ObservedEvent::Terminated(key.clone(), stats, reason));
    }

    async fn on_start_failed(&self, key: &AccountKey, error: &StartError) {
        self.events
            .lock()
            .unwrap()
            .push(ObservedEvent::StartFailed(key.clone(), error.to_string()));
    }
}
