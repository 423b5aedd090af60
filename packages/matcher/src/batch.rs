//! Bounded-concurrency batch dispatch.
//!
//! Candidates are driven through the accept-action in groups: dispatches
//! inside a group run concurrently up to the in-flight ceiling, and the
//! whole group is awaited before the next group issues — a synchronous
//! barrier, not a sliding window. A randomized pacing delay precedes each
//! issuance so the outbound rate is throttled independent of response
//! latency.

use std::sync::Arc;

use futures::future::join_all;
use meeff_client::Outcome;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogApi;
use crate::pacing;

/// Dispatches in flight at once.
pub const MAX_IN_FLIGHT: usize = 10;

/// Aggregated result of one batch invocation.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Outcomes of every dispatch that resolved, group by group.
    pub outcomes: Vec<Outcome>,
    /// Dispatches issued.
    pub dispatched: u64,
    /// Transport failures swallowed into `SoftError`.
    pub errors: u64,
    /// Soft-success `Continue` outcomes.
    pub matched: u64,
}

impl BatchReport {
    /// First session-terminating outcome in the batch, if any.
    pub fn first_terminal(&self) -> Option<Outcome> {
        self.outcomes.iter().copied().find(|o| o.is_terminal())
    }
}

pub struct BatchRunner {
    max_in_flight: usize,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRunner {
    pub fn new() -> Self {
        Self {
            max_in_flight: MAX_IN_FLIGHT,
        }
    }

    /// Override the in-flight ceiling. Test hook; production uses
    /// [`MAX_IN_FLIGHT`].
    pub fn with_max_in_flight(max_in_flight: usize) -> Self {
        assert!(max_in_flight > 0);
        Self { max_in_flight }
    }

    /// Drive `candidate_ids` through the accept-action.
    ///
    /// A terminal outcome observed at a group barrier aborts the remaining
    /// groups; members of the group that produced it have already resolved.
    /// Cancellation stops issuance between dispatches — anything already in
    /// flight is still awaited so its outcome is counted.
    pub async fn run(
        &self,
        api: Arc<dyn CatalogApi>,
        candidate_ids: &[String],
        cancel: &CancellationToken,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let mut group: Vec<JoinHandle<Outcome>> = Vec::with_capacity(self.max_in_flight);

        for id in candidate_ids {
            // Pace the issuance, bailing out if cancelled mid-wait.
            let cancelled = tokio::select! {
                _ = cancel.cancelled() => true,
                _ = tokio::time::sleep(pacing::dispatch_delay()) => false,
            };
            if cancelled {
                break;
            }

            let api = Arc::clone(&api);
            let id = id.clone();
            group.push(tokio::spawn(async move {
                match api.accept(&id).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::debug!(candidate_id = %id, error = %e, "accept dispatch failed");
                        Outcome::SoftError
                    }
                }
            }));
            report.dispatched += 1;

            if group.len() >= self.max_in_flight {
                Self::drain_group(&mut group, &mut report).await;
                if report.first_terminal().is_some() {
                    return report;
                }
            }
        }

        if !group.is_empty() {
            Self::drain_group(&mut group, &mut report).await;
        }

        report
    }

    async fn drain_group(group: &mut Vec<JoinHandle<Outcome>>, report: &mut BatchReport) {
        for joined in join_all(group.drain(..)).await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(error = %e, "dispatch task failed to join");
                    Outcome::SoftError
                }
            };
            match outcome {
                Outcome::Continue => report.matched += 1,
                Outcome::SoftError => report.errors += 1,
                Outcome::AuthExpired | Outcome::RateLimited => {}
            }
            report.outcomes.push(outcome);
        }
    }
}
