use serde::Serialize;

/// Per-session counters.
///
/// Reset only at session creation; observers receive copies, never shared
/// references, so a snapshot in flight stays consistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Accept-actions issued (entities without an id are never counted).
    pub requests_sent: u64,
    /// Full fetch-then-dispatch cycles completed without a terminal signal.
    pub cycles_completed: u64,
    /// Transport-level failures absorbed at either boundary.
    pub errors: u64,
    /// Dispatches whose classified outcome was a soft-success `Continue`.
    pub matched: u64,
}
