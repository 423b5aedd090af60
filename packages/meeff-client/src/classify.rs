//! Response classification.
//!
//! Maps a raw HTTP response (status code + body text) onto the small set of
//! signals the matching loop acts on. The service sometimes returns its
//! rejection markers behind remapped status codes (CDN and proxy layers), so
//! the body substring check is ORed with the status code on both branches.

/// Body marker the service emits when the access token is rejected.
pub const AUTH_REQUIRED_MARKER: &str = "AuthRequired";

/// Body marker the service emits when the daily accept quota is exhausted.
pub const LIKE_EXCEEDED_MARKER: &str = "LikeExceeded";

/// Classified signal for one remote response.
///
/// `SoftError` is never produced by [`classify`]; it is how callers encode a
/// swallowed transport failure (the dispatch was attempted, nothing can be
/// said about the response). `Continue` covers every response that carries
/// neither rejection marker — including 4xx/5xx noise the service is known
/// to emit mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    SoftError,
    AuthExpired,
    RateLimited,
}

impl Outcome {
    /// Whether this outcome ends the session that observed it.
    pub fn is_terminal(self) -> bool {
        matches!(self, Outcome::AuthExpired | Outcome::RateLimited)
    }
}

/// Classify one response. Pure and deterministic.
///
/// Precedence is fixed: auth expiry is checked before rate limiting, which
/// is checked before the continuable default.
pub fn classify(status: u16, body: &str) -> Outcome {
    if status == 401 || body.contains(AUTH_REQUIRED_MARKER) {
        return Outcome::AuthExpired;
    }
    if status == 429 || body.contains(LIKE_EXCEEDED_MARKER) {
        return Outcome::RateLimited;
    }
    Outcome::Continue
}
