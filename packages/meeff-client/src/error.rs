use thiserror::Error;

/// Errors from the Meeff API client.
///
/// `Http` covers transport-level failures (timeout, connection reset, DNS).
/// Callers are expected to absorb these into their own statistics rather
/// than treat them as fatal — a non-2xx *response* is not an error here.
#[derive(Debug, Error)]
pub enum MeeffError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An API surface that could not be interpreted at all.
    #[error("meeff api error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("credential is not a valid header value")]
    InvalidCredential(#[from] reqwest::header::InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, MeeffError>;
