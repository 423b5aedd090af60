//! Pure Meeff REST API client.
//!
//! A minimal client for the Meeff catalog API. Supports fetching the
//! explore feed of candidate profiles and dispatching one accept-action
//! per candidate.
//!
//! The client holds one `reqwest::Client` with keep-alive connection reuse
//! and the account's access token baked into the default headers — build
//! one client per account and keep it for the account's whole run.
//!
//! # Example
//!
//! ```rust,ignore
//! use meeff_client::MeeffClient;
//!
//! let client = MeeffClient::new("access-token")?;
//!
//! let page = client.fetch_candidates(&explore_url).await?;
//! for id in page.candidate_ids() {
//!     let outcome = client.accept(&id).await?;
//!     println!("{id}: {outcome:?}");
//! }
//! ```

pub mod classify;
pub mod error;
pub mod types;

pub use classify::{classify, Outcome, AUTH_REQUIRED_MARKER, LIKE_EXCEEDED_MARKER};
pub use error::{MeeffError, Result};
pub use types::{Candidate, CatalogPage, FetchResult};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

/// Accept-action endpoint. `isOkay=1` marks the answer as an accept.
const ACCEPT_URL: &str = "https://api.meeff.com/user/undoableAnswer/v5/";

/// Header carrying the account's access token.
const ACCESS_TOKEN_HEADER: &str = "meeff-access-token";

/// Total per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MeeffClient {
    client: reqwest::Client,
}

impl MeeffClient {
    /// Build a client for one account.
    ///
    /// The service only answers requests that look like its wrapped mobile
    /// client, so the user agent and accept headers are fixed.
    pub fn new(credential: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "User-Agent",
            HeaderValue::from_static("okhttp/5.1.0 (Linux; Android 13)"),
        );
        headers.insert(
            "Accept",
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            "Accept-Language",
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert("Connection", HeaderValue::from_static("keep-alive"));
        headers.insert(ACCESS_TOKEN_HEADER, HeaderValue::from_str(credential)?);

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch one page of candidates from the explore endpoint.
    ///
    /// Returns `Err` only for transport-level failures. A non-200 response
    /// or an undecodable body comes back as a [`FetchResult`] with
    /// `candidates: None` and the raw status/body preserved for the caller
    /// to classify.
    pub async fn fetch_candidates(&self, url: &Url) -> Result<FetchResult> {
        let resp = self.client.get(url.clone()).send().await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;

        if status != 200 {
            tracing::debug!(status, "explore fetch returned non-200");
            return Ok(FetchResult {
                status,
                body,
                candidates: None,
            });
        }

        let candidates = match serde_json::from_str::<CatalogPage>(&body) {
            Ok(page) => Some(page.users),
            Err(e) => {
                tracing::debug!(error = %e, "explore body did not decode");
                None
            }
        };

        Ok(FetchResult {
            status,
            body,
            candidates,
        })
    }

    /// Dispatch one accept-action and classify the response.
    ///
    /// `Err` means the request never produced a response (timeout,
    /// connection error); any actual response — success or rejection — is
    /// an `Ok` with its classified [`Outcome`].
    pub async fn accept(&self, candidate_id: &str) -> Result<Outcome> {
        let url = format!("{ACCEPT_URL}?userId={candidate_id}&isOkay=1");
        let resp = self.client.get(&url).send().await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;

        let outcome = classify(status, &body);
        tracing::trace!(candidate_id, status, outcome = ?outcome, "accept dispatched");
        Ok(outcome)
    }
}
