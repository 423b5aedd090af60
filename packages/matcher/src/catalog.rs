//! Seam over the remote catalog client.

use std::sync::Arc;

use async_trait::async_trait;
use meeff_client::{FetchResult, MeeffClient, MeeffError, Outcome};
use url::Url;

use crate::account::Credential;

/// Trait for the catalog service transport (to allow mocking).
///
/// One implementor instance belongs to exactly one session; the connection
/// pool behind it is never shared across sessions.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// One GET against the explore endpoint.
    async fn fetch_candidates(&self, url: &Url) -> Result<FetchResult, MeeffError>;

    /// One accept-action for the candidate, classified.
    async fn accept(&self, candidate_id: &str) -> Result<Outcome, MeeffError>;
}

#[async_trait]
impl CatalogApi for MeeffClient {
    async fn fetch_candidates(&self, url: &Url) -> Result<FetchResult, MeeffError> {
        MeeffClient::fetch_candidates(self, url).await
    }

    async fn accept(&self, candidate_id: &str) -> Result<Outcome, MeeffError> {
        MeeffClient::accept(self, candidate_id).await
    }
}

/// Builds one transport per credential at session start.
pub trait CatalogApiFactory: Send + Sync {
    fn create(&self, credential: &Credential) -> Result<Arc<dyn CatalogApi>, MeeffError>;
}

/// Production factory backed by [`MeeffClient`].
pub struct MeeffApiFactory;

impl CatalogApiFactory for MeeffApiFactory {
    fn create(&self, credential: &Credential) -> Result<Arc<dyn CatalogApi>, MeeffError> {
        Ok(Arc::new(MeeffClient::new(credential.secret())?))
    }
}
