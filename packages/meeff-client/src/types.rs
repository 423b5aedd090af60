use serde::Deserialize;

/// One candidate entity from the explore feed.
///
/// The service sends a large profile document; only the identifier matters
/// here, plus the display name for logging. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Response shape of the explore endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub users: Vec<Candidate>,
}

/// Result of one explore fetch.
///
/// `candidates` is `None` when the response was non-200 or the body did not
/// decode; the raw status and body are preserved either way so callers can
/// classify them.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub body: String,
    pub candidates: Option<Vec<Candidate>>,
}

impl FetchResult {
    /// Ids of the fetched candidates, skipping entities without one.
    pub fn candidate_ids(&self) -> Vec<String> {
        self.candidates
            .as_ref()
            .map(|users| users.iter().filter_map(|u| u.id.clone()).collect())
            .unwrap_or_default()
    }
}
