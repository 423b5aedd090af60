use thiserror::Error;

/// Start-time failures.
///
/// These are the only errors `MatchingSupervisor::start` surfaces; once a
/// session is running, every failure either lands in its statistics or
/// resolves to a terminal reason — nothing aborts the process.
#[derive(Debug, Error)]
pub enum StartError {
    /// The configuration provider has no catalog URL. The session never
    /// begins; the observer gets an immediate failure notice instead of a
    /// terminated-session report.
    #[error("no catalog url configured")]
    ConfigurationMissing,

    /// The configured catalog URL does not use a secure scheme.
    #[error("catalog url must use https: {url}")]
    InvalidCatalogUrl { url: String },

    /// The catalog client could not be built for this credential.
    #[error("failed to build catalog client: {0}")]
    Client(#[from] meeff_client::MeeffError),
}
