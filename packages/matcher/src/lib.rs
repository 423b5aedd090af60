//! Matching supervisor.
//!
//! Automates repeated accept-candidate actions against a remote catalog
//! service on behalf of one or more accounts. Each account gets its own
//! [`session::MatchingSession`] — an independent poll → dispatch loop with
//! its own transport and counters — and the [`supervisor::MatchingSupervisor`]
//! keys those sessions by (owner, credential), guaranteeing at most one per
//! account.
//!
//! The crate talks to its surroundings through three seams: a
//! [`catalog::CatalogApi`] transport, a [`config::ConfigProvider`] for the
//! catalog URL, and a [`observer::MatchObserver`] for progress and terminal
//! reports. `matcherd` wires all three to production implementations.

pub mod account;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod error;
pub mod observer;
pub mod pacing;
pub mod session;
pub mod stats;
pub mod supervisor;
pub mod testing;

// Re-exports for clean API
pub use account::{AccountKey, Credential, OwnerId};
pub use batch::{BatchReport, BatchRunner, MAX_IN_FLIGHT};
pub use catalog::{CatalogApi, CatalogApiFactory, MeeffApiFactory};
pub use config::{ConfigProvider, DaemonConfig, StaticConfig};
pub use error::StartError;
pub use observer::{LogObserver, MatchObserver};
pub use session::{MatchingSession, TerminalReason, EMPTY_POLL_LIMIT};
pub use stats::SessionStats;
pub use supervisor::MatchingSupervisor;
