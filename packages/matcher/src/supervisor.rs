//! Session registry and lifecycle control.
//!
//! The supervisor is the only structure touched from multiple contexts:
//! session tasks deregister themselves on exit and external callers stop
//! sessions or whole owners. Every mutation goes through one `RwLock`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::account::{AccountKey, OwnerId};
use crate::catalog::{CatalogApiFactory, MeeffApiFactory};
use crate::config::ConfigProvider;
use crate::error::StartError;
use crate::observer::MatchObserver;
use crate::session::MatchingSession;

struct SessionHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

type Registry = Arc<RwLock<HashMap<AccountKey, SessionHandle>>>;

pub struct MatchingSupervisor {
    registry: Registry,
    config: Arc<dyn ConfigProvider>,
    observer: Arc<dyn MatchObserver>,
    factory: Arc<dyn CatalogApiFactory>,
}

impl MatchingSupervisor {
    /// Supervisor backed by the production Meeff transport.
    pub fn new(config: Arc<dyn ConfigProvider>, observer: Arc<dyn MatchObserver>) -> Self {
        Self::with_factory(config, observer, Arc::new(MeeffApiFactory))
    }

    /// Supervisor with a custom transport factory (tests, alternate
    /// catalog backends).
    pub fn with_factory(
        config: Arc<dyn ConfigProvider>,
        observer: Arc<dyn MatchObserver>,
        factory: Arc<dyn CatalogApiFactory>,
    ) -> Self {
        Self {
            registry: Arc::new(RwLock::new(HashMap::new())),
            config,
            observer,
            factory,
        }
    }

    /// Start a session for `key`.
    ///
    /// Returns `Ok(false)` without touching anything if the key already has
    /// a live session. A missing or insecure catalog URL fails the start:
    /// the observer receives `on_start_failed` and the error is returned —
    /// no session task is ever spawned.
    pub async fn start(&self, key: AccountKey) -> Result<bool, StartError> {
        if self.registry.read().await.contains_key(&key) {
            return Ok(false);
        }

        let catalog_url = match self.config.catalog_url().await {
            Some(url) => url,
            None => return self.fail_start(key, StartError::ConfigurationMissing).await,
        };
        if catalog_url.scheme() != "https" {
            let err = StartError::InvalidCatalogUrl {
                url: catalog_url.to_string(),
            };
            return self.fail_start(key, err).await;
        }

        let api = match self.factory.create(&key.credential) {
            Ok(api) => api,
            Err(e) => return self.fail_start(key, StartError::Client(e)).await,
        };

        let mut registry = self.registry.write().await;
        // Re-check under the write lock: a concurrent start may have won.
        if registry.contains_key(&key) {
            return Ok(false);
        }

        let cancel = CancellationToken::new();
        let session = MatchingSession::new(
            key.clone(),
            api,
            catalog_url,
            Arc::clone(&self.observer),
        );

        let task = {
            let registry = Arc::clone(&self.registry);
            let observer = Arc::clone(&self.observer);
            let key = key.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let (stats, reason) = session.run(cancel).await;
                // Deregister before reporting: the terminated callback must
                // observe the key as no longer running.
                registry.write().await.remove(&key);
                observer.on_session_terminated(&key, stats, reason).await;
            })
        };

        registry.insert(key, SessionHandle { cancel, task });
        Ok(true)
    }

    /// Cancel and deregister one session. Returns whether it was present.
    ///
    /// The session task unwinds cooperatively and emits its own
    /// terminated-session report with reason "stopped by request".
    pub async fn stop(&self, key: &AccountKey) -> bool {
        match self.registry.write().await.remove(key) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Registry membership check.
    pub async fn is_running(&self, key: &AccountKey) -> bool {
        self.registry.read().await.contains_key(key)
    }

    /// Stop every session belonging to `owner`. Returns how many were
    /// stopped.
    pub async fn stop_all_for(&self, owner: OwnerId) -> usize {
        let mut registry = self.registry.write().await;
        let keys: Vec<AccountKey> = registry
            .keys()
            .filter(|key| key.owner == owner)
            .cloned()
            .collect();
        for key in &keys {
            if let Some(handle) = registry.remove(key) {
                handle.cancel.cancel();
            }
        }
        keys.len()
    }

    /// Live session count across all owners.
    pub async fn session_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Cancel everything and wait for every session task to unwind.
    pub async fn shutdown(&self) {
        let handles: Vec<SessionHandle> = {
            let mut registry = self.registry.write().await;
            registry.drain().map(|(_, handle)| handle).collect()
        };
        for handle in &handles {
            handle.cancel.cancel();
        }
        for handle in handles {
            if let Err(e) = handle.task.await {
                tracing::warn!(error = %e, "session task failed to join");
            }
        }
    }

    async fn fail_start(&self, key: AccountKey, error: StartError) -> Result<bool, StartError> {
        self.observer.on_start_failed(&key, &error).await;
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Credential;
    use crate::config::StaticConfig;
    use crate::session::TerminalReason;
    use crate::testing::{pages, FixedApiFactory, RecordingObserver, ScriptedCatalog};
    use std::time::Duration;
    use url::Url;

    fn key(owner: i64, token: &str) -> AccountKey {
        AccountKey::new(OwnerId(owner), Credential::new(token))
    }

    fn config() -> Arc<StaticConfig> {
        Arc::new(StaticConfig::new(Some(
            Url::parse("https://api.example.com/explore").unwrap(),
        )))
    }

    fn supervisor(
        api: Arc<ScriptedCatalog>,
        observer: Arc<RecordingObserver>,
    ) -> MatchingSupervisor {
        MatchingSupervisor::with_factory(config(), observer, Arc::new(FixedApiFactory(api)))
    }

    async fn wait_for_termination(observer: &RecordingObserver) {
        while observer.terminated().is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent_per_key() {
        let api = Arc::new(ScriptedCatalog::new().with_accept_latency(Duration::from_secs(1)));
        // Keep the session busy so the second start sees it live.
        api.queue_fetch(pages::with_ids(&["a", "b", "c"]));
        let observer = Arc::new(RecordingObserver::default());
        let sup = supervisor(api, observer);

        assert!(sup.start(key(1, "tok-a")).await.unwrap());
        assert!(!sup.start(key(1, "tok-a")).await.unwrap());
        assert!(sup.is_running(&key(1, "tok-a")).await);

        sup.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn missing_config_fails_start_with_notice() {
        let api = Arc::new(ScriptedCatalog::new());
        let observer = Arc::new(RecordingObserver::default());
        let sup = MatchingSupervisor::with_factory(
            Arc::new(StaticConfig::missing()),
            observer.clone(),
            Arc::new(FixedApiFactory(api)),
        );

        let result = sup.start(key(1, "tok-a")).await;

        assert!(matches!(result, Err(StartError::ConfigurationMissing)));
        assert!(!sup.is_running(&key(1, "tok-a")).await);
        assert_eq!(observer.start_failures().len(), 1);
        // A failed start produces no terminated-session report.
        assert!(observer.terminated().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn insecure_catalog_url_fails_start() {
        let api = Arc::new(ScriptedCatalog::new());
        let observer = Arc::new(RecordingObserver::default());
        let sup = MatchingSupervisor::with_factory(
            Arc::new(StaticConfig::new(Some(
                Url::parse("http://api.example.com/explore").unwrap(),
            ))),
            observer.clone(),
            Arc::new(FixedApiFactory(api)),
        );

        let result = sup.start(key(1, "tok-a")).await;

        assert!(matches!(result, Err(StartError::InvalidCatalogUrl { .. })));
        assert_eq!(observer.start_failures().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_and_reports_user_requested() {
        let api = Arc::new(ScriptedCatalog::new().with_accept_latency(Duration::from_secs(1)));
        api.queue_fetch(pages::with_ids(&["a", "b", "c", "d", "e"]));
        let observer = Arc::new(RecordingObserver::default());
        let sup = supervisor(api.clone(), observer.clone());

        sup.start(key(1, "tok-a")).await.unwrap();
        // Let the session get into its batch.
        while api.accepted_ids().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(sup.stop(&key(1, "tok-a")).await);
        assert!(!sup.is_running(&key(1, "tok-a")).await);
        sup.shutdown().await;

        // shutdown() already drained the registry, but the stopped task
        // keeps running detached; its report still lands.
        wait_for_termination(&observer).await;
        let (_, reason) = observer.terminated().expect("terminated report");
        assert_eq!(reason, TerminalReason::UserRequested);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_unknown_key_returns_false() {
        let api = Arc::new(ScriptedCatalog::new());
        let observer = Arc::new(RecordingObserver::default());
        let sup = supervisor(api, observer);

        assert!(!sup.stop(&key(1, "never-started")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_for_scopes_to_owner() {
        let api = Arc::new(ScriptedCatalog::new().with_accept_latency(Duration::from_secs(5)));
        for _ in 0..3 {
            api.queue_fetch(pages::with_ids(&["a", "b"]));
        }
        let observer = Arc::new(RecordingObserver::default());
        let sup = supervisor(api, observer);

        sup.start(key(1, "tok-a")).await.unwrap();
        sup.start(key(1, "tok-b")).await.unwrap();
        sup.start(key(2, "tok-c")).await.unwrap();

        assert_eq!(sup.stop_all_for(OwnerId(1)).await, 2);
        assert!(!sup.is_running(&key(1, "tok-a")).await);
        assert!(!sup.is_running(&key(1, "tok-b")).await);
        assert!(sup.is_running(&key(2, "tok-c")).await);

        sup.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn session_deregisters_itself_on_terminal_condition() {
        let api = Arc::new(ScriptedCatalog::new());
        api.queue_fetch(pages::status(401, "unauthorized"));
        let observer = Arc::new(RecordingObserver::default());
        let sup = supervisor(api, observer.clone());

        sup.start(key(1, "tok-a")).await.unwrap();
        wait_for_termination(&observer).await;

        let (_, reason) = observer.terminated().expect("terminated report");
        assert_eq!(reason, TerminalReason::TokenExpired);
        assert_eq!(sup.session_count().await, 0);
    }
}
