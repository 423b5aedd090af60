// Main entry point for the matching daemon

use std::sync::Arc;

use anyhow::{Context, Result};
use matcher::{
    AccountKey, Credential, DaemonConfig, LogObserver, MatchingSupervisor, OwnerId, StaticConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,matcher=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting matching daemon");

    let config = DaemonConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(tokens = config.tokens.len(), "Configuration loaded");

    let provider = Arc::new(StaticConfig::new(config.catalog_url.clone()));
    let supervisor = MatchingSupervisor::new(provider, Arc::new(LogObserver));

    let owner = OwnerId(config.owner_id);
    let mut started = 0usize;
    for token in &config.tokens {
        let key = AccountKey::new(owner, Credential::new(token.clone()));
        match supervisor.start(key.clone()).await {
            Ok(true) => started += 1,
            Ok(false) => tracing::warn!(account = %key, "session already running"),
            Err(e) => tracing::error!(account = %key, error = %e, "session not started"),
        }
    }
    if started == 0 {
        anyhow::bail!("no matching sessions started");
    }
    tracing::info!(started, "All sessions launched; Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutdown requested, stopping sessions");
    supervisor.stop_all_for(owner).await;
    supervisor.shutdown().await;
    tracing::info!("All sessions stopped");

    Ok(())
}
