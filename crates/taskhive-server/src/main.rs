//! TaskHive Server — Application entry point.
//!
//! Connects to SurrealDB, applies migrations, and seeds the
//! permission catalog and global settings. Configuration comes from
//! `TASKHIVE_DB_*` environment variables, falling back to local
//! development defaults.

use taskhive_authz::bootstrap_catalog;
use taskhive_db::{
    DbConfig, DbManager, ScopeRegistry, ScopedStore, SurrealPermissionRepository,
    SurrealRoleRepository, SurrealSettingRepository, run_migrations,
};
use taskhive_settings::{SettingsCache, bootstrap_settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("taskhive=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting TaskHive server...");

    if let Err(e) = run().await {
        tracing::error!(error = %e, "TaskHive server failed");
        std::process::exit(1);
    }

    tracing::info!("TaskHive server stopped.");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = DbConfig::from_env();
    let manager = DbManager::connect(&config).await?;
    let db = manager.client().clone();

    run_migrations(&db).await?;

    let permissions = SurrealPermissionRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    bootstrap_catalog(&permissions, &roles).await?;

    let store = ScopedStore::new(db, ScopeRegistry::with_defaults());
    let settings = SurrealSettingRepository::new(store);
    bootstrap_settings(&settings).await?;

    let cache = SettingsCache::new(settings);
    let security = cache.security_settings().await;
    tracing::info!(
        session_timeout = security.session_timeout,
        max_login_attempts = security.max_login_attempts,
        "Bootstrap complete"
    );

    Ok(())
}
