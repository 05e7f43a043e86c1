//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

/// Configuration for connecting to SurrealDB.
///
/// Built from `TASKHIVE_DB_*` environment variables via
/// [`DbConfig::from_env`], falling back to local development
/// defaults.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket endpoint (e.g., `127.0.0.1:8000`).
    pub endpoint: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:8000".into(),
            namespace: "taskhive".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Reads the connection settings from the environment. Unset
    /// variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: std::env::var("TASKHIVE_DB_ENDPOINT").unwrap_or(defaults.endpoint),
            namespace: std::env::var("TASKHIVE_DB_NAMESPACE").unwrap_or(defaults.namespace),
            database: std::env::var("TASKHIVE_DB_DATABASE").unwrap_or(defaults.database),
            username: std::env::var("TASKHIVE_DB_USERNAME").unwrap_or(defaults.username),
            password: std::env::var("TASKHIVE_DB_PASSWORD").unwrap_or(defaults.password),
        }
    }
}

/// Manages a connection to SurrealDB.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect to SurrealDB using the provided configuration.
    ///
    /// Authenticates as root, selects the configured namespace and
    /// database, and returns a ready-to-use manager. Repositories are
    /// not handed this client directly; tenant-scoped ones go through
    /// a [`crate::ScopedStore`] built from it.
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        info!(
            endpoint = %config.endpoint,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.endpoint).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Successfully connected to SurrealDB");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
