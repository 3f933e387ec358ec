use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::oauth::{GoogleProvider, IdentityProvider};
use crate::config::AppConfig;
use crate::db;
use crate::storage::{LocalStorage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    /// `None` when Google credentials are not configured.
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = db::connect(&config.database_url).await?;

        let storage = Arc::new(LocalStorage::new(&config.storage).await?) as Arc<dyn StorageClient>;

        let identity = config
            .google
            .clone()
            .map(|google| Arc::new(GoogleProvider::new(google)) as Arc<dyn IdentityProvider>);
        if identity.is_none() {
            tracing::info!("google sign-in disabled: client id/secret not set");
        }

        Ok(Self {
            db,
            config,
            storage,
            identity,
        })
    }

    pub fn from_parts(
        db: SqlitePool,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self {
            db,
            config,
            storage,
            identity,
        }
    }

    /// In-memory database and on-disk storage under `root`.
    #[cfg(test)]
    pub async fn for_tests(root: &std::path::Path) -> Self {
        use crate::config::{SessionConfig, StorageConfig};

        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            session: SessionConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            google: None,
            storage: StorageConfig::under(root),
            max_upload_bytes: 1024 * 1024,
        });
        let storage = Arc::new(
            LocalStorage::new(&config.storage)
                .await
                .expect("test storage dirs"),
        ) as Arc<dyn StorageClient>;

        Self::from_parts(db::memory().await, config, storage, None)
    }
}
