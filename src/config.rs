use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Google sign-in credentials. Absent when either id or secret is unset.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub visualizations_dir: PathBuf,
}

impl StorageConfig {
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            uploads_dir: root.join("uploads"),
            processed_dir: root.join("processed"),
            visualizations_dir: root.join("visualizations"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub google: Option<GoogleConfig>,
    pub storage: StorageConfig,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://preproai.db".into());
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET").context("SESSION_SECRET must be set")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "preproai".into()),
            audience: std::env::var("SESSION_AUDIENCE")
                .unwrap_or_else(|_| "preproai-web".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };

        let google = match (
            std::env::var("GOOGLE_CLIENT_ID").ok().filter(|v| !v.is_empty()),
            std::env::var("GOOGLE_CLIENT_SECRET").ok().filter(|v| !v.is_empty()),
        ) {
            (Some(client_id), Some(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_url: std::env::var("GOOGLE_REDIRECT_URL").unwrap_or_else(|_| {
                    "http://localhost:8080/auth/google/callback".into()
                }),
            }),
            _ => None,
        };

        let storage =
            StorageConfig::under(std::env::var("DATA_DIR").unwrap_or_else(|_| ".".into()));

        let max_upload_mb = std::env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(50);

        Ok(Self {
            database_url,
            session,
            google,
            storage,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_dirs_hang_off_the_data_root() {
        let cfg = StorageConfig::under("/srv/data");
        assert_eq!(cfg.uploads_dir, PathBuf::from("/srv/data/uploads"));
        assert_eq!(cfg.processed_dir, PathBuf::from("/srv/data/processed"));
        assert_eq!(
            cfg.visualizations_dir,
            PathBuf::from("/srv/data/visualizations")
        );
    }
}
