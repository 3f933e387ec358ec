use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;

use crate::config::StorageConfig;

/// The three on-disk areas. Every name inside them carries the owner prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Uploads,
    Processed,
    Visualizations,
}

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, area: Area, name: &str, body: Bytes) -> anyhow::Result<()>;
    async fn get_object(&self, area: Area, name: &str) -> anyhow::Result<Bytes>;
    async fn exists(&self, area: Area, name: &str) -> anyhow::Result<bool>;
}

/// Local directories. Writes overwrite in place; two requests producing the
/// same name race and the last writer wins.
#[derive(Clone)]
pub struct LocalStorage {
    uploads: PathBuf,
    processed: PathBuf,
    visualizations: PathBuf,
}

impl LocalStorage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        for dir in [&cfg.uploads_dir, &cfg.processed_dir, &cfg.visualizations_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create {}", dir.display()))?;
        }
        Ok(Self {
            uploads: cfg.uploads_dir.clone(),
            processed: cfg.processed_dir.clone(),
            visualizations: cfg.visualizations_dir.clone(),
        })
    }

    fn root(&self, area: Area) -> &Path {
        match area {
            Area::Uploads => &self.uploads,
            Area::Processed => &self.processed,
            Area::Visualizations => &self.visualizations,
        }
    }

    fn path_of(&self, area: Area, name: &str) -> anyhow::Result<PathBuf> {
        anyhow::ensure!(
            crate::files::naming::is_plain_name(name),
            "refusing path-like object name {:?}",
            name
        );
        Ok(self.root(area).join(name))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, area: Area, name: &str, body: Bytes) -> anyhow::Result<()> {
        let path = self.path_of(area, name)?;
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    async fn get_object(&self, area: Area, name: &str) -> anyhow::Result<Bytes> {
        let path = self.path_of(area, name)?;
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        Ok(Bytes::from(data))
    }

    async fn exists(&self, area: Area, name: &str) -> anyhow::Result<bool> {
        let path = self.path_of(area, name)?;
        tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("stat {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_in_each_area() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(&StorageConfig::under(dir.path()))
            .await
            .unwrap();

        storage
            .put_object(Area::Processed, "3__cleaned_a.csv", Bytes::from_static(b"x\n1\n"))
            .await
            .unwrap();

        assert!(storage.exists(Area::Processed, "3__cleaned_a.csv").await.unwrap());
        assert!(!storage.exists(Area::Uploads, "3__cleaned_a.csv").await.unwrap());
        let body = storage
            .get_object(Area::Processed, "3__cleaned_a.csv")
            .await
            .unwrap();
        assert_eq!(&body[..], b"x\n1\n");
    }

    #[tokio::test]
    async fn rejects_traversal_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(&StorageConfig::under(dir.path()))
            .await
            .unwrap();
        assert!(storage.exists(Area::Uploads, "../etc/passwd").await.is_err());
        assert!(storage
            .put_object(Area::Uploads, "a/b.csv", Bytes::new())
            .await
            .is_err());
    }
}
