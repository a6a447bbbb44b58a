//! Object storage for uploaded files.
//!
//! Objects live under `<bucket>/<path>`. The local backend writes them below
//! the configured storage directory, which the router serves at `/storage`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStorage: std::fmt::Debug + Send + Sync {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Removing a missing object is not an error.
    async fn delete(&self, bucket: &str, path: &str) -> Result<(), StorageError>;
}

/// Rejects anything that could escape the bucket directory.
fn object_key(bucket: &str, path: &str) -> Result<PathBuf, StorageError> {
    let mut key = PathBuf::new();
    for part in [bucket, path] {
        let candidate = Path::new(part);
        if part.is_empty() || candidate.is_absolute() {
            return Err(StorageError::InvalidPath(format!("{}/{}", bucket, path)));
        }
        for component in candidate.components() {
            match component {
                Component::Normal(segment) => key.push(segment),
                _ => return Err(StorageError::InvalidPath(format!("{}/{}", bucket, path))),
            }
        }
    }
    Ok(key)
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_url: &str) -> Self {
        LocalStorage {
            root: root.into(),
            public_base: format!("{}/storage", public_url.trim_end_matches('/')),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let full_path = self.root.join(object_key(bucket, path)?);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, bytes).await?;
        debug!("Stored object {}", full_path.display());
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base, bucket, path)
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        let full_path = self.root.join(object_key(bucket, path)?);
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Object {} already gone", full_path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub use memory::MemoryStorage;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_cannot_escape_bucket() {
        assert!(object_key("resumes", "u1/cv.pdf").is_ok());
        assert!(object_key("resumes", "../secrets").is_err());
        assert!(object_key("resumes", "/etc/passwd").is_err());
        assert!(object_key("", "cv.pdf").is_err());
    }

    #[tokio::test]
    async fn local_storage_writes_and_deletes() {
        let root = std::env::temp_dir().join(format!("manpower-storage-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(&root, "http://localhost:8000/");

        storage.upload("avatars", "u1/me.png", b"png".to_vec()).await.unwrap();
        let written = tokio::fs::read(root.join("avatars/u1/me.png")).await.unwrap();
        assert_eq!(written, b"png");
        assert_eq!(
            storage.public_url("avatars", "u1/me.png"),
            "http://localhost:8000/storage/avatars/u1/me.png"
        );

        storage.delete("avatars", "u1/me.png").await.unwrap();
        storage.delete("avatars", "u1/me.png").await.unwrap();
        assert!(!root.join("avatars/u1/me.png").exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
