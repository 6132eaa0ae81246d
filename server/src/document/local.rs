//! Local filesystem document store

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::store::DocumentStore;
use super::types::DocumentError;

/// Stores uploaded documents as flat files beneath a root directory.
/// References are `{session_id}_{filename}` so one directory serves every
/// session without collisions.
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        info!("Document store root: {:?}", root);
        Ok(Self { root })
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, DocumentError> {
        // Flat namespace: anything that could escape the root is invalid
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || Path::new(name).is_absolute()
        {
            return Err(DocumentError::InvalidFilename(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn store(
        &self,
        session_id: &str,
        filename: &str,
        bytes: Bytes,
    ) -> Result<String, DocumentError> {
        self.resolve(filename)?;
        let reference = format!("{}_{}", session_id, filename);
        let path = self.resolve(&reference)?;

        tokio::fs::write(&path, &bytes).await?;
        debug!("Stored document {} ({} bytes)", reference, bytes.len());
        Ok(reference)
    }

    async fn retrieve(&self, reference: &str) -> Result<Bytes, DocumentError> {
        let path = self.resolve(reference)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DocumentError::NotFound(reference.to_string()))
            }
            Err(e) => Err(DocumentError::IoError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, LocalDocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_store_then_retrieve() {
        let (_dir, store) = temp_store();
        let reference = store
            .store("abc234defg", "slides.pdf", Bytes::from_static(b"%PDF-1.4"))
            .await
            .unwrap();

        assert_eq!(reference, "abc234defg_slides.pdf");
        let bytes = store.retrieve(&reference).await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.4");
        assert!(store.exists(&reference).await);
    }

    #[tokio::test]
    async fn test_retrieve_missing_is_not_found() {
        let (_dir, store) = temp_store();
        let result = store.retrieve("abc234defg_missing.pdf").await;
        assert!(matches!(result, Err(DocumentError::NotFound(_))));
        assert!(!store.exists("abc234defg_missing.pdf").await);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let (_dir, store) = temp_store();
        for name in ["../evil.pdf", "a/b.pdf", "a\\b.pdf", ""] {
            let result = store
                .store("abc234defg", name, Bytes::from_static(b"x"))
                .await;
            assert!(
                matches!(result, Err(DocumentError::InvalidFilename(_))),
                "{:?} should be rejected",
                name
            );
        }
        assert!(matches!(
            store.retrieve("../../etc/passwd").await,
            Err(DocumentError::InvalidFilename(_))
        ));
    }
}
