//! DocumentStore trait definition

use async_trait::async_trait;
use bytes::Bytes;

use super::types::DocumentError;

/// Trait for document storage backends. One successful store per session is
/// enforced by the session registry, not here.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store document bytes; returns the stored reference
    async fn store(
        &self,
        session_id: &str,
        filename: &str,
        bytes: Bytes,
    ) -> Result<String, DocumentError>;

    /// Retrieve a previously stored document by reference
    async fn retrieve(&self, reference: &str) -> Result<Bytes, DocumentError>;

    /// Check if a reference resolves to a stored document
    async fn exists(&self, reference: &str) -> bool {
        self.retrieve(reference).await.is_ok()
    }
}
