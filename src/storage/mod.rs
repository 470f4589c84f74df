pub mod s3;
pub mod uploads;

use crate::error::AppResult;
use async_trait::async_trait;

/// Blob-storage collaborator keyed by attachment stored names. Row deletion
/// and blob purge are not transactional; callers treat purge as best-effort
/// and log failures instead of aborting.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn exists(&self, path: &str) -> AppResult<bool>;
    async fn delete(&self, path: &str) -> AppResult<()>;
    async fn url(&self, path: &str) -> AppResult<String>;
    async fn store(&self, path: &str, bytes: Vec<u8>) -> AppResult<()>;
}
