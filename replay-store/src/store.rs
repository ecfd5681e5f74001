use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    BlobLocator, CompletedPart, DeleteReport, ObjectBody, ObjectSummary, PutOptions, StoreResult,
    UploadId,
};

/// Core object storage operations - the single boundary to a store client.
///
/// Implementations perform exactly one request per call and never retry;
/// retry policy lives in the readers built on top of this trait.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a whole object
    async fn get_object(&self, locator: &BlobLocator) -> StoreResult<ObjectBody>;

    /// Store a whole object
    async fn put_object(
        &self,
        locator: &BlobLocator,
        body: Bytes,
        options: &PutOptions,
    ) -> StoreResult<()>;

    /// List objects under a prefix
    async fn list_objects(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<ObjectSummary>>;

    /// Delete a batch of keys from one bucket
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> StoreResult<DeleteReport>;

    /// Server-side copy
    async fn copy_object(&self, source: &BlobLocator, destination: &BlobLocator) -> StoreResult<()>;
}

/// Multipart upload support
#[async_trait]
pub trait MultipartObjectStore: ObjectStore {
    /// Start a multipart upload and return its id
    async fn create_multipart_upload(
        &self,
        locator: &BlobLocator,
        options: &PutOptions,
    ) -> StoreResult<UploadId>;

    /// Upload one part, returning its ETag
    async fn upload_part(
        &self,
        locator: &BlobLocator,
        upload_id: &UploadId,
        part_number: u32,
        body: Bytes,
    ) -> StoreResult<String>;

    /// Assemble the object from the acknowledged parts, in the given order
    async fn complete_multipart_upload(
        &self,
        locator: &BlobLocator,
        upload_id: &UploadId,
        parts: Vec<CompletedPart>,
    ) -> StoreResult<()>;

    /// Discard an upload and every part stored for it
    async fn abort_multipart_upload(&self, locator: &BlobLocator, upload_id: &UploadId) -> StoreResult<()>;
}
