use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    BlobLocator, CompletedPart, DeleteReport, MultipartObjectStore, ObjectBody, ObjectStore,
    ObjectSummary, PutOptions, StoreError, StoreResult, UploadId,
};

/// An object held by [`MemoryObjectStore`], with the options it was written with
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub options: PutOptions,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

struct PendingUpload {
    locator: BlobLocator,
    options: PutOptions,
    parts: BTreeMap<u32, (String, Bytes)>,
}

/// In-process object store with native multipart support.
///
/// Objects become visible as soon as they are written.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<BlobLocator, StoredObject>>,
    uploads: RwLock<HashMap<UploadId, PendingUpload>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect a stored object
    pub fn object(&self, locator: &BlobLocator) -> Option<StoredObject> {
        self.objects.read().get(locator).cloned()
    }

    /// Number of multipart uploads created but not yet completed
    pub fn pending_uploads(&self) -> usize {
        self.uploads.read().len()
    }

    fn insert(&self, locator: BlobLocator, bytes: Bytes, options: PutOptions) {
        let object = StoredObject {
            bytes,
            options,
            etag: new_etag(),
            last_modified: Utc::now(),
        };
        self.objects.write().insert(locator, object);
    }
}

fn new_etag() -> String {
    format!("\"{}\"", Uuid::new_v4().simple())
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, locator: &BlobLocator) -> StoreResult<ObjectBody> {
        let objects = self.objects.read();
        let object = objects
            .get(locator)
            .ok_or_else(|| StoreError::not_found(&locator.bucket, &locator.key))?;

        Ok(ObjectBody {
            bytes: object.bytes.clone(),
            metadata: HashMap::new(),
        })
    }

    async fn put_object(
        &self,
        locator: &BlobLocator,
        body: Bytes,
        options: &PutOptions,
    ) -> StoreResult<()> {
        tracing::debug!(target: "replay_store", locator = %locator, size_bytes = body.len(), "memory put");
        self.insert(locator.clone(), body, options.clone());
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<ObjectSummary>> {
        let mut summaries: Vec<ObjectSummary> = self
            .objects
            .read()
            .iter()
            .filter(|(locator, _)| locator.bucket == bucket && locator.key.starts_with(prefix))
            .map(|(locator, object)| ObjectSummary {
                key: locator.key.clone(),
                size_bytes: object.bytes.len() as u64,
                etag: Some(object.etag.clone()),
                last_modified: Some(object.last_modified),
            })
            .collect();
        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(summaries)
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> StoreResult<DeleteReport> {
        let mut objects = self.objects.write();
        let mut report = DeleteReport::default();
        for key in keys {
            // Deleting a missing key succeeds, as it does on S3
            objects.remove(&BlobLocator::new(bucket, key.as_str()));
            report.deleted.push(key.clone());
        }
        Ok(report)
    }

    async fn copy_object(&self, source: &BlobLocator, destination: &BlobLocator) -> StoreResult<()> {
        let object = self
            .object(source)
            .ok_or_else(|| StoreError::not_found(&source.bucket, &source.key))?;
        self.insert(destination.clone(), object.bytes, object.options);
        Ok(())
    }
}

#[async_trait]
impl MultipartObjectStore for MemoryObjectStore {
    async fn create_multipart_upload(
        &self,
        locator: &BlobLocator,
        options: &PutOptions,
    ) -> StoreResult<UploadId> {
        let upload_id = UploadId::from_string(format!("mpu_{}", Uuid::new_v4().simple()));
        self.uploads.write().insert(
            upload_id.clone(),
            PendingUpload {
                locator: locator.clone(),
                options: options.clone(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        locator: &BlobLocator,
        upload_id: &UploadId,
        part_number: u32,
        body: Bytes,
    ) -> StoreResult<String> {
        if part_number == 0 || part_number > 10_000 {
            return Err(StoreError::invalid(format!(
                "Invalid part number: {} (must be 1-10000)",
                part_number
            )));
        }

        let mut uploads = self.uploads.write();
        let upload = uploads
            .get_mut(upload_id)
            .filter(|upload| &upload.locator == locator)
            .ok_or_else(|| StoreError::backend_message(format!("no such upload: {}", upload_id)))?;

        let etag = new_etag();
        upload.parts.insert(part_number, (etag.clone(), body));
        Ok(etag)
    }

    async fn complete_multipart_upload(
        &self,
        locator: &BlobLocator,
        upload_id: &UploadId,
        parts: Vec<CompletedPart>,
    ) -> StoreResult<()> {
        let mut uploads = self.uploads.write();
        let upload = uploads
            .get(upload_id)
            .filter(|upload| &upload.locator == locator)
            .ok_or_else(|| StoreError::backend_message(format!("no such upload: {}", upload_id)))?;

        if parts.is_empty() {
            return Err(StoreError::invalid("multipart upload needs at least one part"));
        }

        let mut body = BytesMut::new();
        let mut previous = 0;
        for part in &parts {
            if part.part_number <= previous {
                return Err(StoreError::invalid(format!(
                    "parts out of order: {} after {}",
                    part.part_number, previous
                )));
            }
            let (etag, bytes) = upload
                .parts
                .get(&part.part_number)
                .ok_or_else(|| StoreError::invalid(format!("missing part {}", part.part_number)))?;
            if etag != &part.etag {
                return Err(StoreError::invalid(format!(
                    "etag mismatch for part {}",
                    part.part_number
                )));
            }
            body.extend_from_slice(bytes);
            previous = part.part_number;
        }

        let options = upload.options.clone();
        uploads.remove(upload_id);
        drop(uploads);

        self.insert(locator.clone(), body.freeze(), options);
        Ok(())
    }

    async fn abort_multipart_upload(&self, locator: &BlobLocator, upload_id: &UploadId) -> StoreResult<()> {
        let mut uploads = self.uploads.write();
        let known = uploads
            .get(upload_id)
            .is_some_and(|upload| &upload.locator == locator);
        if !known {
            return Err(StoreError::backend_message(format!("no such upload: {}", upload_id)));
        }
        uploads.remove(upload_id);
        Ok(())
    }
}
