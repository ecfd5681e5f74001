use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::codec::{self, REPLAY_ENTRY_NAME};
use crate::{
    BlobLocator, ChunkedArrayWriter, ConsistencyAwareLoader, DeleteReport, LogSink,
    MultipartObjectStore, MultipartUploadSession, ObjectStore, ObjectSummary, PutOptions,
    ReadMode, ReadOutcome, RetryPolicy, RetryingReader, StoreConfig, StoreResult, TracingSink,
    DEFAULT_CONTENT_TYPE,
};

/// Entry point for request handlers: every read and write the service needs,
/// over one shared store client.
///
/// Reads never fail: they resolve to [`ReadOutcome::Exhausted`] once their
/// retry budget is spent. Single-object writes report success as a `bool`;
/// multipart writes propagate the first session error.
#[derive(Clone)]
pub struct ReplayStore {
    objects: Arc<dyn ObjectStore>,
    multipart: Arc<dyn MultipartObjectStore>,
    log: Arc<dyn LogSink>,
    reader: RetryingReader,
    replays: ConsistencyAwareLoader,
    config: StoreConfig,
}

impl ReplayStore {
    /// Create a store facade that logs through `tracing`
    pub fn new<S: MultipartObjectStore + 'static>(store: S, config: StoreConfig) -> Self {
        Self::with_log_sink(Arc::new(store), Arc::new(TracingSink), config)
    }

    /// Create with a custom log sink over a shared store
    pub fn with_log_sink<S: MultipartObjectStore + 'static>(
        store: Arc<S>,
        log: Arc<dyn LogSink>,
        config: StoreConfig,
    ) -> Self {
        let objects: Arc<dyn ObjectStore> = store.clone();
        let multipart: Arc<dyn MultipartObjectStore> = store;
        let reader = RetryingReader::new(objects.clone(), log.clone());
        let replays = ConsistencyAwareLoader::new(reader.clone(), &config);

        Self {
            objects,
            multipart,
            log,
            reader,
            replays,
            config,
        }
    }

    /// Read with an explicit mode and policy
    pub async fn read_with(&self, locator: &BlobLocator, mode: ReadMode, policy: &RetryPolicy) -> ReadOutcome {
        self.reader.read(locator, mode, policy).await
    }

    /// Read a UTF-8 object
    pub async fn read_content_as_string(&self, bucket: &str, key: &str) -> ReadOutcome {
        let policy = self.config.policies.string;
        self.read_with(&BlobLocator::new(bucket, key), ReadMode::Raw, &policy)
            .await
    }

    /// Read a gzip-compressed object.
    ///
    /// Pass `RetryPolicy::GZIP_READ.quiet()` when the object may legitimately be missing.
    pub async fn read_gzip_content(&self, bucket: &str, key: &str, policy: Option<RetryPolicy>) -> ReadOutcome {
        let policy = policy.unwrap_or(self.config.policies.gzip);
        self.read_with(&BlobLocator::new(bucket, key), ReadMode::Gzip, &policy)
            .await
    }

    /// Read the first entry of a zipped object
    pub async fn read_zipped_content(&self, bucket: &str, key: &str) -> ReadOutcome {
        let policy = self.config.policies.zip;
        self.read_with(&BlobLocator::new(bucket, key), ReadMode::Zip, &policy)
            .await
    }

    /// Load a replay from the replay bucket, waiting out eventual consistency
    pub async fn load_replay_string(&self, key: &str) -> ReadOutcome {
        self.replays.load_replay(key).await
    }

    /// Fetch an object's user metadata. No retry.
    pub async fn get_object_metadata(&self, bucket: &str, key: &str) -> Option<HashMap<String, String>> {
        let locator = BlobLocator::new(bucket, key);
        match self.objects.get_object(&locator).await {
            Ok(body) => Some(body.metadata),
            Err(e) => {
                self.log.error(&format!("could not load metadata for {}: {}", locator, e));
                None
            }
        }
    }

    /// Fetch an object's raw bytes. No retry.
    pub async fn read_bytes(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let locator = BlobLocator::new(bucket, key);
        match self.objects.get_object(&locator).await {
            Ok(body) => Some(body.bytes),
            Err(e) => {
                self.log.error(&format!("could not read {}: {}", locator, e));
                None
            }
        }
    }

    /// Store a body as-is
    pub async fn write_file(
        &self,
        body: impl Into<Bytes>,
        bucket: &str,
        key: &str,
        options: &PutOptions,
    ) -> bool {
        let locator = BlobLocator::new(bucket, key);
        match self.objects.put_object(&locator, body.into(), options).await {
            Ok(()) => true,
            Err(e) => {
                self.log.error(&format!("could not write {}: {}", locator, e));
                false
            }
        }
    }

    /// Serialize a value to JSON and store it with the default options
    pub async fn write_json<T: Serialize + Sync + ?Sized>(&self, value: &T, bucket: &str, key: &str) -> bool {
        match serde_json::to_vec(value) {
            Ok(body) => self.write_file(body, bucket, key, &PutOptions::default()).await,
            Err(e) => {
                self.log
                    .error(&format!("could not serialize {}/{}: {}", bucket, key, e));
                false
            }
        }
    }

    /// Gzip text and store it with a `gzip` content encoding
    pub async fn write_gzip_file(&self, text: &str, bucket: &str, key: &str, content_type: &str) -> bool {
        match codec::gzip(text) {
            Ok(body) => {
                let options = PutOptions::new().with_content_type(content_type).gzip();
                self.write_file(body, bucket, key, &options).await
            }
            Err(e) => {
                self.log.error(&format!("could not gzip {}/{}: {}", bucket, key, e));
                false
            }
        }
    }

    /// Zip text as a single `replay.xml` entry and store it as `application/zip`
    pub async fn write_compressed_file(&self, text: &str, bucket: &str, key: &str) -> bool {
        match codec::zip_single_entry(REPLAY_ENTRY_NAME, text) {
            Ok(body) => {
                let options = PutOptions::new().with_content_type("application/zip");
                self.write_file(body, bucket, key, &options).await
            }
            Err(e) => {
                self.log.error(&format!("could not zip {}/{}: {}", bucket, key, e));
                false
            }
        }
    }

    /// Write a large collection as NDJSON through a multipart upload.
    ///
    /// `chunk_size` defaults to the configured value.
    pub async fn write_array_as_multipart<T: Serialize + Sync>(
        &self,
        items: &[T],
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        chunk_size: Option<usize>,
    ) -> StoreResult<()> {
        ChunkedArrayWriter::new(self.multipart.clone(), self.log.clone())
            .write_array(
                items,
                bucket,
                key,
                content_type.unwrap_or(DEFAULT_CONTENT_TYPE),
                chunk_size.unwrap_or(self.config.chunk_size),
            )
            .await
    }

    /// Start a new, idle multipart session on this store
    pub fn multipart_session(&self) -> MultipartUploadSession {
        MultipartUploadSession::new(self.multipart.clone(), self.log.clone())
    }

    /// List every object under a prefix. Failures yield an empty list.
    pub async fn load_all_file_keys(&self, bucket: &str, prefix: &str) -> Vec<ObjectSummary> {
        match self.objects.list_objects(bucket, prefix).await {
            Ok(summaries) => summaries,
            Err(e) => {
                self.log
                    .error(&format!("could not list objects in {}/{}: {}", bucket, prefix, e));
                Vec::new()
            }
        }
    }

    /// Delete a batch of keys
    pub async fn delete_files(&self, bucket: &str, keys: &[String]) -> StoreResult<DeleteReport> {
        let report = self.objects.delete_objects(bucket, keys).await?;
        for failure in &report.errors {
            self.log.warn(&format!(
                "could not delete {}/{}: {}",
                bucket, failure.key, failure.message
            ));
        }
        Ok(report)
    }

    /// Server-side copy between buckets
    pub async fn copy(&self, source_bucket: &str, source_key: &str, bucket: &str, key: &str) -> bool {
        let source = BlobLocator::new(source_bucket, source_key);
        let destination = BlobLocator::new(bucket, key);
        match self.objects.copy_object(&source, &destination).await {
            Ok(()) => true,
            Err(e) => {
                self.log
                    .error(&format!("could not copy {} to {}: {}", source, destination, e));
                false
            }
        }
    }

    /// Get configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The shared retrying reader
    pub fn reader(&self) -> &RetryingReader {
        &self.reader
    }
}
