use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::types::{
    CompletedMultipartUpload, CompletedPart as AwsCompletedPart, Delete, ObjectCannedAcl,
    ObjectIdentifier, StorageClass,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::DateTime;

use crate::{
    BlobLocator, CompletedPart, DeleteFailure, DeleteReport, MultipartObjectStore, ObjectBody,
    ObjectStore, ObjectSummary, PutOptions, S3Config, StoreError, StoreResult, UploadId,
};

/// Object store backed by S3 or any S3-compatible server
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
}

impl S3CompatibleStore {
    /// Build a client from explicit settings
    pub async fn new(config: S3Config) -> Self {
        let client = Self::create_client(config).await;
        Self { client }
    }

    /// Build a client from `REPLAY_STORE_*` environment variables
    pub async fn from_env() -> Self {
        Self::new(S3Config::from_env()).await
    }

    /// Wrap an already configured SDK client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn create_client(config: S3Config) -> Client {
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(config.connect_timeout)
            .operation_timeout(config.operation_timeout)
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .timeout_config(timeouts);

        if let (Some(access_key_id), Some(secret_access_key)) =
            (config.access_key_id, config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "replay-store",
            ));
        }
        if let Some(endpoint_url) = config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        let aws_config = loader.load().await;
        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(config.force_path_style)
                .build(),
        )
    }

    fn map_aws_error(err: impl std::error::Error + Send + Sync + 'static) -> StoreError {
        StoreError::backend(err)
    }

    fn acl(options: &PutOptions) -> Option<ObjectCannedAcl> {
        options.acl.map(|acl| ObjectCannedAcl::from(acl.as_str()))
    }

    fn part_number(part_number: u32) -> StoreResult<i32> {
        i32::try_from(part_number)
            .map_err(|_| StoreError::invalid(format!("part number {} out of range", part_number)))
    }

    /// Access the underlying SDK client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl ObjectStore for S3CompatibleStore {
    async fn get_object(&self, locator: &BlobLocator) -> StoreResult<ObjectBody> {
        let result = self
            .client
            .get_object()
            .bucket(&locator.bucket)
            .key(&locator.key)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    StoreError::not_found(&locator.bucket, &locator.key)
                } else {
                    Self::map_aws_error(err)
                }
            })?;

        let metadata = result.metadata.unwrap_or_default();
        let body = result.body.collect().await.map_err(Self::map_aws_error)?;

        Ok(ObjectBody {
            bytes: body.into_bytes(),
            metadata,
        })
    }

    async fn put_object(
        &self,
        locator: &BlobLocator,
        body: Bytes,
        options: &PutOptions,
    ) -> StoreResult<()> {
        tracing::debug!(
            target: "replay_store",
            locator = %locator,
            size_bytes = body.len(),
            content_type = %options.content_type,
            "put_object"
        );

        let mut request = self
            .client
            .put_object()
            .bucket(&locator.bucket)
            .key(&locator.key)
            .content_type(&options.content_type)
            .set_acl(Self::acl(options))
            .body(AwsByteStream::from(body));

        if let Some(encoding) = options.content_encoding {
            request = request.content_encoding(encoding.as_str());
        }

        request.send().await.map_err(Self::map_aws_error)?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<ObjectSummary>> {
        let mut summaries = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let result = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(Self::map_aws_error)?;

            for object in result.contents() {
                if let Some(key) = object.key() {
                    summaries.push(ObjectSummary {
                        key: key.to_string(),
                        size_bytes: object.size().unwrap_or(0).max(0) as u64,
                        etag: object.e_tag().map(String::from),
                        last_modified: object
                            .last_modified()
                            .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
                    });
                }
            }

            match result.next_continuation_token() {
                Some(token) if result.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(summaries)
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> StoreResult<DeleteReport> {
        if keys.is_empty() {
            return Ok(DeleteReport::default());
        }

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(Self::map_aws_error)?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(Self::map_aws_error)?;

        let result = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        Ok(DeleteReport {
            deleted: result
                .deleted()
                .iter()
                .filter_map(|deleted| deleted.key().map(String::from))
                .collect(),
            errors: result
                .errors()
                .iter()
                .map(|error| DeleteFailure {
                    key: error.key().unwrap_or_default().to_string(),
                    message: error.message().unwrap_or_default().to_string(),
                })
                .collect(),
        })
    }

    async fn copy_object(&self, source: &BlobLocator, destination: &BlobLocator) -> StoreResult<()> {
        self.client
            .copy_object()
            .copy_source(format!("{}/{}", source.bucket, source.key))
            .bucket(&destination.bucket)
            .key(&destination.key)
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(())
    }
}

#[async_trait]
impl MultipartObjectStore for S3CompatibleStore {
    async fn create_multipart_upload(
        &self,
        locator: &BlobLocator,
        options: &PutOptions,
    ) -> StoreResult<UploadId> {
        let result = self
            .client
            .create_multipart_upload()
            .bucket(&locator.bucket)
            .key(&locator.key)
            .content_type(&options.content_type)
            .set_acl(Self::acl(options))
            .storage_class(StorageClass::Standard)
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        let upload_id = result
            .upload_id()
            .ok_or_else(|| StoreError::backend_message("No upload ID in response"))?;
        Ok(UploadId::from_string(upload_id.to_string()))
    }

    async fn upload_part(
        &self,
        locator: &BlobLocator,
        upload_id: &UploadId,
        part_number: u32,
        body: Bytes,
    ) -> StoreResult<String> {
        let result = self
            .client
            .upload_part()
            .bucket(&locator.bucket)
            .key(&locator.key)
            .upload_id(upload_id.as_str())
            .part_number(Self::part_number(part_number)?)
            .body(AwsByteStream::from(body))
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        result
            .e_tag()
            .map(String::from)
            .ok_or_else(|| StoreError::backend_message(format!("No ETag for part {}", part_number)))
    }

    async fn complete_multipart_upload(
        &self,
        locator: &BlobLocator,
        upload_id: &UploadId,
        parts: Vec<CompletedPart>,
    ) -> StoreResult<()> {
        let completed_parts = parts
            .into_iter()
            .map(|part| {
                Ok(AwsCompletedPart::builder()
                    .part_number(Self::part_number(part.part_number)?)
                    .e_tag(part.etag)
                    .build())
            })
            .collect::<StoreResult<Vec<_>>>()?;

        self.client
            .complete_multipart_upload()
            .bucket(&locator.bucket)
            .key(&locator.key)
            .upload_id(upload_id.as_str())
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(())
    }

    async fn abort_multipart_upload(&self, locator: &BlobLocator, upload_id: &UploadId) -> StoreResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&locator.bucket)
            .key(&locator.key)
            .upload_id(upload_id.as_str())
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(())
    }
}
