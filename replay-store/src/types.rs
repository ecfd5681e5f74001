use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Content type used when a write does not say otherwise
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Identifies one stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobLocator {
    pub bucket: String,
    pub key: String,
}

impl BlobLocator {
    pub fn new<B: Into<String>, K: Into<String>>(bucket: B, key: K) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for BlobLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// How a fetched body is turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// UTF-8 body
    Raw,
    /// Gzip-compressed UTF-8 body
    Gzip,
    /// Zip archive; the first listed entry is read
    Zip,
}

impl ReadMode {
    /// Replays are either zipped or stored as plain XML
    pub fn for_replay_key(key: &str) -> Self {
        if key.ends_with(".zip") {
            Self::Zip
        } else {
            Self::Raw
        }
    }
}

/// Result of a retrying read.
///
/// `Exhausted` is an expected outcome ("data unavailable"), not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Content(String),
    Exhausted,
}

impl ReadOutcome {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Content(text) => Some(text),
            Self::Exhausted => None,
        }
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Content(text) => Some(text),
            Self::Exhausted => None,
        }
    }
}

/// Canned ACL applied to written objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectAcl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl ObjectAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
            Self::AuthenticatedRead => "authenticated-read",
            Self::BucketOwnerRead => "bucket-owner-read",
            Self::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

/// Content-Encoding marker for stored objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentEncoding {
    Gzip,
}

impl ContentEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
        }
    }
}

/// Options for a single-object or multipart write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: String,
    /// `None` leaves the bucket default in place
    pub acl: Option<ObjectAcl>,
    pub content_encoding: Option<ContentEncoding>,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            acl: Some(ObjectAcl::PublicRead),
            content_encoding: None,
        }
    }
}

impl PutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_acl(mut self, acl: Option<ObjectAcl>) -> Self {
        self.acl = acl;
        self
    }

    pub fn gzip(mut self) -> Self {
        self.content_encoding = Some(ContentEncoding::Gzip);
        self
    }
}

/// Body and user metadata of a fetched object
#[derive(Debug, Clone, Default)]
pub struct ObjectBody {
    pub bytes: Bytes,
    pub metadata: HashMap<String, String>,
}

impl ObjectBody {
    pub fn new(bytes: Bytes) -> Self {
        Self {
            bytes,
            ..Self::default()
        }
    }
}

/// One entry of a bucket listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size_bytes: u64,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Outcome of a batch delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub errors: Vec<DeleteFailure>,
}

/// A key the store refused to delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub key: String,
    pub message: String,
}

/// Store-assigned identifier of a multipart upload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(pub String);

impl UploadId {
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Acknowledgement for one uploaded part, required to finish the upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

impl CompletedPart {
    pub fn new<S: Into<String>>(part_number: u32, etag: S) -> Self {
        Self {
            part_number,
            etag: etag.into(),
        }
    }
}
