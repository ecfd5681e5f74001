//! # replay-store: resilient object storage for replays and statistics
//!
//! `replay-store` reads and writes game replays and statistics artifacts in
//! an S3-compatible object store. It owns every retry decision so request
//! handlers never have to.
//!
//! ## Key Features
//!
//! - **Bounded retries**: plain, gzip and zip reads retry with a fixed delay and
//!   resolve to [`ReadOutcome::Exhausted`] instead of failing
//! - **Eventual consistency**: replays that come back implausibly short are re-read
//! - **Multipart uploads**: an explicit session state machine with ordered part acknowledgements
//! - **Chunked arrays**: huge collections streamed out as newline-delimited JSON, one part at a time
//! - **Storage agnostic**: retry logic is written once against [`ObjectStore`]; S3 and in-memory backends ship
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use replay_store::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> StoreResult<()> {
//! let s3 = S3CompatibleStore::from_env().await;
//! let store = ReplayStore::new(s3, StoreConfig::default());
//!
//! match store.load_replay_string("2024/05/12/abc.xml.zip").await {
//!     ReadOutcome::Content(xml) => println!("replay is {} bytes", xml.len()),
//!     ReadOutcome::Exhausted => println!("replay not available yet"),
//! }
//!
//! let games = vec![serde_json::json!({"id": 1}), serde_json::json!({"id": 2})];
//! store
//!     .write_array_as_multipart(&games, "stats-bucket", "games.ndjson", None, None)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────┐
//! │           ReplayStore           │  ← facade used by request handlers
//! ├────────────────┬────────────────┤
//! │ RetryingReader │ UploadSession  │  ← retry policy / upload protocol
//! │ Consistency    │ ChunkedArray   │
//! ├────────────────┴────────────────┤
//! │ ObjectStore / MultipartStore    │  ← one request per call, no retries
//! └─────────────────────────────────┘
//! ```

pub mod adapter;
mod chunked;
pub mod codec;
mod config;
mod error;
pub mod log;
mod memory_store;
mod multipart;
mod reader;
mod replay;
mod s3_store;
pub mod store;
mod types;

// Re-export main types for clean API
pub use adapter::ReplayStore;
pub use chunked::{to_ndjson, ChunkedArrayWriter};
pub use config::{
    ReadPolicies, RetryPolicy, S3Config, StoreConfig, DEFAULT_CHUNK_SIZE, DEFAULT_REPLAY_BUCKET,
    DEFAULT_REPLAY_MIN_LEN,
};
pub use error::{StoreError, StoreResult};
pub use log::{BufferedSink, LogSink, TracingSink};
pub use memory_store::{MemoryObjectStore, StoredObject};
pub use multipart::{MultipartUploadSession, ProcessingFlag, SessionState};
pub use reader::RetryingReader;
pub use replay::ConsistencyAwareLoader;
pub use s3_store::S3CompatibleStore;
pub use store::{MultipartObjectStore, ObjectStore};
pub use types::{
    BlobLocator, CompletedPart, ContentEncoding, DeleteFailure, DeleteReport, ObjectAcl,
    ObjectBody, ObjectSummary, PutOptions, ReadMode, ReadOutcome, UploadId, DEFAULT_CONTENT_TYPE,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobLocator, PutOptions, ReadMode, ReadOutcome, ReplayStore, RetryPolicy,
        S3CompatibleStore, StoreConfig, StoreError, StoreResult,
    };
}
