use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::{
    BlobLocator, CompletedPart, LogSink, MultipartObjectStore, PutOptions, StoreError, StoreResult,
    UploadId,
};

/// Lifecycle of a multipart upload session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, nothing sent yet
    Idle,
    /// Upload created, no parts yet
    Initiated,
    /// A part upload is awaiting the store
    PartInFlight,
    /// At least one part acknowledged
    PartsAccumulated,
    /// Upload assembled; the session is spent
    Completed,
    /// Upload discarded on the store; the session is spent
    Aborted,
}

/// Observer handle for a session's in-flight flag.
///
/// Advisory only: sessions are driven through `&mut self`, so ordering is
/// already enforced by ownership. The flag exists for progress reporting.
#[derive(Debug, Clone, Default)]
pub struct ProcessingFlag(Arc<AtomicBool>);

impl ProcessingFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn raise(&self) -> InFlight<'_> {
        self.0.store(true, Ordering::Release);
        InFlight(&self.0)
    }
}

/// Lowers the flag when the operation ends, including when its future is dropped
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Three-phase multipart upload: initiate, upload parts in order, complete.
///
/// Part numbers start at 1 and advance by one per acknowledged part. Part
/// failures are returned to the caller untouched; the session never retries
/// on its own. A session that will not be completed should be aborted so the
/// store drops its parts.
pub struct MultipartUploadSession {
    store: Arc<dyn MultipartObjectStore>,
    log: Arc<dyn LogSink>,
    locator: Option<BlobLocator>,
    upload_id: Option<UploadId>,
    next_part_number: u32,
    parts: Vec<CompletedPart>,
    state: SessionState,
    processing: ProcessingFlag,
}

impl MultipartUploadSession {
    pub fn new(store: Arc<dyn MultipartObjectStore>, log: Arc<dyn LogSink>) -> Self {
        Self {
            store,
            log,
            locator: None,
            upload_id: None,
            next_part_number: 1,
            parts: Vec::new(),
            state: SessionState::Idle,
            processing: ProcessingFlag::default(),
        }
    }

    /// Create the upload on the store. Objects are written public-read.
    pub async fn initiate(&mut self, bucket: &str, key: &str, content_type: &str) -> StoreResult<()> {
        self.expect_state(&[SessionState::Idle], "initiate")?;

        let locator = BlobLocator::new(bucket, key);
        let options = PutOptions::new().with_content_type(content_type);

        let upload_id = {
            let _guard = self.processing.raise();
            self.store
                .create_multipart_upload(&locator, &options)
                .await
                .inspect_err(|e| {
                    self.log
                        .error(&format!("could not create multipart upload for {}: {}", locator, e))
                })?
        };

        self.log.debug(&format!("multipart upload {} started for {}", upload_id, locator));
        self.locator = Some(locator);
        self.upload_id = Some(upload_id);
        self.next_part_number = 1;
        self.state = SessionState::Initiated;
        Ok(())
    }

    /// Upload the next part and record its ETag
    pub async fn upload_part(&mut self, content: impl Into<Bytes>) -> StoreResult<()> {
        let previous = self.expect_state(
            &[SessionState::Initiated, SessionState::PartsAccumulated],
            "upload_part",
        )?;
        let (locator, upload_id) = self.target()?;
        let part_number = self.next_part_number;

        self.state = SessionState::PartInFlight;
        let result = {
            let _guard = self.processing.raise();
            self.store
                .upload_part(&locator, &upload_id, part_number, content.into())
                .await
        };

        match result {
            Ok(etag) => {
                self.parts.push(CompletedPart::new(part_number, etag));
                self.next_part_number += 1;
                self.state = SessionState::PartsAccumulated;
                Ok(())
            }
            Err(e) => {
                self.state = previous;
                self.log.warn(&format!(
                    "part {} of upload {} for {} failed: {}",
                    part_number, upload_id, locator, e
                ));
                Err(e)
            }
        }
    }

    /// Submit the acknowledged parts and finish the upload
    pub async fn complete(&mut self) -> StoreResult<()> {
        self.expect_state(&[SessionState::PartsAccumulated], "complete")?;
        let (locator, upload_id) = self.target()?;

        {
            let _guard = self.processing.raise();
            self.store
                .complete_multipart_upload(&locator, &upload_id, self.parts.clone())
                .await
                .inspect_err(|e| {
                    self.log.error(&format!(
                        "could not complete multipart upload {} for {}: {}",
                        upload_id, locator, e
                    ))
                })?;
        }

        self.log.debug(&format!(
            "multipart upload {} completed with {} parts",
            upload_id,
            self.parts.len()
        ));
        self.state = SessionState::Completed;
        Ok(())
    }

    /// Discard the upload and its stored parts.
    ///
    /// Also accepted after an in-flight part was cancelled, since that part
    /// may or may not have reached the store.
    pub async fn abort(&mut self) -> StoreResult<()> {
        self.expect_state(
            &[
                SessionState::Initiated,
                SessionState::PartInFlight,
                SessionState::PartsAccumulated,
            ],
            "abort",
        )?;
        let (locator, upload_id) = self.target()?;

        {
            let _guard = self.processing.raise();
            self.store
                .abort_multipart_upload(&locator, &upload_id)
                .await
                .inspect_err(|e| {
                    self.log.error(&format!(
                        "could not abort multipart upload {} for {}: {}",
                        upload_id, locator, e
                    ))
                })?;
        }

        self.log.debug(&format!(
            "multipart upload {} aborted after {} parts",
            upload_id,
            self.parts.len()
        ));
        self.state = SessionState::Aborted;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while a call on this session is awaiting the store
    pub fn processing(&self) -> bool {
        self.processing.is_set()
    }

    /// Handle for watching the in-flight flag from another task
    pub fn processing_flag(&self) -> ProcessingFlag {
        self.processing.clone()
    }

    pub fn upload_id(&self) -> Option<&UploadId> {
        self.upload_id.as_ref()
    }

    pub fn next_part_number(&self) -> u32 {
        self.next_part_number
    }

    /// Acknowledged parts in ascending part-number order
    pub fn acknowledged_parts(&self) -> &[CompletedPart] {
        &self.parts
    }

    fn expect_state(&self, allowed: &[SessionState], operation: &str) -> StoreResult<SessionState> {
        if allowed.contains(&self.state) {
            return Ok(self.state);
        }
        let message = match self.state {
            SessionState::Initiated if operation == "complete" => {
                "complete called before any part was uploaded".to_string()
            }
            SessionState::Completed => format!("{} called on a completed session", operation),
            SessionState::Aborted => format!("{} called on an aborted session", operation),
            state => format!("{} not allowed in state {:?}", operation, state),
        };
        self.log.error(&message);
        Err(StoreError::session_protocol(message))
    }

    fn target(&self) -> StoreResult<(BlobLocator, UploadId)> {
        match (&self.locator, &self.upload_id) {
            (Some(locator), Some(upload_id)) => Ok((locator.clone(), upload_id.clone())),
            _ => Err(StoreError::session_protocol("session has no active upload")),
        }
    }
}
