#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

use replay_store::{
    BlobLocator, CompletedPart, DeleteReport, LogSink, MultipartObjectStore, ObjectBody,
    ObjectStore, ObjectSummary, PutOptions, StoreError, StoreResult, UploadId,
};

/// Log level recorded by [`RecordingSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Warn,
    Error,
}

/// Keeps every message so tests can count them
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(Level, String)>>,
}

impl RecordingSink {
    pub fn count(&self, level: Level) -> usize {
        self.entries.lock().iter().filter(|(l, _)| *l == level).count()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl LogSink for RecordingSink {
    fn debug(&self, message: &str) {
        self.entries.lock().push((Level::Debug, message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.entries.lock().push((Level::Warn, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.entries.lock().push((Level::Error, message.to_string()));
    }
}

/// Store whose reads follow a script and whose multipart calls are recorded
#[derive(Default)]
pub struct ScriptedStore {
    responses: Mutex<VecDeque<Result<Bytes, String>>>,
    get_calls: AtomicUsize,
    fail_part: Mutex<Option<u32>>,
    uploaded_parts: Mutex<Vec<(u32, Bytes)>>,
    completed: Mutex<Vec<Vec<CompletedPart>>>,
    aborted: Mutex<Vec<UploadId>>,
    part_gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next fetch. An empty queue fails every fetch.
    pub fn respond(&self, response: Result<Bytes, String>) {
        self.responses.lock().push_back(response);
    }

    pub fn respond_ok(&self, body: impl Into<Bytes>) {
        self.respond(Ok(body.into()));
    }

    pub fn respond_err(&self, message: &str) {
        self.respond(Err(message.to_string()));
    }

    /// Fail the upload of this part number once
    pub fn fail_part_once(&self, part_number: u32) {
        *self.fail_part.lock() = Some(part_number);
    }

    /// Park every part upload until the returned gate is notified
    pub fn hold_parts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.part_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn aborted(&self) -> Vec<UploadId> {
        self.aborted.lock().clone()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn uploaded_parts(&self) -> Vec<(u32, Bytes)> {
        self.uploaded_parts.lock().clone()
    }

    pub fn completed(&self) -> Vec<Vec<CompletedPart>> {
        self.completed.lock().clone()
    }
}

#[async_trait]
impl ObjectStore for ScriptedStore {
    async fn get_object(&self, locator: &BlobLocator) -> StoreResult<ObjectBody> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().pop_front() {
            Some(Ok(bytes)) => Ok(ObjectBody::new(bytes)),
            Some(Err(message)) => Err(StoreError::backend_message(message)),
            None => Err(StoreError::not_found(&locator.bucket, &locator.key)),
        }
    }

    async fn put_object(&self, _: &BlobLocator, _: Bytes, _: &PutOptions) -> StoreResult<()> {
        Err(StoreError::backend_message("put_object is not scripted"))
    }

    async fn list_objects(&self, _: &str, _: &str) -> StoreResult<Vec<ObjectSummary>> {
        Err(StoreError::backend_message("list_objects is not scripted"))
    }

    async fn delete_objects(&self, _: &str, _: &[String]) -> StoreResult<DeleteReport> {
        Err(StoreError::backend_message("delete_objects is not scripted"))
    }

    async fn copy_object(&self, _: &BlobLocator, _: &BlobLocator) -> StoreResult<()> {
        Err(StoreError::backend_message("copy_object is not scripted"))
    }
}

#[async_trait]
impl MultipartObjectStore for ScriptedStore {
    async fn create_multipart_upload(&self, _: &BlobLocator, _: &PutOptions) -> StoreResult<UploadId> {
        Ok(UploadId::from_string("upload-1".to_string()))
    }

    async fn upload_part(
        &self,
        _: &BlobLocator,
        _: &UploadId,
        part_number: u32,
        body: Bytes,
    ) -> StoreResult<String> {
        let gate = self.part_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        {
            let mut fail_part = self.fail_part.lock();
            if *fail_part == Some(part_number) {
                *fail_part = None;
                return Err(StoreError::backend_message(format!("part {} rejected", part_number)));
            }
        }
        self.uploaded_parts.lock().push((part_number, body));
        Ok(format!("etag-{}", part_number))
    }

    async fn complete_multipart_upload(
        &self,
        _: &BlobLocator,
        _: &UploadId,
        parts: Vec<CompletedPart>,
    ) -> StoreResult<()> {
        self.completed.lock().push(parts);
        Ok(())
    }

    async fn abort_multipart_upload(&self, _: &BlobLocator, upload_id: &UploadId) -> StoreResult<()> {
        self.aborted.lock().push(upload_id.clone());
        Ok(())
    }
}

/// A plausible replay body of `len` bytes
pub fn replay_of_len(len: usize) -> String {
    let mut body = String::from("<replay>");
    while body.len() < len.saturating_sub("</replay>".len()) {
        body.push('x');
    }
    body.push_str("</replay>");
    body.truncate(len);
    body
}
