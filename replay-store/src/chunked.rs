use std::sync::Arc;

use serde::Serialize;

use crate::{LogSink, MultipartObjectStore, MultipartUploadSession, StoreError, StoreResult};

/// Writes large collections as newline-delimited JSON through one multipart upload.
///
/// Chunk `i` becomes part `i + 1`. Parts go out one at a time so only a
/// single serialized chunk is held in memory. If any step after initiation
/// fails the upload is aborted before the error is returned.
#[derive(Clone)]
pub struct ChunkedArrayWriter {
    store: Arc<dyn MultipartObjectStore>,
    log: Arc<dyn LogSink>,
}

impl ChunkedArrayWriter {
    pub fn new(store: Arc<dyn MultipartObjectStore>, log: Arc<dyn LogSink>) -> Self {
        Self { store, log }
    }

    /// Upload `items` in chunks of `chunk_size` elements. The input is only read.
    pub async fn write_array<T>(
        &self,
        items: &[T],
        bucket: &str,
        key: &str,
        content_type: &str,
        chunk_size: usize,
    ) -> StoreResult<()>
    where
        T: Serialize + Sync,
    {
        if chunk_size == 0 {
            return Err(StoreError::invalid("chunk size must be at least 1"));
        }

        let mut session = MultipartUploadSession::new(self.store.clone(), self.log.clone());
        session.initiate(bucket, key, content_type).await?;

        if let Err(e) = Self::upload_chunks(&mut session, items, chunk_size).await {
            // abort logs its own failure; the original error is the one to report
            let _ = session.abort().await;
            return Err(e);
        }

        self.log.debug(&format!(
            "wrote {} items to {}/{} in {} parts",
            items.len(),
            bucket,
            key,
            session.acknowledged_parts().len()
        ));
        Ok(())
    }

    async fn upload_chunks<T: Serialize + Sync>(
        session: &mut MultipartUploadSession,
        items: &[T],
        chunk_size: usize,
    ) -> StoreResult<()> {
        for chunk in items.chunks(chunk_size) {
            let body = to_ndjson(chunk)?;
            session.upload_part(body).await?;
        }
        session.complete().await
    }
}

/// One JSON document per element, joined with `\n`
pub fn to_ndjson<T: Serialize>(items: &[T]) -> StoreResult<String> {
    let lines = items
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlobLocator, MemoryObjectStore, TracingSink};
    use serde_json::json;

    #[test]
    fn test_to_ndjson_joins_without_trailing_newline() {
        let items = vec![json!({"id": 1}), json!("two"), json!(3)];
        assert_eq!(to_ndjson(&items).unwrap(), "{\"id\":1}\n\"two\"\n3");
    }

    #[test]
    fn test_to_ndjson_empty() {
        let items: Vec<u32> = Vec::new();
        assert_eq!(to_ndjson(&items).unwrap(), "");
    }

    #[tokio::test]
    async fn test_empty_input_leaves_no_open_upload() {
        let store = Arc::new(MemoryObjectStore::new());
        let writer = ChunkedArrayWriter::new(store.clone(), Arc::new(TracingSink));

        let err = writer
            .write_array(&Vec::<u32>::new(), "stats", "empty.ndjson", "application/json", 10)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::SessionProtocol { .. }));
        assert_eq!(store.pending_uploads(), 0);
        assert!(store.object(&BlobLocator::new("stats", "empty.ndjson")).is_none());
    }
}
