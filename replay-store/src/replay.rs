use crate::{
    BlobLocator, ReadMode, ReadOutcome, RetryPolicy, RetryingReader, StoreConfig, StoreError,
    StoreResult,
};

/// Loads replay documents, compensating for eventual consistency.
///
/// A replay that was just written can be served empty or truncated for a
/// short while. Payloads shorter than `min_len` are treated as not yet
/// consistent and re-read under the same budget as transport failures.
#[derive(Clone)]
pub struct ConsistencyAwareLoader {
    reader: RetryingReader,
    bucket: String,
    min_len: usize,
    policy: RetryPolicy,
}

impl ConsistencyAwareLoader {
    pub fn new(reader: RetryingReader, config: &StoreConfig) -> Self {
        Self {
            reader,
            bucket: config.replay_bucket.clone(),
            min_len: config.replay_min_len,
            policy: config.policies.replay,
        }
    }

    /// Load a replay by key. Keys ending in `.zip` are read as zip archives.
    pub async fn load_replay(&self, key: &str) -> ReadOutcome {
        let locator = BlobLocator::new(self.bucket.as_str(), key);
        let mode = ReadMode::for_replay_key(key);
        self.reader
            .retry(&format!("replay {}", key), &self.policy, || self.attempt(&locator, mode))
            .await
    }

    async fn attempt(&self, locator: &BlobLocator, mode: ReadMode) -> StoreResult<String> {
        let text = self.reader.fetch(locator, mode).await?;
        if text.len() < self.min_len {
            return Err(StoreError::NotYetConsistent {
                key: locator.key.clone(),
                len: text.len(),
                min_len: self.min_len,
            });
        }
        Ok(text)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}
