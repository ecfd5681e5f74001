use std::future::Future;
use std::sync::Arc;

use crate::{codec, BlobLocator, LogSink, ObjectStore, ReadMode, ReadOutcome, RetryPolicy, StoreResult};

/// Bounded-retry reads against an [`ObjectStore`].
///
/// Each attempt is one fetch followed by decoding. Failed attempts are
/// separated by the policy delay; after the last one the read resolves to
/// [`ReadOutcome::Exhausted`] instead of an error.
#[derive(Clone)]
pub struct RetryingReader {
    store: Arc<dyn ObjectStore>,
    log: Arc<dyn LogSink>,
}

impl RetryingReader {
    pub fn new(store: Arc<dyn ObjectStore>, log: Arc<dyn LogSink>) -> Self {
        Self { store, log }
    }

    /// Read an object as text, retrying per `policy`
    pub async fn read(&self, locator: &BlobLocator, mode: ReadMode, policy: &RetryPolicy) -> ReadOutcome {
        self.retry(&locator.to_string(), policy, || self.fetch(locator, mode))
            .await
    }

    /// One fetch plus decode, no retry
    pub async fn fetch(&self, locator: &BlobLocator, mode: ReadMode) -> StoreResult<String> {
        let body = self.store.get_object(locator).await?;
        codec::decode(mode, &body.bytes)
    }

    /// Drive `attempt` until it yields content or the policy runs out.
    ///
    /// Consistency misses are logged at debug level, every other failure as a
    /// warning. Both consume one attempt and wait out the delay.
    pub(crate) async fn retry<F, Fut>(&self, target: &str, policy: &RetryPolicy, mut attempt: F) -> ReadOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<String>>,
    {
        for number in 1..=policy.max_attempts {
            match attempt().await {
                Ok(text) => return ReadOutcome::Content(text),
                Err(err) => {
                    let remaining = policy.max_attempts - number;
                    let message = format!(
                        "could not read {} (attempt {}/{}, {} left): {}",
                        target, number, policy.max_attempts, remaining, err
                    );
                    if err.is_consistency_miss() {
                        self.log.debug(&message);
                    } else {
                        self.log.warn(&message);
                    }

                    if remaining > 0 {
                        tokio::time::sleep(policy.delay).await;
                    }
                }
            }
        }

        if policy.log_on_exhaustion {
            self.log.error(&format!(
                "could not read {} after {} attempts",
                target, policy.max_attempts
            ));
        }
        ReadOutcome::Exhausted
    }
}
