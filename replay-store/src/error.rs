use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to the object store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Object {key} not yet consistent: {len} bytes, expected at least {min_len}")]
    NotYetConsistent {
        key: String,
        len: usize,
        min_len: usize,
    },

    #[error("Could not decode content: {reason}")]
    Decompression { reason: String },

    #[error("Upload session protocol violation: {message}")]
    SessionProtocol { message: String },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create a backend error from a plain message
    pub fn backend_message<S: Into<String>>(message: S) -> Self {
        Self::Backend {
            source: Into::<String>::into(message).into(),
        }
    }

    /// Create a not found error
    pub fn not_found<B: Into<String>, K: Into<String>>(bucket: B, key: K) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create a decompression error
    pub fn decompression<S: Into<String>>(reason: S) -> Self {
        Self::Decompression {
            reason: reason.into(),
        }
    }

    /// Create a session protocol error
    pub fn session_protocol<S: Into<String>>(message: S) -> Self {
        Self::SessionProtocol {
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Whether a read path may spend another attempt on this error.
    ///
    /// Protocol and argument errors are caller mistakes and never go away on
    /// their own.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::SessionProtocol { .. } | Self::Invalid { .. } | Self::Serialization { .. }
        )
    }

    /// True when the fetch itself worked but the payload looked stale
    pub fn is_consistency_miss(&self) -> bool {
        matches!(self, Self::NotYetConsistent { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::not_found("b", "k").is_retryable());
        assert!(StoreError::decompression("bad header").is_retryable());
        assert!(StoreError::backend_message("timeout").is_retryable());
        assert!(!StoreError::session_protocol("complete twice").is_retryable());
        assert!(!StoreError::invalid("chunk size").is_retryable());
    }

    #[test]
    fn test_consistency_miss_display() {
        let err = StoreError::NotYetConsistent {
            key: "abc.xml".to_string(),
            len: 12,
            min_len: 5000,
        };
        assert!(err.is_consistency_miss());
        assert_eq!(
            err.to_string(),
            "Object abc.xml not yet consistent: 12 bytes, expected at least 5000"
        );
    }
}
