use std::time::Duration;

/// Bucket replays are read from unless configured otherwise
pub const DEFAULT_REPLAY_BUCKET: &str = "xml.firestoneapp.com";

/// Replays shorter than this are assumed to still be propagating
pub const DEFAULT_REPLAY_MIN_LEN: usize = 5_000;

/// Elements per multipart part when writing arrays
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

/// Bounded retry policy for one read attempt sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of fetches allowed, including the first one
    pub max_attempts: u32,

    /// Wait between two consecutive attempts
    pub delay: Duration,

    /// Emit an error log when every attempt failed.
    /// Disable for reads where a missing object is expected.
    pub log_on_exhaustion: bool,
}

impl RetryPolicy {
    /// Plain string reads: 10 attempts, 3s apart
    pub const STRING_READ: Self = Self::new(10, Duration::from_secs(3));

    /// Gzip reads: 10 attempts, 3s apart
    pub const GZIP_READ: Self = Self::new(10, Duration::from_secs(3));

    /// Zip reads: 10 attempts, 1s apart
    pub const ZIP_READ: Self = Self::new(10, Duration::from_secs(1));

    /// Replay consistency loader: 15 attempts, 500ms apart
    pub const REPLAY_LOAD: Self = Self::new(15, Duration::from_millis(500));

    /// Create a policy that logs on exhaustion
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            log_on_exhaustion: true,
        }
    }

    /// Set the number of attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay between attempts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Suppress the exhaustion error log
    pub fn quiet(mut self) -> Self {
        self.log_on_exhaustion = false;
        self
    }
}

/// Retry policies per read mode
#[derive(Debug, Clone)]
pub struct ReadPolicies {
    pub string: RetryPolicy,
    pub gzip: RetryPolicy,
    pub zip: RetryPolicy,
    pub replay: RetryPolicy,
}

impl Default for ReadPolicies {
    fn default() -> Self {
        Self {
            string: RetryPolicy::STRING_READ,
            gzip: RetryPolicy::GZIP_READ,
            zip: RetryPolicy::ZIP_READ,
            replay: RetryPolicy::REPLAY_LOAD,
        }
    }
}

/// Configuration for the store facade
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Retry policies used by the convenience read methods
    pub policies: ReadPolicies,

    /// Bucket the replay loader reads from
    pub replay_bucket: String,

    /// Replays shorter than this are retried as not yet consistent
    pub replay_min_len: usize,

    /// Elements per part for multipart array writes
    pub chunk_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            policies: ReadPolicies::default(),
            replay_bucket: DEFAULT_REPLAY_BUCKET.to_string(),
            replay_min_len: DEFAULT_REPLAY_MIN_LEN,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StoreConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all read policies
    pub fn with_policies(mut self, policies: ReadPolicies) -> Self {
        self.policies = policies;
        self
    }

    /// Set the replay bucket
    pub fn with_replay_bucket<S: Into<String>>(mut self, bucket: S) -> Self {
        self.replay_bucket = bucket.into();
        self
    }

    /// Set the minimum plausible replay length
    pub fn with_replay_min_len(mut self, len: usize) -> Self {
        self.replay_min_len = len;
        self
    }

    /// Set the replay retry policy
    pub fn with_replay_policy(mut self, policy: RetryPolicy) -> Self {
        self.policies.replay = policy;
        self
    }

    /// Set the default chunk size for multipart array writes
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Connection settings for S3-compatible storage
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,

    /// Custom endpoint (MinIO, LocalStack, RustFS...)
    pub endpoint_url: Option<String>,

    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,

    /// Path-style addressing, required by most S3-compatible servers
    pub force_path_style: bool,

    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: "us-west-2".to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
            connect_timeout: Duration::from_millis(3_000),
            operation_timeout: Duration::from_millis(2_000),
        }
    }
}

impl S3Config {
    /// Read settings from `REPLAY_STORE_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        fn get_env(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|value| !value.is_empty())
        }

        let defaults = Self::default();
        Self {
            region: get_env("REPLAY_STORE_REGION").unwrap_or(defaults.region),
            endpoint_url: get_env("REPLAY_STORE_ENDPOINT_URL"),
            access_key_id: get_env("REPLAY_STORE_ACCESS_KEY_ID"),
            secret_access_key: get_env("REPLAY_STORE_SECRET_ACCESS_KEY"),
            force_path_style: get_env("REPLAY_STORE_FORCE_PATH_STYLE")
                .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.force_path_style),
            connect_timeout: defaults.connect_timeout,
            operation_timeout: defaults.operation_timeout,
        }
    }

    /// Set the region
    pub fn with_region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = region.into();
        self
    }

    /// Point at a custom endpoint and switch to path-style addressing
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint_url: S) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self.force_path_style = true;
        self
    }

    /// Use static credentials instead of the default provider chain
    pub fn with_credentials<A: Into<String>, S: Into<String>>(mut self, access_key_id: A, secret_access_key: S) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Set connect and per-operation timeouts
    pub fn with_timeouts(mut self, connect: Duration, operation: Duration) -> Self {
        self.connect_timeout = connect;
        self.operation_timeout = operation;
        self
    }
}
