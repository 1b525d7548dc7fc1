use std::time::Duration;

use crate::session::ResizePolicy;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;

/// Runtime settings resolved from the command line and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Backend base URL without a trailing slash.
    pub api_url: String,
    pub timeout: Duration,
    pub resize_policy: ResizePolicy,
    /// Quiet period after the last resize before a refetch is issued.
    pub debounce: Duration,
}

impl Settings {
    pub fn new(api_url: &str, timeout_secs: u64) -> Self {
        Self {
            api_url: api_url.trim().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs.max(1)),
            ..Self::default()
        }
    }

    pub fn with_resize_policy(mut self, policy: ResizePolicy) -> Self {
        self.resize_policy = policy;
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            resize_policy: ResizePolicy::Reslice,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}
