//! Configuration for HTTP agent runtime clients.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for [`crate::HttpAgentClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentClientConfig {
    /// Project endpoint, e.g. `https://my-project.services.ai.azure.com/api/projects/p1`.
    pub endpoint: String,

    /// Value of the `api-version` query parameter.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Request timeout duration.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Extra attempts for transient failures (rate limits, 5xx, transport).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl AgentClientConfig {
    /// Create a configuration for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_version: default_api_version(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
        }
    }

    /// Set the API version.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many times a transient failure is retried.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before retry number `attempt` (0-based): 500ms doubling, capped at 8s.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let millis = 500u64.saturating_mul(1u64 << attempt.min(4));
        Duration::from_millis(millis)
    }
}

fn default_api_version() -> String {
    "2025-05-01".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_retries() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = AgentClientConfig::new("https://example.services.ai.azure.com/api/projects/p1")
            .with_api_version("v1")
            .with_timeout(Duration::from_secs(15))
            .with_max_retries(0);

        assert_eq!(config.api_version, "v1");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_config_defaults() {
        let config = AgentClientConfig::new("https://example.test");
        assert_eq!(config.api_version, "2025-05-01");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        let config = AgentClientConfig::new("https://example.test");
        assert_eq!(config.retry_delay(0), Duration::from_millis(500));
        assert_eq!(config.retry_delay(1), Duration::from_secs(1));
        assert_eq!(config.retry_delay(4), Duration::from_secs(8));
        assert_eq!(config.retry_delay(9), Duration::from_secs(8));
    }
}
