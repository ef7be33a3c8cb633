use super::loader::load_yaml_config;
use crate::{Result, RouterError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Agent project connection string: a direct `https://` endpoint or
    /// `key=value;` pairs carrying `Endpoint` or `HostName`
    #[serde(default)]
    pub connection_string: Option<String>,

    /// Model deployment used by the orchestrator agent
    #[serde(default = "default_orchestrator_model")]
    pub orchestrator_model: String,

    /// Workflow executed when classification yields no match
    #[serde(default)]
    pub fallback_workflow_id: Option<String>,

    #[serde(default = "default_classification_timeout_secs")]
    pub classification_timeout_secs: u64,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub executor: ExecutorSettings,

    #[serde(default)]
    pub observability: ObservabilitySettings,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            orchestrator_model: default_orchestrator_model(),
            fallback_workflow_id: None,
            classification_timeout_secs: default_classification_timeout_secs(),
            store: StoreSettings::default(),
            executor: ExecutorSettings::default(),
            observability: ObservabilitySettings::default(),
        }
    }
}

impl RouterConfig {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: Some(connection_string.into()),
            ..Self::default()
        }
    }

    /// Build from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = StoreSettings::default();

        Self {
            connection_string: var("PROJECT_CONNECTION_STRING"),
            orchestrator_model: var("AZURE_OPENAI_DEPLOYMENT_NAME")
                .unwrap_or_else(default_orchestrator_model),
            fallback_workflow_id: var("FALLBACK_WORKFLOW_ID"),
            classification_timeout_secs: default_classification_timeout_secs(),
            store: StoreSettings {
                endpoint: var("COSMOS_DB_ENDPOINT"),
                key: var("COSMOS_DB_KEY"),
                database: var("COSMOS_DB_DATABASE").unwrap_or(defaults.database),
                container: var("COSMOS_DB_CONTAINER").unwrap_or(defaults.container),
                ..defaults
            },
            executor: ExecutorSettings::default(),
            observability: ObservabilitySettings {
                enabled: var("ENABLE_OBSERVABILITY")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
            },
        }
    }

    /// Load a YAML file (with `${VAR:default}` expansion)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: RouterConfig = load_yaml_config(path)?;
        Ok(config.normalized())
    }

    /// Empty strings left behind by `${VAR:}` expansion mean "unset"
    fn normalized(mut self) -> Self {
        fn blank_to_none(value: &mut Option<String>) {
            if value.as_deref().map(|v| v.trim().is_empty()).unwrap_or(false) {
                *value = None;
            }
        }
        blank_to_none(&mut self.connection_string);
        blank_to_none(&mut self.fallback_workflow_id);
        blank_to_none(&mut self.store.endpoint);
        blank_to_none(&mut self.store.key);
        self
    }

    pub fn with_fallback_workflow(mut self, workflow_id: impl Into<String>) -> Self {
        self.fallback_workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_orchestrator_model(mut self, model: impl Into<String>) -> Self {
        self.orchestrator_model = model.into();
        self
    }

    pub fn with_store(mut self, store: StoreSettings) -> Self {
        self.store = store;
        self
    }

    pub fn with_executor(mut self, executor: ExecutorSettings) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_classification_timeout(mut self, timeout: Duration) -> Self {
        self.classification_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_observability(mut self, enabled: bool) -> Self {
        self.observability.enabled = enabled;
        self
    }

    pub fn classification_timeout(&self) -> Duration {
        Duration::from_secs(self.classification_timeout_secs)
    }

    /// The connection string, or a configuration error naming the variable
    pub fn require_connection_string(&self) -> Result<&str> {
        self.connection_string
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                RouterError::Configuration(
                    "PROJECT_CONNECTION_STRING must be set".to_string(),
                )
            })
    }
}

/// Document store location and cache policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Store endpoint; the database URL for the SQLite driver
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Access key, for drivers that need one
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_container")]
    pub container: String,

    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            key: None,
            database: default_database(),
            container: default_container(),
            cache_enabled: true,
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl StoreSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_cache(mut self, enabled: bool, ttl: Duration) -> Self {
        self.cache_enabled = enabled;
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Timing of a single workflow turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorSettings {
    /// Delay between run status checks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay between streamed words
    #[serde(default = "default_stream_delay_ms")]
    pub stream_delay_ms: u64,

    /// Give up on a run that is still pending after this long; `None` waits forever
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: Option<u64>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            stream_delay_ms: default_stream_delay_ms(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

impl ExecutorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stream_delay(&self) -> Duration {
        Duration::from_millis(self.stream_delay_ms)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    /// Report every agent call to the telemetry sink
    #[serde(default)]
    pub enabled: bool,
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn default_orchestrator_model() -> String {
    "gpt-4o".to_string()
}

fn default_classification_timeout_secs() -> u64 {
    30
}

fn default_database() -> String {
    "workflows".to_string()
}

fn default_container() -> String {
    "workflow_definitions".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_stream_delay_ms() -> u64 {
    20
}

fn default_run_timeout_secs() -> Option<u64> {
    Some(300)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.orchestrator_model, "gpt-4o");
        assert_eq!(config.classification_timeout(), Duration::from_secs(30));
        assert_eq!(config.store.database, "workflows");
        assert_eq!(config.store.container, "workflow_definitions");
        assert!(config.store.cache_enabled);
        assert_eq!(config.store.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.executor.poll_interval(), Duration::from_millis(500));
        assert!(!config.observability.enabled);
        assert!(config.require_connection_string().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("PROJECT_CONNECTION_STRING", "https://example.test/api/projects/p1"),
            ("AZURE_OPENAI_DEPLOYMENT_NAME", "gpt-4.1"),
            ("COSMOS_DB_ENDPOINT", "sqlite::memory:"),
            ("COSMOS_DB_CONTAINER", "custom"),
            ("FALLBACK_WORKFLOW_ID", ""),
            ("ENABLE_OBSERVABILITY", "True"),
        ]
        .into_iter()
        .collect();

        let config = RouterConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(
            config.require_connection_string().unwrap(),
            "https://example.test/api/projects/p1"
        );
        assert_eq!(config.orchestrator_model, "gpt-4.1");
        assert_eq!(config.store.endpoint.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.store.database, "workflows");
        assert_eq!(config.store.container, "custom");
        assert_eq!(config.fallback_workflow_id, None);
        assert!(config.observability.enabled);
    }

    #[test]
    fn test_load_yaml() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"
connection_string: "Endpoint=https://example.test/api/projects/p1;Project=p1"
fallback_workflow_id: "${{WORKFLOW_ROUTER_TEST_UNSET:}}"
store:
  endpoint: "sqlite::memory:"
  cache_ttl_secs: 60
executor:
  poll_interval_ms: 100
  run_timeout_secs: null
"#
        )?;

        let config = RouterConfig::load(file.path())?;
        assert!(config.connection_string.is_some());
        assert_eq!(config.fallback_workflow_id, None);
        assert_eq!(config.store.cache_ttl_secs, 60);
        assert_eq!(config.store.container, "workflow_definitions");
        assert_eq!(config.executor.poll_interval_ms, 100);
        assert_eq!(config.executor.run_timeout(), None);
        assert_eq!(config.executor.stream_delay_ms, 20);
        Ok(())
    }
}
