//! Router configuration
//!
//! Configuration comes from the environment ([`RouterConfig::from_env`]) or a
//! YAML file ([`RouterConfig::load`]) whose strings may reference the
//! environment as `${VAR:default}`.

pub mod loader;
mod settings;

pub use loader::{load_yaml_config, load_yaml_file};
pub use settings::{ExecutorSettings, ObservabilitySettings, RouterConfig, StoreSettings};
