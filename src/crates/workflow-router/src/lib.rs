//! Dynamic workflow routing over remote agents
//!
//! Free-text requests are classified by an orchestrator agent whose
//! instructions list every enabled workflow, the chosen workflow definition is
//! resolved from a cached document-store registry, and a per-workflow remote
//! agent answers the request. Operators add or change workflows in the store;
//! [`DynamicWorkflowRouter::reload_workflows`] makes them routable without a
//! restart.
//!
//! Layers, leaf first:
//! - [`registry::WorkflowRegistry`]: read-through cache over a [`store::WorkflowStore`]
//! - [`lifecycle::AgentLifecycleManager`]: one remote agent per workflow id
//! - [`executor::WorkflowExecutor`]: one conversation turn, streamed back as text
//! - [`router::DynamicWorkflowRouter`]: classification and dispatch

pub mod config;
pub mod executor;
pub mod lifecycle;
pub mod registry;
pub mod router;
pub mod store;
pub mod telemetry;
pub mod workflow;

use agent_client::AgentClientError;
use thiserror::Error;

pub use config::{ExecutorSettings, ObservabilitySettings, RouterConfig, StoreSettings};
pub use executor::{collect_response, RequestContext, ResponseMode, ResponseStream, WorkflowExecutor};
pub use lifecycle::{sanitize_agent_name, AgentLifecycleManager, AgentStats};
pub use registry::{CacheStats, WorkflowRegistry};
pub use router::DynamicWorkflowRouter;
pub use store::{MemoryWorkflowStore, SqliteWorkflowStore, StoreError, StoreQuery, WorkflowStore};
pub use telemetry::{Telemetry, TracingTelemetry};
pub use workflow::{AgentConfig, ToolSpec, WorkflowDefinition, WorkflowMetadata, WorkflowPatch};

/// Errors that can occur while routing and executing workflows
#[derive(Debug, Error)]
pub enum RouterError {
    /// Missing or malformed connection parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Workflow id unknown to the store
    #[error("Workflow not found: {0}")]
    NotFound(String),

    /// Orchestrator run did not finish before the deadline
    #[error("Intent classification timed out after {0}s")]
    ClassificationTimeout(u64),

    /// Orchestrator run ended in a non-completed state
    #[error("Intent classification failed: {0}")]
    ClassificationFailed(String),

    /// Workflow document cannot be turned into an agent
    #[error("Invalid workflow definition: {0}")]
    InvalidDefinition(String),

    /// Remote agent runtime error
    #[error("Agent runtime error: {0}")]
    Remote(#[from] AgentClientError),

    /// Document store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error
    #[error("Router error: {0}")]
    General(String),
}

/// Result type for router operations
pub type Result<T> = std::result::Result<T, RouterError>;
