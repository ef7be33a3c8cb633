//! Client seam for remote agent-hosting runtimes.
//!
//! Agents are created once and reused; every conversation turn opens a thread,
//! posts a message, starts a run, polls it, reads the reply and deletes the
//! thread. [`AgentRuntime`] captures exactly those operations so routers and
//! executors can be tested against in-process fakes.
//!
//! [`HttpAgentClient`] implements the trait over an assistants-style REST API.

pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod runtime;
pub mod types;

pub use config::AgentClientConfig;
pub use credential::{CredentialProvider, EnvironmentCredential, StaticCredential};
pub use error::{AgentClientError, Result};
pub use http::HttpAgentClient;
pub use runtime::AgentRuntime;
pub use types::{
    AgentDefinition, AgentHandle, FunctionDefinition, MessageContent, MessageRole, Run, RunError,
    RunStatus, RunUsage, TextContent, Thread, ThreadMessage, ToolDescriptor,
};
