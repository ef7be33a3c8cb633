//! The remote agent runtime seam.

use crate::error::Result;
use crate::types::{AgentDefinition, AgentHandle, MessageRole, Run, Thread, ThreadMessage};
use async_trait::async_trait;

/// Operations a hosted agent service must provide.
///
/// Agents are long-lived; threads, messages, and runs are scoped to a single
/// conversation turn by callers.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Fetch an agent by id. Doubles as a liveness probe.
    async fn get_agent(&self, agent_id: &str) -> Result<AgentHandle>;

    /// Create an agent under the given (already sanitized) name.
    async fn create_agent(&self, name: &str, definition: &AgentDefinition) -> Result<AgentHandle>;

    async fn delete_agent(&self, agent: &AgentHandle) -> Result<()>;

    async fn create_thread(&self) -> Result<Thread>;

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage>;

    /// Start a run of `agent_id` over the thread.
    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Messages of a thread, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;

    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Release client resources.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
