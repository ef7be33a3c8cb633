//! Remote agent lifecycle
//!
//! Keeps at most one live remote agent per workflow id in this process.
//! Entries are process-local and never persisted; a cached agent is probed
//! before reuse and recreated if the runtime no longer knows it.

mod naming;
mod tools;

pub use naming::{sanitize_agent_name, MAX_AGENT_NAME_LEN};
pub use tools::{build_agent_definition, build_tool, build_tools, ToolKind};

use crate::workflow::{AgentConfig, WorkflowDefinition};
use crate::Result;
use agent_client::{AgentDefinition, AgentHandle, AgentRuntime};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct AgentRegistryEntry {
    handle: AgentHandle,
    definition: AgentDefinition,
}

/// Counts of live agents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStats {
    pub total_agents: usize,
    pub workflow_ids: Vec<String>,
}

/// Get-or-create manager for per-workflow remote agents
pub struct AgentLifecycleManager {
    runtime: Arc<dyn AgentRuntime>,
    agents: DashMap<String, AgentRegistryEntry>,
    creation_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AgentLifecycleManager {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self {
            runtime,
            agents: DashMap::new(),
            creation_locks: DashMap::new(),
        }
    }

    fn creation_lock(&self, workflow_id: &str) -> Arc<Mutex<()>> {
        self.creation_locks
            .entry(workflow_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Agent for a workflow document
    pub async fn agent_for(&self, workflow: &WorkflowDefinition) -> Result<AgentHandle> {
        self.get_or_create_agent(&workflow.id, workflow.display_name(), &workflow.agent_config)
            .await
    }

    /// Return the cached agent if it is still alive and built from the same
    /// definition; otherwise create (or replace) it.
    pub async fn get_or_create_agent(
        &self,
        workflow_id: &str,
        display_name: &str,
        config: &AgentConfig,
    ) -> Result<AgentHandle> {
        let definition = build_agent_definition(config)?;
        let name = sanitize_agent_name(display_name, workflow_id);

        let lock = self.creation_lock(workflow_id);
        let _guard = lock.lock().await;

        let cached = self.agents.get(workflow_id).map(|entry| entry.value().clone());
        if let Some(entry) = cached {
            if entry.definition == definition && entry.handle.name == name {
                match self.runtime.get_agent(&entry.handle.agent_id).await {
                    Ok(_) => {
                        debug!(workflow_id, agent_id = %entry.handle.agent_id, "Reusing agent");
                        return Ok(entry.handle);
                    }
                    Err(e) => {
                        warn!(
                            workflow_id,
                            agent_id = %entry.handle.agent_id,
                            error = %e,
                            "Cached agent failed liveness probe, recreating"
                        );
                        self.agents.remove(workflow_id);
                    }
                }
            } else {
                info!(workflow_id, "Agent definition changed, replacing agent");
                self.agents.remove(workflow_id);
                if let Err(e) = self.runtime.delete_agent(&entry.handle).await {
                    warn!(workflow_id, error = %e, "Failed to delete replaced agent");
                }
            }
        }

        let handle = self.runtime.create_agent(&name, &definition).await?;
        info!(workflow_id, agent_id = %handle.agent_id, name = %name, "Created agent");

        self.agents.insert(
            workflow_id.to_string(),
            AgentRegistryEntry {
                handle: handle.clone(),
                definition,
            },
        );
        Ok(handle)
    }

    pub fn get_agent_id(&self, workflow_id: &str) -> Option<String> {
        self.agents
            .get(workflow_id)
            .map(|entry| entry.handle.agent_id.clone())
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agent_stats(&self) -> AgentStats {
        let mut workflow_ids: Vec<String> =
            self.agents.iter().map(|entry| entry.key().clone()).collect();
        workflow_ids.sort();
        AgentStats {
            total_agents: workflow_ids.len(),
            workflow_ids,
        }
    }

    /// Forget the workflow's agent and delete it remotely. The local entry is
    /// always removed; returns whether the remote deletion succeeded.
    pub async fn cleanup_agent(&self, workflow_id: &str) -> bool {
        let Some((_, entry)) = self.agents.remove(workflow_id) else {
            return false;
        };

        match self.runtime.delete_agent(&entry.handle).await {
            Ok(()) => {
                info!(workflow_id, agent_id = %entry.handle.agent_id, "Cleaned up agent");
                true
            }
            Err(e) => {
                warn!(workflow_id, error = %e, "Failed to delete agent");
                false
            }
        }
    }

    /// Clean up every agent; returns how many remote deletions succeeded
    pub async fn cleanup_all(&self) -> usize {
        let workflow_ids: Vec<String> = self.agents.iter().map(|e| e.key().clone()).collect();

        let mut deleted = 0;
        for workflow_id in workflow_ids {
            if self.cleanup_agent(&workflow_id).await {
                deleted += 1;
            }
        }
        deleted
    }
}
