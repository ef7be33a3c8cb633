//! Dynamic workflow router
//!
//! The router initializes lazily on first use: it parses the connection
//! string, connects the registry, wires the lifecycle manager and executor,
//! and builds the orchestrator agent from the enabled-workflow catalog.
//!
//! User-shaped problems (no matching workflow, unknown workflow id) come back
//! as response text. Configuration errors and classification timeouts come
//! back as `Err`.

mod connection;
pub mod orchestrator;

pub use connection::parse_connection_string;
pub use orchestrator::{
    build_catalog, orchestrator_config, parse_classification, NO_MATCH, ORCHESTRATOR_AGENT_NAME,
    ORCHESTRATOR_ID,
};

use crate::config::RouterConfig;
use crate::executor::{
    build_classification_prompt, latest_assistant_text, single_chunk, wait_for_run, PollOutcome,
    RequestContext, ResponseMode, ResponseStream, WorkflowExecutor,
};
use crate::lifecycle::{AgentLifecycleManager, AgentStats};
use crate::registry::WorkflowRegistry;
use crate::store::WorkflowStore;
use crate::telemetry::{Telemetry, TracingTelemetry};
use crate::workflow::WorkflowDefinition;
use crate::{Result, RouterError};
use agent_client::{
    AgentClientConfig, AgentHandle, AgentRuntime, CredentialProvider, EnvironmentCredential,
    HttpAgentClient, MessageRole, RunStatus,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Reply when nothing matches and no fallback is configured
pub const NO_MATCH_REPLY: &str = "I'm sorry, I couldn't determine how to help with that request. Please try rephrasing or provide more details.";

/// Collaborators built on first use
struct Components {
    runtime: Arc<dyn AgentRuntime>,
    lifecycle: Arc<AgentLifecycleManager>,
    executor: WorkflowExecutor,
    telemetry: Option<Arc<dyn Telemetry>>,
    orchestrator: RwLock<AgentHandle>,
}

/// Classifies free-text requests and dispatches them to workflow agents
pub struct DynamicWorkflowRouter {
    config: RouterConfig,
    registry: Arc<WorkflowRegistry>,
    runtime: Option<Arc<dyn AgentRuntime>>,
    credential: Option<Arc<dyn CredentialProvider>>,
    telemetry: Option<Arc<dyn Telemetry>>,
    components: OnceCell<Components>,
}

impl DynamicWorkflowRouter {
    pub fn new(config: RouterConfig, store: Arc<dyn WorkflowStore>) -> Self {
        let registry = Arc::new(WorkflowRegistry::new(store, config.store.clone()));
        Self {
            config,
            registry,
            runtime: None,
            credential: None,
            telemetry: None,
            components: OnceCell::new(),
        }
    }

    /// Use this runtime instead of an HTTP client for the parsed endpoint
    pub fn with_runtime(mut self, runtime: Arc<dyn AgentRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Credential for the HTTP client; defaults to [`EnvironmentCredential`]
    pub fn with_credential(mut self, credential: Arc<dyn CredentialProvider>) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Telemetry sink, used when observability is enabled; defaults to
    /// [`TracingTelemetry`]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    pub fn is_initialized(&self) -> bool {
        self.components.initialized()
    }

    /// Initialize eagerly. Runs at most once; later calls are no-ops.
    pub async fn initialize(&self) -> Result<()> {
        self.components().await.map(|_| ())
    }

    async fn components(&self) -> Result<&Components> {
        self.components
            .get_or_try_init(|| self.build_components())
            .await
    }

    async fn build_components(&self) -> Result<Components> {
        let endpoint = parse_connection_string(self.config.require_connection_string()?)?;

        let runtime: Arc<dyn AgentRuntime> = match &self.runtime {
            Some(runtime) => runtime.clone(),
            None => {
                let credential = self
                    .credential
                    .clone()
                    .unwrap_or_else(|| Arc::new(EnvironmentCredential::default()));
                Arc::new(HttpAgentClient::new(
                    AgentClientConfig::new(endpoint.clone()),
                    credential,
                )?)
            }
        };

        self.registry.initialize().await?;

        let telemetry = self.config.observability.enabled.then(|| {
            self.telemetry
                .clone()
                .unwrap_or_else(|| Arc::new(TracingTelemetry) as Arc<dyn Telemetry>)
        });

        let lifecycle = Arc::new(AgentLifecycleManager::new(runtime.clone()));
        let mut executor =
            WorkflowExecutor::new(runtime.clone(), lifecycle.clone(), self.config.executor.clone());
        if let Some(telemetry) = &telemetry {
            executor = executor.with_telemetry(telemetry.clone());
        }

        let orchestrator = self.create_orchestrator(&lifecycle).await?;

        info!(endpoint = %endpoint, "Dynamic workflow router initialized");
        Ok(Components {
            runtime,
            lifecycle,
            executor,
            telemetry,
            orchestrator: RwLock::new(orchestrator),
        })
    }

    async fn create_orchestrator(&self, lifecycle: &AgentLifecycleManager) -> Result<AgentHandle> {
        let workflows = self.registry.list_workflows(None, true).await?;
        let config = orchestrator_config(&self.config.orchestrator_model, &workflows);

        let handle = lifecycle
            .get_or_create_agent(ORCHESTRATOR_ID, ORCHESTRATOR_ID, &config)
            .await?;
        debug!(
            agent_id = %handle.agent_id,
            workflows = workflows.len(),
            "Orchestrator ready"
        );
        Ok(handle)
    }

    /// Ask the orchestrator which workflow should handle `input`. Returns a
    /// workflow id or [`NO_MATCH`].
    pub async fn classify_intent(
        &self,
        input: &str,
        context: Option<&RequestContext>,
    ) -> Result<String> {
        let components = self.components().await?;
        let agent_id = components.orchestrator.read().agent_id.clone();
        let prompt = build_classification_prompt(input, context);

        let started = Instant::now();
        let thread = components.runtime.create_thread().await?;

        let result = self
            .classify_on_thread(components, &thread.id, &agent_id, &prompt)
            .await;

        if let Err(e) = components.runtime.delete_thread(&thread.id).await {
            warn!(thread_id = %thread.id, error = %e, "Failed to delete classification thread");
        }

        if let Some(telemetry) = &components.telemetry {
            let (tokens, success) = match &result {
                Ok((_, tokens)) => (*tokens, true),
                Err(_) => (0, false),
            };
            let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
            telemetry.track_agent_call(ORCHESTRATOR_AGENT_NAME, duration_ms, tokens, success);
        }

        let (workflow_id, _) = result?;
        info!(workflow_id = %workflow_id, "Classified intent");
        Ok(workflow_id)
    }

    async fn classify_on_thread(
        &self,
        components: &Components,
        thread_id: &str,
        agent_id: &str,
        prompt: &str,
    ) -> Result<(String, u64)> {
        let runtime = components.runtime.as_ref();
        runtime
            .create_message(thread_id, MessageRole::User, prompt)
            .await?;
        let run = runtime.create_run(thread_id, agent_id).await?;

        let timeout = self.config.classification_timeout();
        let run = match wait_for_run(
            runtime,
            thread_id,
            run,
            self.config.executor.poll_interval(),
            Some(timeout),
        )
        .await?
        {
            PollOutcome::Finished(run) => run,
            PollOutcome::TimedOut(_) => {
                return Err(RouterError::ClassificationTimeout(timeout.as_secs()));
            }
        };

        if run.status != RunStatus::Completed {
            return Err(RouterError::ClassificationFailed(run.status.to_string()));
        }

        let messages = runtime.list_messages(thread_id).await?;
        let answer = latest_assistant_text(&messages).ok_or_else(|| {
            RouterError::ClassificationFailed("orchestrator gave no answer".to_string())
        })?;

        Ok((parse_classification(&answer)?, run.total_tokens()))
    }

    /// Classify, resolve, and execute. Unmatched or unknown workflows yield a
    /// single explanatory chunk.
    pub async fn route_and_execute(
        &self,
        input: &str,
        context: Option<RequestContext>,
        mode: ResponseMode,
    ) -> Result<ResponseStream> {
        let components = self.components().await?;
        debug!(input = %preview(input), "Processing request");

        let mut workflow_id = self.classify_intent(input, context.as_ref()).await?;

        if workflow_id == NO_MATCH {
            match &self.config.fallback_workflow_id {
                Some(fallback) => {
                    warn!(fallback = %fallback, "No workflow matched, using fallback");
                    workflow_id = fallback.clone();
                }
                None => {
                    info!("No workflow matched");
                    return Ok(single_chunk(NO_MATCH_REPLY));
                }
            }
        }

        let Some(workflow) = self.registry.get_workflow(&workflow_id).await? else {
            return Ok(single_chunk(format!(
                "Error: Workflow '{}' not found in database.",
                workflow_id
            )));
        };

        info!(workflow_id = %workflow_id, "Routing to workflow");
        Ok(components.executor.execute(workflow, input, context, mode))
    }

    /// Execute a workflow by id, skipping classification
    pub async fn execute_workflow(
        &self,
        workflow_id: &str,
        input: &str,
        context: Option<RequestContext>,
        mode: ResponseMode,
    ) -> Result<ResponseStream> {
        let components = self.components().await?;

        let Some(workflow) = self.registry.get_workflow(workflow_id).await? else {
            return Ok(single_chunk(format!("Error: Workflow '{}' not found.", workflow_id)));
        };

        Ok(components.executor.execute(workflow, input, context, mode))
    }

    /// Enabled workflows
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>> {
        self.components().await?;
        self.registry.list_workflows(None, true).await
    }

    pub async fn get_workflow_info(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>> {
        self.components().await?;
        self.registry.get_workflow(workflow_id).await
    }

    pub async fn search_workflows<S: AsRef<str>>(
        &self,
        keywords: &[S],
    ) -> Result<Vec<WorkflowDefinition>> {
        self.components().await?;
        self.registry.search_workflows(keywords).await
    }

    /// Drop registry caches and rebuild the orchestrator from the current
    /// catalog
    pub async fn reload_workflows(&self) -> Result<()> {
        let components = self.components().await?;
        self.registry.clear_cache();

        let handle = self.create_orchestrator(&components.lifecycle).await?;
        *components.orchestrator.write() = handle;

        info!("Workflows reloaded");
        Ok(())
    }

    /// Agents currently held by the lifecycle manager
    pub fn agent_stats(&self) -> Option<AgentStats> {
        self.components.get().map(|c| c.lifecycle.agent_stats())
    }

    /// Delete every agent, then close the registry and the runtime client.
    /// Failures are logged and never returned.
    pub async fn cleanup(&self) {
        if let Some(components) = self.components.get() {
            let deleted = components.lifecycle.cleanup_all().await;
            debug!(deleted, "Deleted agents");
        }

        if let Err(e) = self.registry.close().await {
            warn!(error = %e, "Failed to close workflow registry");
        }

        if let Some(components) = self.components.get() {
            if let Err(e) = components.runtime.close().await {
                warn!(error = %e, "Failed to close agent runtime");
            }
        }

        info!("Cleanup complete");
    }
}

fn preview(input: &str) -> &str {
    match input.char_indices().nth(100) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}
