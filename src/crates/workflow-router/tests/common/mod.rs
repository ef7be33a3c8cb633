//! Shared fixtures for integration tests

#![allow(dead_code)]

use agent_client::{
    AgentClientError, AgentDefinition, AgentHandle, AgentRuntime, MessageContent, MessageRole,
    Run, RunStatus, RunUsage, TextContent, Thread, ThreadMessage,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use workflow_router::config::StoreSettings;
use workflow_router::{
    MemoryWorkflowStore, RouterConfig, StoreError, StoreQuery, Telemetry, WorkflowDefinition,
    WorkflowStore,
};

pub const ENDPOINT: &str = "https://example.test/api/projects/p1";

/// Router config pointing at test doubles
pub fn router_config() -> RouterConfig {
    RouterConfig::new(ENDPOINT).with_store(StoreSettings::new("memory://workflows"))
}

pub fn workflow(id: &str, description: &str) -> WorkflowDefinition {
    WorkflowDefinition::new(id, id)
        .with_description(description)
        .with_instructions(format!("You handle {}", description.to_lowercase()))
}

#[derive(Debug, Clone)]
pub struct CreatedAgent {
    pub agent_id: String,
    pub name: String,
    pub definition: AgentDefinition,
}

#[derive(Debug, Clone)]
struct MockRun {
    thread_id: String,
    agent_name: String,
    polls_left: usize,
    status: RunStatus,
}

#[derive(Default)]
struct State {
    next_id: usize,
    live_agents: HashMap<String, String>,
    created: Vec<CreatedAgent>,
    deleted_agents: Vec<String>,
    get_agent_calls: usize,
    threads_created: usize,
    threads_deleted: Vec<String>,
    messages: Vec<(String, String)>,
    thread_agent: HashMap<String, String>,
    runs: HashMap<String, MockRun>,

    replies: HashMap<String, String>,
    run_status: HashMap<String, RunStatus>,
    pending_polls: usize,
    never_finish: bool,
    usage: Option<RunUsage>,
    fail_delete_thread: bool,
    fail_create_thread: bool,
    fail_delete_agent: bool,
    closed: bool,
}

/// Scriptable in-process agent runtime.
///
/// Replies are chosen by agent name; runs stay `in_progress` for
/// `pending_polls` status checks before reaching their final status.
pub struct MockRuntime {
    state: Mutex<State>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        let state = State {
            pending_polls: 1,
            usage: Some(RunUsage {
                prompt_tokens: 30,
                completion_tokens: 12,
                total_tokens: 42,
            }),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Reply text for agents with this (sanitized) name
    pub fn reply(self, agent_name: &str, text: &str) -> Self {
        self.state()
            .replies
            .insert(agent_name.to_string(), text.to_string());
        self
    }

    /// The orchestrator's classification answer
    pub fn classify_as(self, answer: &str) -> Self {
        self.reply("orchestrator", answer)
    }

    /// Final status of runs by agents with this name
    pub fn finish_with(self, agent_name: &str, status: RunStatus) -> Self {
        self.state()
            .run_status
            .insert(agent_name.to_string(), status);
        self
    }

    pub fn never_finish(self) -> Self {
        self.state().never_finish = true;
        self
    }

    pub fn without_usage(self) -> Self {
        self.state().usage = None;
        self
    }

    pub fn failing_thread_deletes(self) -> Self {
        self.state().fail_delete_thread = true;
        self
    }

    pub fn failing_thread_creation(self) -> Self {
        self.state().fail_create_thread = true;
        self
    }

    pub fn failing_agent_deletes(self) -> Self {
        self.state().fail_delete_agent = true;
        self
    }

    /// Simulate an agent deleted behind our back
    pub fn forget_agent(&self, agent_id: &str) {
        self.state().live_agents.remove(agent_id);
    }

    pub fn created_agents(&self) -> Vec<CreatedAgent> {
        self.state().created.clone()
    }

    pub fn create_agent_calls(&self) -> usize {
        self.state().created.len()
    }

    pub fn created_named(&self, name: &str) -> Vec<CreatedAgent> {
        self.state()
            .created
            .iter()
            .filter(|a| a.name == name)
            .cloned()
            .collect()
    }

    pub fn deleted_agents(&self) -> Vec<String> {
        self.state().deleted_agents.clone()
    }

    pub fn live_agent_count(&self) -> usize {
        self.state().live_agents.len()
    }

    pub fn get_agent_calls(&self) -> usize {
        self.state().get_agent_calls
    }

    pub fn threads_created(&self) -> usize {
        self.state().threads_created
    }

    pub fn threads_deleted(&self) -> usize {
        self.state().threads_deleted.len()
    }

    /// Contents of every user message, in order
    pub fn sent_messages(&self) -> Vec<String> {
        self.state()
            .messages
            .iter()
            .map(|(_, content)| content.clone())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn next_id(state: &mut State, prefix: &str) -> String {
        state.next_id += 1;
        format!("{}_{}", prefix, state.next_id)
    }

    fn snapshot(run_id: &str, run: &MockRun, agent_id: &str, usage: Option<RunUsage>) -> Run {
        Run {
            id: run_id.to_string(),
            thread_id: run.thread_id.clone(),
            agent_id: agent_id.to_string(),
            status: run.status,
            usage: if run.status.is_terminal() { usage } else { None },
            last_error: None,
        }
    }
}

fn not_found(what: &str) -> AgentClientError {
    AgentClientError::NotFound(what.to_string())
}

#[async_trait]
impl AgentRuntime for MockRuntime {
    async fn get_agent(&self, agent_id: &str) -> agent_client::Result<AgentHandle> {
        let mut state = self.state();
        state.get_agent_calls += 1;
        let name = state
            .live_agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| not_found(agent_id))?;
        Ok(AgentHandle {
            agent_id: agent_id.to_string(),
            name,
            version: "1".to_string(),
        })
    }

    async fn create_agent(
        &self,
        name: &str,
        definition: &AgentDefinition,
    ) -> agent_client::Result<AgentHandle> {
        let mut state = self.state();
        let agent_id = Self::next_id(&mut state, "asst");
        state.live_agents.insert(agent_id.clone(), name.to_string());
        state.created.push(CreatedAgent {
            agent_id: agent_id.clone(),
            name: name.to_string(),
            definition: definition.clone(),
        });
        Ok(AgentHandle {
            agent_id,
            name: name.to_string(),
            version: "1".to_string(),
        })
    }

    async fn delete_agent(&self, agent: &AgentHandle) -> agent_client::Result<()> {
        let mut state = self.state();
        if state.fail_delete_agent {
            return Err(AgentClientError::ApiError {
                status: 500,
                message: "delete failed".to_string(),
            });
        }
        state.live_agents.remove(&agent.agent_id);
        state.deleted_agents.push(agent.agent_id.clone());
        Ok(())
    }

    async fn create_thread(&self) -> agent_client::Result<Thread> {
        let mut state = self.state();
        if state.fail_create_thread {
            return Err(AgentClientError::ApiError {
                status: 503,
                message: "threads unavailable".to_string(),
            });
        }
        state.threads_created += 1;
        let id = Self::next_id(&mut state, "thread");
        Ok(Thread { id })
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> agent_client::Result<ThreadMessage> {
        let mut state = self.state();
        state
            .messages
            .push((thread_id.to_string(), content.to_string()));
        let id = Self::next_id(&mut state, "msg");
        Ok(ThreadMessage {
            id,
            role,
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: content.to_string(),
                },
            }],
        })
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> agent_client::Result<Run> {
        let mut state = self.state();
        let agent_name = state
            .live_agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| not_found(agent_id))?;
        state
            .thread_agent
            .insert(thread_id.to_string(), agent_name.clone());

        let run_id = Self::next_id(&mut state, "run");
        let run = MockRun {
            thread_id: thread_id.to_string(),
            agent_name,
            polls_left: state.pending_polls,
            status: RunStatus::Queued,
        };
        let snapshot = Self::snapshot(&run_id, &run, agent_id, state.usage);
        state.runs.insert(run_id, run);
        Ok(snapshot)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> agent_client::Result<Run> {
        let mut state = self.state();
        let never_finish = state.never_finish;
        let usage = state.usage;
        let final_status = {
            let run = state.runs.get(run_id).ok_or_else(|| not_found(run_id))?;
            state
                .run_status
                .get(&run.agent_name)
                .copied()
                .unwrap_or(RunStatus::Completed)
        };

        let run = state.runs.get_mut(run_id).ok_or_else(|| not_found(run_id))?;
        assert_eq!(run.thread_id, thread_id);
        if never_finish || run.polls_left > 0 {
            run.polls_left = run.polls_left.saturating_sub(1);
            run.status = RunStatus::InProgress;
        } else {
            run.status = final_status;
        }
        let run = run.clone();
        Ok(Self::snapshot(run_id, &run, "agent", usage))
    }

    async fn list_messages(&self, thread_id: &str) -> agent_client::Result<Vec<ThreadMessage>> {
        let state = self.state();
        let agent_name = state
            .thread_agent
            .get(thread_id)
            .cloned()
            .ok_or_else(|| not_found(thread_id))?;
        let reply = state
            .replies
            .get(&agent_name)
            .cloned()
            .unwrap_or_else(|| format!("Reply from {}", agent_name));

        let user_text = state
            .messages
            .iter()
            .rev()
            .find(|(t, _)| t == thread_id)
            .map(|(_, c)| c.clone())
            .unwrap_or_default();

        let text = |value: String| {
            vec![MessageContent::Text {
                text: TextContent { value },
            }]
        };
        Ok(vec![
            ThreadMessage {
                id: "msg_reply".to_string(),
                role: MessageRole::Assistant,
                content: text(reply),
            },
            ThreadMessage {
                id: "msg_user".to_string(),
                role: MessageRole::User,
                content: text(user_text),
            },
        ])
    }

    async fn delete_thread(&self, thread_id: &str) -> agent_client::Result<()> {
        let mut state = self.state();
        state.threads_deleted.push(thread_id.to_string());
        if state.fail_delete_thread {
            return Err(AgentClientError::ApiError {
                status: 500,
                message: "thread delete failed".to_string(),
            });
        }
        Ok(())
    }

    async fn close(&self) -> agent_client::Result<()> {
        self.state().closed = true;
        Ok(())
    }
}

/// Memory store that counts queries
pub struct CountingStore {
    inner: MemoryWorkflowStore,
    queries: AtomicUsize,
    closed: AtomicUsize,
}

impl CountingStore {
    pub fn new(workflows: impl IntoIterator<Item = WorkflowDefinition>) -> Self {
        Self {
            inner: MemoryWorkflowStore::with_workflows(workflows),
            queries: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn document(&self, id: &str) -> Option<WorkflowDefinition> {
        self.inner.document(id)
    }
}

#[async_trait]
impl WorkflowStore for CountingStore {
    fn name(&self) -> &'static str {
        "counting-memory"
    }

    async fn connect(&self, settings: &StoreSettings) -> Result<(), StoreError> {
        self.inner.connect(settings).await
    }

    async fn query(&self, query: &StoreQuery) -> Result<Vec<WorkflowDefinition>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(query).await
    }

    async fn insert(&self, workflow: &WorkflowDefinition) -> Result<(), StoreError> {
        self.inner.insert(workflow).await
    }

    async fn replace(&self, workflow: &WorkflowDefinition) -> Result<(), StoreError> {
        self.inner.replace(workflow).await
    }

    async fn upsert(&self, workflow: &WorkflowDefinition) -> Result<(), StoreError> {
        self.inner.upsert(workflow).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentCall {
    pub agent_name: String,
    pub tokens: u64,
    pub success: bool,
}

/// Telemetry sink that keeps every call
#[derive(Default)]
pub struct RecordingTelemetry {
    calls: Mutex<Vec<AgentCall>>,
}

impl RecordingTelemetry {
    pub fn calls(&self) -> Vec<AgentCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Telemetry for RecordingTelemetry {
    fn track_agent_call(&self, agent_name: &str, _duration_ms: f64, tokens: u64, success: bool) {
        self.calls.lock().unwrap().push(AgentCall {
            agent_name: agent_name.to_string(),
            tokens,
            success,
        });
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
