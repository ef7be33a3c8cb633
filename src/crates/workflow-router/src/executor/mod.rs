//! Single-turn workflow execution
//!
//! A turn opens a thread, posts the prompt, polls the run until it is
//! terminal, reads the newest assistant message and deletes the thread.
//! Thread deletion and telemetry happen on every path before anything is
//! yielded to the caller.
//!
//! "Streaming" is synthetic: the full reply exists before the first chunk and
//! is re-emitted word by word.

mod polling;
pub mod prompt;

pub(crate) use polling::{latest_assistant_text, wait_for_run, PollOutcome};
pub use prompt::{build_classification_prompt, build_turn_prompt, render_context};

use crate::config::ExecutorSettings;
use crate::lifecycle::AgentLifecycleManager;
use crate::telemetry::Telemetry;
use crate::workflow::WorkflowDefinition;
use crate::{Result, RouterError};
use agent_client::{AgentRuntime, MessageRole, RunStatus};
use async_stream::stream;
use futures::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Flat key-value context merged into prompts, rendered in key order
pub type RequestContext = BTreeMap<String, String>;

/// Lazy, finite sequence of response text fragments
pub type ResponseStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// How a response is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Word by word
    #[default]
    Stream,
    /// One chunk with the whole text
    Single,
}

/// Stream of exactly one chunk
pub fn single_chunk(text: impl Into<String>) -> ResponseStream {
    Box::pin(futures::stream::once(futures::future::ready(text.into())))
}

/// Drain a response stream into one string
pub async fn collect_response(stream: ResponseStream) -> String {
    stream.collect::<Vec<_>>().await.concat()
}

/// How a turn ended
#[derive(Debug)]
enum Reply {
    Completed { text: String, tokens: u64 },
    Failed { status: RunStatus, tokens: u64 },
    TimedOut { after: Duration },
}

/// Result of one turn after cleanup
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub text: String,
    pub tokens: u64,
    pub success: bool,
}

/// Runs conversation turns against workflow agents
#[derive(Clone)]
pub struct WorkflowExecutor {
    runtime: Arc<dyn AgentRuntime>,
    lifecycle: Arc<AgentLifecycleManager>,
    telemetry: Option<Arc<dyn Telemetry>>,
    settings: ExecutorSettings,
}

impl WorkflowExecutor {
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        lifecycle: Arc<AgentLifecycleManager>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            runtime,
            lifecycle,
            telemetry: None,
            settings,
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Execute one turn of `workflow`. Nothing happens until the stream is
    /// polled. Failures surface as a single `Error: ...` chunk.
    pub fn execute(
        &self,
        workflow: WorkflowDefinition,
        input: impl Into<String>,
        context: Option<RequestContext>,
        mode: ResponseMode,
    ) -> ResponseStream {
        let this = self.clone();
        let input = input.into();

        Box::pin(stream! {
            let prompt = build_turn_prompt(&input, context.as_ref());
            let outcome = this.run_turn(&workflow, &prompt).await;

            if mode == ResponseMode::Stream && outcome.success {
                let delay = this.settings.stream_delay();
                for (i, word) in outcome.text.split_whitespace().enumerate() {
                    if i == 0 {
                        yield word.to_string();
                    } else {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        yield format!(" {}", word);
                    }
                }
            } else {
                yield outcome.text;
            }
        })
    }

    /// Run a turn to completion, including thread cleanup and telemetry
    pub async fn run_turn(&self, workflow: &WorkflowDefinition, prompt: &str) -> TurnOutcome {
        let started = Instant::now();
        info!(workflow_id = %workflow.id, "Executing workflow");

        let outcome = match self.converse(workflow, prompt).await {
            Ok(Reply::Completed { text, tokens }) => TurnOutcome {
                text,
                tokens,
                success: true,
            },
            Ok(Reply::Failed { status, tokens }) => {
                warn!(workflow_id = %workflow.id, %status, "Workflow run did not complete");
                TurnOutcome {
                    text: format!("Error: Workflow execution failed with status {}", status),
                    tokens,
                    success: false,
                }
            }
            Ok(Reply::TimedOut { after }) => {
                warn!(workflow_id = %workflow.id, "Workflow run timed out");
                TurnOutcome {
                    text: format!(
                        "Error: Workflow execution timed out after {}s",
                        after.as_secs()
                    ),
                    tokens: 0,
                    success: false,
                }
            }
            Err(e) => {
                warn!(workflow_id = %workflow.id, error = %e, "Workflow execution error");
                TurnOutcome {
                    text: format!("Error: Error executing workflow {}: {}", workflow.id, e),
                    tokens: 0,
                    success: false,
                }
            }
        };

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Some(telemetry) = &self.telemetry {
            telemetry.track_agent_call(&workflow.id, duration_ms, outcome.tokens, outcome.success);
        }
        debug!(
            workflow_id = %workflow.id,
            duration_ms,
            tokens = outcome.tokens,
            success = outcome.success,
            "Workflow turn finished"
        );

        outcome
    }

    async fn converse(&self, workflow: &WorkflowDefinition, prompt: &str) -> Result<Reply> {
        let agent = self.lifecycle.agent_for(workflow).await?;
        let thread = self.runtime.create_thread().await?;

        let reply = self.drive(&thread.id, &agent.agent_id, prompt).await;

        if let Err(e) = self.runtime.delete_thread(&thread.id).await {
            warn!(thread_id = %thread.id, error = %e, "Failed to delete thread");
        }
        reply
    }

    async fn drive(&self, thread_id: &str, agent_id: &str, prompt: &str) -> Result<Reply> {
        self.runtime
            .create_message(thread_id, MessageRole::User, prompt)
            .await?;
        let run = self.runtime.create_run(thread_id, agent_id).await?;

        let timeout = self.settings.run_timeout();
        let run = match wait_for_run(
            self.runtime.as_ref(),
            thread_id,
            run,
            self.settings.poll_interval(),
            timeout,
        )
        .await?
        {
            PollOutcome::Finished(run) => run,
            PollOutcome::TimedOut(_) => {
                return Ok(Reply::TimedOut {
                    after: timeout.unwrap_or_default(),
                })
            }
        };

        let tokens = run.total_tokens();
        if run.status != RunStatus::Completed {
            return Ok(Reply::Failed {
                status: run.status,
                tokens,
            });
        }

        let messages = self.runtime.list_messages(thread_id).await?;
        let text = latest_assistant_text(&messages)
            .ok_or_else(|| RouterError::General("no response text".to_string()))?;

        Ok(Reply::Completed { text, tokens })
    }
}
