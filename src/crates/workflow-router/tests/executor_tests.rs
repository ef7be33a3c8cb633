mod common;

use agent_client::RunStatus;
use common::{shared, workflow, MockRuntime, RecordingTelemetry};
use futures::StreamExt;
use std::sync::Arc;
use workflow_router::{
    collect_response, AgentLifecycleManager, ExecutorSettings, RequestContext, ResponseMode,
    WorkflowDefinition, WorkflowExecutor,
};

const AGENT: &str = "returns-workflow";

struct Harness {
    runtime: Arc<MockRuntime>,
    telemetry: Arc<RecordingTelemetry>,
    executor: WorkflowExecutor,
}

fn harness(runtime: MockRuntime, settings: ExecutorSettings) -> Harness {
    let runtime = shared(runtime);
    let telemetry = shared(RecordingTelemetry::default());
    let lifecycle = Arc::new(AgentLifecycleManager::new(runtime.clone()));
    let executor = WorkflowExecutor::new(runtime.clone(), lifecycle, settings)
        .with_telemetry(telemetry.clone());
    Harness {
        runtime,
        telemetry,
        executor,
    }
}

fn returns() -> WorkflowDefinition {
    workflow("returns_workflow", "Handles returns")
}

#[tokio::test(start_paused = true)]
async fn test_completed_run_streams_words() {
    let h = harness(
        MockRuntime::new().reply(AGENT, "Your refund is on its way."),
        ExecutorSettings::default(),
    );

    let chunks: Vec<String> = h
        .executor
        .execute(returns(), "Where is my refund?", None, ResponseMode::Stream)
        .collect()
        .await;

    assert_eq!(chunks, vec!["Your", " refund", " is", " on", " its", " way."]);
    assert_eq!(h.runtime.threads_created(), 1);
    assert_eq!(h.runtime.threads_deleted(), 1);

    let calls = h.telemetry.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].agent_name, "returns_workflow");
    assert_eq!(calls[0].tokens, 42);
    assert!(calls[0].success);
}

#[tokio::test(start_paused = true)]
async fn test_single_mode_yields_one_chunk() {
    let h = harness(
        MockRuntime::new().reply(AGENT, "Your refund is on its way."),
        ExecutorSettings::default(),
    );

    let chunks: Vec<String> = h
        .executor
        .execute(returns(), "Where is my refund?", None, ResponseMode::Single)
        .collect()
        .await;

    assert_eq!(chunks, vec!["Your refund is on its way."]);
}

#[tokio::test(start_paused = true)]
async fn test_nothing_runs_until_stream_is_polled() {
    let h = harness(MockRuntime::new(), ExecutorSettings::default());

    let stream = h
        .executor
        .execute(returns(), "hello", None, ResponseMode::Stream);
    assert_eq!(h.runtime.threads_created(), 0);
    assert_eq!(h.runtime.create_agent_calls(), 0);

    collect_response(stream).await;
    assert_eq!(h.runtime.threads_created(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_run_yields_error_chunk_and_cleans_up() {
    let h = harness(
        MockRuntime::new().finish_with(AGENT, RunStatus::Failed),
        ExecutorSettings::default(),
    );

    let chunks: Vec<String> = h
        .executor
        .execute(returns(), "Where is my refund?", None, ResponseMode::Stream)
        .collect()
        .await;

    assert_eq!(
        chunks,
        vec!["Error: Workflow execution failed with status failed"]
    );
    assert_eq!(h.runtime.threads_deleted(), 1);

    let calls = h.telemetry.calls();
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].success);
}

#[tokio::test(start_paused = true)]
async fn test_blank_reply_is_a_failure_in_both_modes() {
    for mode in [ResponseMode::Stream, ResponseMode::Single] {
        let h = harness(
            MockRuntime::new().reply(AGENT, "   "),
            ExecutorSettings::default(),
        );

        let chunks: Vec<String> = h
            .executor
            .execute(returns(), "Where is my refund?", None, mode)
            .collect()
            .await;

        assert_eq!(chunks.len(), 1, "mode {:?}", mode);
        assert!(chunks[0].starts_with("Error: Error executing workflow returns_workflow:"));
        assert!(chunks[0].contains("no response text"));
        assert_eq!(h.runtime.threads_deleted(), 1);
        assert!(!h.telemetry.calls()[0].success);
    }
}

#[tokio::test(start_paused = true)]
async fn test_stuck_run_times_out() {
    let settings = ExecutorSettings {
        run_timeout_secs: Some(5),
        ..ExecutorSettings::default()
    };
    let h = harness(MockRuntime::new().never_finish(), settings);

    let text = collect_response(h.executor.execute(
        returns(),
        "Where is my refund?",
        None,
        ResponseMode::Stream,
    ))
    .await;

    assert_eq!(text, "Error: Workflow execution timed out after 5s");
    assert_eq!(h.runtime.threads_deleted(), 1);
    assert!(!h.telemetry.calls()[0].success);
}

#[tokio::test(start_paused = true)]
async fn test_runtime_error_becomes_error_chunk() {
    let h = harness(
        MockRuntime::new().failing_thread_creation(),
        ExecutorSettings::default(),
    );

    let text = collect_response(h.executor.execute(
        returns(),
        "Where is my refund?",
        None,
        ResponseMode::Stream,
    ))
    .await;

    assert!(
        text.starts_with("Error: Error executing workflow returns_workflow:"),
        "unexpected text: {}",
        text
    );
    assert_eq!(h.runtime.threads_deleted(), 0);
    assert_eq!(h.telemetry.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_thread_delete_failure_does_not_hide_reply() {
    let h = harness(
        MockRuntime::new()
            .reply(AGENT, "Done.")
            .failing_thread_deletes(),
        ExecutorSettings::default(),
    );

    let text = collect_response(h.executor.execute(returns(), "hi", None, ResponseMode::Single)).await;

    assert_eq!(text, "Done.");
    assert_eq!(h.runtime.threads_deleted(), 1);
    assert!(h.telemetry.calls()[0].success);
}

#[tokio::test(start_paused = true)]
async fn test_context_is_appended_to_prompt() {
    let h = harness(MockRuntime::new(), ExecutorSettings::default());
    let context: RequestContext = [
        ("order_id".to_string(), "A-1001".to_string()),
        ("customer_tier".to_string(), "gold".to_string()),
    ]
    .into_iter()
    .collect();

    collect_response(h.executor.execute(
        returns(),
        "Where is my refund?",
        Some(context),
        ResponseMode::Single,
    ))
    .await;

    assert_eq!(
        h.runtime.sent_messages(),
        vec!["Where is my refund?\n\nAdditional Context:\ncustomer_tier: gold\norder_id: A-1001"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_usage_reports_zero_tokens() {
    let h = harness(MockRuntime::new().without_usage(), ExecutorSettings::default());

    let outcome = h.executor.run_turn(&returns(), "hello").await;

    assert!(outcome.success);
    assert_eq!(outcome.tokens, 0);
    assert_eq!(h.telemetry.calls()[0].tokens, 0);
}

#[tokio::test(start_paused = true)]
async fn test_turns_reuse_the_workflow_agent() {
    let h = harness(MockRuntime::new(), ExecutorSettings::default());

    for _ in 0..3 {
        h.executor.run_turn(&returns(), "hello").await;
    }

    assert_eq!(h.runtime.create_agent_calls(), 1);
    assert_eq!(h.runtime.threads_created(), 3);
    assert_eq!(h.runtime.threads_deleted(), 3);
}
