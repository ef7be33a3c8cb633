use agent_client::{AgentRuntime, MessageRole, Run, ThreadMessage};
use std::time::Duration;
use tokio::time::Instant;

/// Where polling a run ended up
#[derive(Debug)]
pub(crate) enum PollOutcome {
    /// The run reached a terminal status
    Finished(Run),
    /// Still pending when the deadline passed
    TimedOut(Run),
}

/// Poll a run at a fixed interval until it is terminal or `timeout` has
/// elapsed. The deadline is checked after each sleep, before the next status
/// request.
pub(crate) async fn wait_for_run(
    runtime: &dyn AgentRuntime,
    thread_id: &str,
    mut run: Run,
    interval: Duration,
    timeout: Option<Duration>,
) -> agent_client::Result<PollOutcome> {
    let started = Instant::now();

    while !run.status.is_terminal() {
        tokio::time::sleep(interval).await;

        if let Some(limit) = timeout {
            if started.elapsed() > limit {
                return Ok(PollOutcome::TimedOut(run));
            }
        }

        run = runtime.get_run(thread_id, &run.id).await?;
    }

    Ok(PollOutcome::Finished(run))
}

/// Text of the newest assistant message (messages arrive newest first).
/// Blank text counts as no reply.
pub(crate) fn latest_assistant_text(messages: &[ThreadMessage]) -> Option<String> {
    messages
        .iter()
        .filter(|m| m.role == MessageRole::Assistant)
        .find_map(|m| m.text())
        .filter(|text| !text.trim().is_empty())
}
