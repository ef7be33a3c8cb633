//! Agent call telemetry

use tracing::info;

/// Sink for per-call usage records. Implementations must not block or panic;
/// callers ignore whatever happens inside.
pub trait Telemetry: Send + Sync {
    fn track_agent_call(&self, agent_name: &str, duration_ms: f64, tokens: u64, success: bool);
}

/// Emits one structured `tracing` event per agent call
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn track_agent_call(&self, agent_name: &str, duration_ms: f64, tokens: u64, success: bool) {
        info!(
            target: "workflow_router::telemetry",
            agent_name,
            duration_ms,
            tokens,
            success,
            "agent call"
        );
    }
}
