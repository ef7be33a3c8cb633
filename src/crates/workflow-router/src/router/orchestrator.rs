//! The orchestrator meta-agent that classifies requests

use crate::workflow::{AgentConfig, WorkflowDefinition};
use crate::{Result, RouterError};

/// Reserved workflow id of the orchestrator agent
pub const ORCHESTRATOR_ID: &str = "__orchestrator__";

/// Agent name reported to telemetry for classification calls
pub const ORCHESTRATOR_AGENT_NAME: &str = "orchestrator";

/// Answer meaning "no workflow fits"
pub const NO_MATCH: &str = "no_match";

/// Low temperature keeps routing deterministic
pub const ORCHESTRATOR_TEMPERATURE: f32 = 0.3;

const ORCHESTRATOR_PROMPT: &str = r#"You are an intelligent workflow router. Your job is to analyze user input and determine which workflow should handle the request.

Available workflows:
{catalog}

Instructions:
1. Carefully analyze the user's input to understand their intent
2. Match the intent to the most appropriate workflow
3. Return ONLY the workflow ID (e.g., "customer_support_workflow")
4. If no workflow matches, return "no_match"
5. Be concise - return only the workflow ID

Examples:
User: "I need help with my order"
You: customer_support_workflow

User: "How do I integrate the API?"
You: technical_support_workflow

User: "I want to buy your product"
You: sales_inquiry_workflow
"#;

/// One `- id: description` line per enabled workflow
pub fn build_catalog(workflows: &[WorkflowDefinition]) -> String {
    workflows
        .iter()
        .filter(|wf| wf.is_enabled())
        .map(|wf| {
            let description = if wf.description.trim().is_empty() {
                "No description"
            } else {
                wf.description.trim()
            };
            format!("- {}: {}", wf.id, description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn orchestrator_instructions(workflows: &[WorkflowDefinition]) -> String {
    ORCHESTRATOR_PROMPT.replace("{catalog}", &build_catalog(workflows))
}

/// Agent config of the orchestrator for the current catalog
pub fn orchestrator_config(model: &str, workflows: &[WorkflowDefinition]) -> AgentConfig {
    AgentConfig {
        model: model.to_string(),
        instructions: orchestrator_instructions(workflows),
        tools: Vec::new(),
        temperature: Some(ORCHESTRATOR_TEMPERATURE),
        top_p: None,
    }
}

/// Reduce the orchestrator's answer to a bare workflow id
pub fn parse_classification(response: &str) -> Result<String> {
    let first_line = response
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");

    let workflow_id = first_line
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c.is_whitespace())
        .trim_end_matches('.')
        .trim();

    if workflow_id.is_empty() {
        return Err(RouterError::ClassificationFailed(
            "orchestrator returned an empty answer".to_string(),
        ));
    }

    Ok(workflow_id.to_string())
}
