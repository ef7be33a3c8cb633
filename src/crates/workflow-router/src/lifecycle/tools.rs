use crate::workflow::{AgentConfig, ToolSpec};
use crate::{Result, RouterError};
use agent_client::{AgentDefinition, FunctionDefinition, ToolDescriptor};
use std::str::FromStr;

/// Tool tags a workflow document may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    BingGrounding,
    CodeInterpreter,
    Function,
}

impl FromStr for ToolKind {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bing_grounding" => Ok(ToolKind::BingGrounding),
            "code_interpreter" => Ok(ToolKind::CodeInterpreter),
            "function" => Ok(ToolKind::Function),
            other => Err(RouterError::InvalidDefinition(format!(
                "unknown tool type '{}'",
                other
            ))),
        }
    }
}

/// Map one document tool entry to a runtime descriptor
pub fn build_tool(spec: &ToolSpec) -> Result<ToolDescriptor> {
    match spec.kind.parse::<ToolKind>()? {
        ToolKind::BingGrounding => Ok(ToolDescriptor::BingGrounding),
        ToolKind::CodeInterpreter => Ok(ToolDescriptor::CodeInterpreter),
        ToolKind::Function => {
            let raw = spec.function.clone().ok_or_else(|| {
                RouterError::InvalidDefinition("function tool without 'function' object".to_string())
            })?;
            let function: FunctionDefinition = serde_json::from_value(raw).map_err(|e| {
                RouterError::InvalidDefinition(format!("malformed function tool: {}", e))
            })?;
            Ok(ToolDescriptor::Function { function })
        }
    }
}

pub fn build_tools(specs: &[ToolSpec]) -> Result<Vec<ToolDescriptor>> {
    specs.iter().map(build_tool).collect()
}

/// Runtime definition for a workflow's agent config
pub fn build_agent_definition(config: &AgentConfig) -> Result<AgentDefinition> {
    Ok(AgentDefinition {
        model: config.model.clone(),
        instructions: config.instructions.clone(),
        tools: build_tools(&config.tools)?,
        temperature: config.temperature,
        top_p: config.top_p,
    })
}
