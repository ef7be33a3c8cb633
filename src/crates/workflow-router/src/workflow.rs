//! Workflow definition documents
//!
//! A workflow is one JSON document in the store. `id` is the lookup key and
//! `metadata.enabled` decides whether the workflow is routable; disabled
//! documents stay in the store (soft delete).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Model used when a document does not name one
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// A routable workflow as stored in the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique lookup key
    pub id: String,

    /// Display name, also the basis of the remote agent name
    #[serde(default)]
    pub name: String,

    /// One-line description shown to the orchestrator
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub agent_config: AgentConfig,

    #[serde(default)]
    pub metadata: WorkflowMetadata,

    /// Fields this crate does not interpret (partition keys, store system
    /// properties); carried through full-item replaces untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: String::new(),
            agent_config: AgentConfig::default(),
            metadata: WorkflowMetadata::default(),
            extra: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.agent_config.instructions = instructions.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.agent_config.model = model.into();
        self
    }

    pub fn with_tool(mut self, tool: ToolSpec) -> Self {
        self.agent_config.tools.push(tool);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.metadata.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.metadata.enabled
    }

    /// Name to derive the agent name from; the id when no name is set
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Apply a partial update and refresh `updated_at`
    pub fn apply(&mut self, patch: WorkflowPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(agent_config) = patch.agent_config {
            self.agent_config = agent_config;
        }
        if let Some(model) = patch.model {
            self.agent_config.model = model;
        }
        if let Some(enabled) = patch.enabled {
            self.metadata.enabled = enabled;
        }
        if let Some(tags) = patch.tags {
            self.metadata.tags = tags;
        }
        self.metadata.updated_at = Some(Utc::now());
    }
}

/// How the remote agent for a workflow is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub instructions: String,

    #[serde(default)]
    pub tools: Vec<ToolSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            instructions: String::new(),
            tools: Vec::new(),
            temperature: None,
            top_p: None,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Tool entry as written in the document.
///
/// The tag is validated when the agent is built, see
/// [`crate::lifecycle::build_tools`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<Value>,
}

impl ToolSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            function: None,
        }
    }

    pub fn function(function: Value) -> Self {
        Self {
            kind: "function".to_string(),
            function: Some(function),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for WorkflowMetadata {
    fn default() -> Self {
        Self {
            enabled: true,
            created_at: None,
            updated_at: None,
            tags: Vec::new(),
            extra: Map::new(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Partial update of a workflow; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub agent_config: Option<AgentConfig>,
    /// Replace only the model of the agent config
    pub model: Option<String>,
    pub enabled: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl WorkflowPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn agent_config(mut self, agent_config: AgentConfig) -> Self {
        self.agent_config = Some(agent_config);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }
}
