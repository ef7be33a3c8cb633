//! Document store seam for workflow definitions
//!
//! Drivers only need point/filter queries and whole-document writes; caching
//! and soft-delete semantics live in [`crate::registry`].

mod memory;
mod sqlite;

pub use memory::MemoryWorkflowStore;
pub use sqlite::SqliteWorkflowStore;

use crate::config::StoreSettings;
use crate::workflow::WorkflowDefinition;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by store drivers
#[derive(Debug, Error)]
pub enum StoreError {
    /// `connect` has not been called or failed
    #[error("Store not connected")]
    NotConnected,

    /// Insert of an id that already exists
    #[error("Workflow already exists: {0}")]
    Conflict(String),

    /// Replace of an id that does not exist
    #[error("Workflow not found in store: {0}")]
    NotFound(String),

    /// Driver-level failure
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A workflow document store
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Driver name for logs
    fn name(&self) -> &'static str;

    /// Whether `connect` needs `StoreSettings::key`
    fn requires_key(&self) -> bool {
        false
    }

    /// Open the database/container named in `settings`. Called once.
    async fn connect(&self, settings: &StoreSettings) -> Result<(), StoreError>;

    /// Documents matching every condition of `query`
    async fn query(&self, query: &StoreQuery) -> Result<Vec<WorkflowDefinition>, StoreError>;

    /// Create a document; `Conflict` if the id exists
    async fn insert(&self, workflow: &WorkflowDefinition) -> Result<(), StoreError>;

    /// Full-item replace; `NotFound` if the id does not exist
    async fn replace(&self, workflow: &WorkflowDefinition) -> Result<(), StoreError>;

    /// Create or replace
    async fn upsert(&self, workflow: &WorkflowDefinition) -> Result<(), StoreError>;

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Field a keyword search looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    Id,
    Name,
    Description,
    Category,
    Tags,
}

impl SearchField {
    /// Fields searched when the caller names none
    pub const DEFAULT: [SearchField; 3] =
        [SearchField::Description, SearchField::Name, SearchField::Tags];

    /// Parse a document path such as `description` or `metadata.tags`
    pub fn parse(path: &str) -> Option<Self> {
        match path.trim() {
            "id" => Some(SearchField::Id),
            "name" => Some(SearchField::Name),
            "description" => Some(SearchField::Description),
            "category" => Some(SearchField::Category),
            "tags" | "metadata.tags" => Some(SearchField::Tags),
            _ => None,
        }
    }

    fn contains(&self, workflow: &WorkflowDefinition, needle: &str) -> bool {
        let hit = |text: &str| text.to_lowercase().contains(needle);
        match self {
            SearchField::Id => hit(&workflow.id),
            SearchField::Name => hit(&workflow.name),
            SearchField::Description => hit(&workflow.description),
            SearchField::Category => hit(&workflow.category),
            SearchField::Tags => workflow.metadata.tags.iter().any(|tag| hit(tag)),
        }
    }
}

/// Filter over workflow documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreQuery {
    pub id: Option<String>,
    pub category: Option<String>,
    pub enabled_only: bool,
    /// Every keyword must match at least one of `fields` (case-insensitive)
    pub keywords: Vec<String>,
    pub fields: Vec<SearchField>,
}

impl StoreQuery {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn enabled() -> Self {
        Self {
            enabled_only: true,
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I, fields: &[SearchField]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self.fields = fields.to_vec();
        self
    }

    /// Evaluate the query against one document
    pub fn matches(&self, workflow: &WorkflowDefinition) -> bool {
        if let Some(id) = &self.id {
            if &workflow.id != id {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &workflow.category != category {
                return false;
            }
        }
        if self.enabled_only && !workflow.is_enabled() {
            return false;
        }

        let fields: &[SearchField] = if self.fields.is_empty() {
            &SearchField::DEFAULT
        } else {
            &self.fields
        };

        self.keywords.iter().all(|keyword| {
            let needle = keyword.to_lowercase();
            fields.iter().any(|field| field.contains(workflow, &needle))
        })
    }
}
