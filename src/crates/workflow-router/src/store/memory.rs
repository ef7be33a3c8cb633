use super::{StoreError, StoreQuery, WorkflowStore};
use crate::config::StoreSettings;
use crate::workflow::WorkflowDefinition;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Process-local store, ordered by id
#[derive(Debug, Default)]
pub struct MemoryWorkflowStore {
    documents: RwLock<BTreeMap<String, WorkflowDefinition>>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with documents
    pub fn with_workflows(workflows: impl IntoIterator<Item = WorkflowDefinition>) -> Self {
        let documents = workflows
            .into_iter()
            .map(|wf| (wf.id.clone(), wf))
            .collect();
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Raw document, bypassing every filter
    pub fn document(&self, id: &str) -> Option<WorkflowDefinition> {
        self.documents.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self, _settings: &StoreSettings) -> Result<(), StoreError> {
        Ok(())
    }

    async fn query(&self, query: &StoreQuery) -> Result<Vec<WorkflowDefinition>, StoreError> {
        let documents = self.documents.read();
        let results = match &query.id {
            Some(id) => documents
                .get(id)
                .filter(|wf| query.matches(wf))
                .cloned()
                .into_iter()
                .collect(),
            None => documents
                .values()
                .filter(|wf| query.matches(wf))
                .cloned()
                .collect(),
        };
        Ok(results)
    }

    async fn insert(&self, workflow: &WorkflowDefinition) -> Result<(), StoreError> {
        let mut documents = self.documents.write();
        if documents.contains_key(&workflow.id) {
            return Err(StoreError::Conflict(workflow.id.clone()));
        }
        documents.insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }

    async fn replace(&self, workflow: &WorkflowDefinition) -> Result<(), StoreError> {
        let mut documents = self.documents.write();
        match documents.get_mut(&workflow.id) {
            Some(existing) => {
                *existing = workflow.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(workflow.id.clone())),
        }
    }

    async fn upsert(&self, workflow: &WorkflowDefinition) -> Result<(), StoreError> {
        self.documents
            .write()
            .insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }
}
