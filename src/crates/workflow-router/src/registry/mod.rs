//! Workflow registry with read-through caching
//!
//! Two independent caches sit in front of the store: a per-id map answering
//! "does workflow X exist", and a single catalog entry holding every enabled
//! workflow (used for the orchestrator prompt and unfiltered listings). Any
//! successful write drops both.

mod cache;

use crate::config::StoreSettings;
use crate::store::{SearchField, StoreQuery, WorkflowStore};
use crate::workflow::{WorkflowDefinition, WorkflowPatch};
use crate::{Result, RouterError};
use cache::CacheEntry;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Snapshot of cache state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub workflow_cache_size: usize,
    pub list_cache_valid: bool,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
}

/// Cached access to workflow definitions in a [`WorkflowStore`]
pub struct WorkflowRegistry {
    store: Arc<dyn WorkflowStore>,
    settings: StoreSettings,
    connected: OnceCell<()>,
    by_id: RwLock<HashMap<String, CacheEntry<WorkflowDefinition>>>,
    catalog: RwLock<Option<CacheEntry<Vec<WorkflowDefinition>>>>,
}

impl WorkflowRegistry {
    pub fn new(store: Arc<dyn WorkflowStore>, settings: StoreSettings) -> Self {
        Self {
            store,
            settings,
            connected: OnceCell::new(),
            by_id: RwLock::new(HashMap::new()),
            catalog: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Validate connection parameters and connect the store. Idempotent.
    pub async fn initialize(&self) -> Result<()> {
        if self.connected.initialized() {
            return Ok(());
        }

        let endpoint_missing = self
            .settings
            .endpoint
            .as_deref()
            .map(|e| e.trim().is_empty())
            .unwrap_or(true);
        if endpoint_missing {
            return Err(RouterError::Configuration(
                "COSMOS_DB_ENDPOINT must be set".to_string(),
            ));
        }
        if self.store.requires_key() && self.settings.key.is_none() {
            return Err(RouterError::Configuration(
                "COSMOS_DB_KEY must be set".to_string(),
            ));
        }

        self.connected
            .get_or_try_init(|| async {
                self.store.connect(&self.settings).await?;
                info!(
                    store = self.store.name(),
                    database = %self.settings.database,
                    container = %self.settings.container,
                    "Workflow registry connected"
                );
                Ok::<(), RouterError>(())
            })
            .await?;
        Ok(())
    }

    fn ttl(&self) -> std::time::Duration {
        self.settings.cache_ttl()
    }

    fn cached(&self, workflow_id: &str) -> Option<WorkflowDefinition> {
        if !self.settings.cache_enabled {
            return None;
        }
        self.by_id
            .read()
            .get(workflow_id)
            .filter(|entry| entry.is_fresh(self.ttl()))
            .map(|entry| entry.value.clone())
    }

    /// Enabled workflow by id; `None` for unknown or disabled ids
    pub async fn get_workflow(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>> {
        self.initialize().await?;

        if let Some(workflow) = self.cached(workflow_id) {
            debug!(workflow_id, "Workflow cache hit");
            return Ok(Some(workflow));
        }

        let found = self
            .store
            .query(&StoreQuery::by_id(workflow_id))
            .await?
            .into_iter()
            .next();

        match found {
            Some(workflow) if workflow.is_enabled() => {
                if self.settings.cache_enabled {
                    self.by_id
                        .write()
                        .insert(workflow_id.to_string(), CacheEntry::new(workflow.clone()));
                }
                debug!(workflow_id, "Loaded workflow from store");
                Ok(Some(workflow))
            }
            Some(_) => {
                self.by_id.write().remove(workflow_id);
                warn!(workflow_id, "Workflow is disabled");
                Ok(None)
            }
            None => {
                self.by_id.write().remove(workflow_id);
                info!(workflow_id, "Workflow not found");
                Ok(None)
            }
        }
    }

    /// Workflows, optionally filtered by category.
    ///
    /// Only the unfiltered, enabled-only listing is served from cache.
    pub async fn list_workflows(
        &self,
        category: Option<&str>,
        enabled_only: bool,
    ) -> Result<Vec<WorkflowDefinition>> {
        self.initialize().await?;

        let cacheable = self.settings.cache_enabled && category.is_none() && enabled_only;
        if cacheable {
            if let Some(entry) = self.catalog.read().as_ref() {
                if entry.is_fresh(self.ttl()) {
                    debug!(count = entry.value.len(), "Workflow list cache hit");
                    return Ok(entry.value.clone());
                }
            }
        }

        let mut query = if enabled_only {
            StoreQuery::enabled()
        } else {
            StoreQuery::all()
        };
        if let Some(category) = category {
            query = query.with_category(category);
        }

        let workflows = self.store.query(&query).await?;
        if cacheable {
            *self.catalog.write() = Some(CacheEntry::new(workflows.clone()));
        }

        info!(count = workflows.len(), category = ?category, "Loaded workflows");
        Ok(workflows)
    }

    /// Enabled workflows in one category
    pub async fn get_workflows_by_category(&self, category: &str) -> Result<Vec<WorkflowDefinition>> {
        self.list_workflows(Some(category), true).await
    }

    /// Enabled workflows matching every keyword in name, description or tags
    pub async fn search_workflows<S: AsRef<str>>(
        &self,
        keywords: &[S],
    ) -> Result<Vec<WorkflowDefinition>> {
        self.search_workflows_in(keywords, &SearchField::DEFAULT).await
    }

    /// Keyword search over chosen fields; never cached
    pub async fn search_workflows_in<S: AsRef<str>>(
        &self,
        keywords: &[S],
        fields: &[SearchField],
    ) -> Result<Vec<WorkflowDefinition>> {
        self.initialize().await?;

        let query = StoreQuery::enabled()
            .with_keywords(keywords.iter().map(|k| k.as_ref().to_string()), fields);
        let workflows = self.store.query(&query).await?;

        info!(count = workflows.len(), "Workflow search matched");
        Ok(workflows)
    }

    /// Create a workflow, stamping its timestamps
    pub async fn add_workflow(&self, mut workflow: WorkflowDefinition) -> Result<WorkflowDefinition> {
        self.initialize().await?;

        let now = Utc::now();
        workflow.metadata.created_at = Some(now);
        workflow.metadata.updated_at = Some(now);

        self.store.insert(&workflow).await?;
        self.clear_cache();

        info!(workflow_id = %workflow.id, "Added workflow");
        Ok(workflow)
    }

    /// Apply a partial update. A fresh cache entry is used as the base;
    /// otherwise the document is read from the store regardless of its
    /// enabled flag, which is how a soft-deleted workflow is re-enabled.
    pub async fn update_workflow(
        &self,
        workflow_id: &str,
        patch: WorkflowPatch,
    ) -> Result<WorkflowDefinition> {
        self.initialize().await?;

        let mut workflow = match self.cached(workflow_id) {
            Some(workflow) => workflow,
            None => self
                .store
                .query(&StoreQuery::by_id(workflow_id))
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| RouterError::NotFound(workflow_id.to_string()))?,
        };

        workflow.apply(patch);
        self.store.replace(&workflow).await?;
        self.clear_cache();

        info!(workflow_id, "Updated workflow");
        Ok(workflow)
    }

    /// Soft delete: the document stays, flagged disabled
    pub async fn delete_workflow(&self, workflow_id: &str) -> Result<()> {
        self.update_workflow(workflow_id, WorkflowPatch::new().enabled(false))
            .await?;
        info!(workflow_id, "Disabled workflow");
        Ok(())
    }

    /// Create or replace a workflow, as used by bulk seeding
    pub async fn upsert_workflow(&self, mut workflow: WorkflowDefinition) -> Result<WorkflowDefinition> {
        self.initialize().await?;

        let now = Utc::now();
        workflow.metadata.created_at.get_or_insert(now);
        workflow.metadata.updated_at = Some(now);

        self.store.upsert(&workflow).await?;
        self.clear_cache();

        info!(workflow_id = %workflow.id, "Upserted workflow");
        Ok(workflow)
    }

    /// Point every workflow using model `from` at model `to`. Returns how
    /// many workflows changed.
    pub async fn migrate_model(&self, from: &str, to: &str) -> Result<usize> {
        self.initialize().await?;

        let mut migrated = 0;
        for mut workflow in self.store.query(&StoreQuery::all()).await? {
            if workflow.agent_config.model != from {
                continue;
            }
            workflow.apply(WorkflowPatch::new().model(to));
            self.store.replace(&workflow).await?;
            migrated += 1;
            debug!(workflow_id = %workflow.id, from, to, "Migrated workflow model");
        }

        if migrated > 0 {
            self.clear_cache();
        }
        info!(migrated, from, to, "Model migration finished");
        Ok(migrated)
    }

    /// Drop both caches
    pub fn clear_cache(&self) {
        self.by_id.write().clear();
        *self.catalog.write() = None;
        debug!("Workflow caches cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            workflow_cache_size: self.by_id.read().len(),
            list_cache_valid: self
                .catalog
                .read()
                .as_ref()
                .map(|entry| entry.is_fresh(self.ttl()))
                .unwrap_or(false),
            cache_enabled: self.settings.cache_enabled,
            cache_ttl_secs: self.settings.cache_ttl_secs,
        }
    }

    /// Close the store connection
    pub async fn close(&self) -> Result<()> {
        self.clear_cache();
        if self.connected.initialized() {
            self.store.close().await?;
            info!("Workflow registry closed");
        }
        Ok(())
    }
}
