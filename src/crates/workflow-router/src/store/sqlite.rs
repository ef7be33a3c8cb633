use super::{StoreError, StoreQuery, WorkflowStore};
use crate::config::StoreSettings;
use crate::workflow::WorkflowDefinition;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// SQLite-backed store: one JSON document per row in a table named after the
/// configured container. `id`, `category` and `enabled` are mirrored into
/// columns for filtering; keyword matching runs over the decoded documents.
#[derive(Debug, Default)]
pub struct SqliteWorkflowStore {
    connection: OnceCell<Connection>,
}

#[derive(Debug)]
struct Connection {
    pool: SqlitePool,
    table: String,
}

impl SqliteWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn connection(&self) -> Result<&Connection, StoreError> {
        self.connection.get().ok_or(StoreError::NotConnected)
    }

    async fn open(settings: &StoreSettings) -> Result<Connection, StoreError> {
        let url = settings.endpoint.as_deref().unwrap_or_default();
        let table = table_name(&settings.container)?;

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Backend(format!("Invalid database URL {}: {}", url, e)))?
            .create_if_missing(true);

        let pool = pool_options(url)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to open {}: {}", url, e)))?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                category TEXT NOT NULL DEFAULT '',
                enabled INTEGER NOT NULL DEFAULT 1,
                document TEXT NOT NULL,
                updated_at TEXT
            )"
        ))
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Backend(format!("Failed to create table {}: {}", table, e)))?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_category ON {table}(category)"
        ))
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Backend(format!("Failed to create index on {}: {}", table, e)))?;

        info!(database = %settings.database, table = %table, "Connected SQLite workflow store");
        Ok(Connection { pool, table })
    }
}

/// An in-memory database lives only as long as its single connection, so
/// that connection is never reaped.
fn pool_options(url: &str) -> SqlitePoolOptions {
    if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    }
}

/// Container names become table names, so only identifier characters pass
fn table_name(container: &str) -> Result<String, StoreError> {
    let valid = !container.is_empty()
        && container.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !container.starts_with(|c: char| c.is_ascii_digit());

    if valid {
        Ok(container.to_string())
    } else {
        Err(StoreError::Backend(format!(
            "Container name '{}' is not a valid table name",
            container
        )))
    }
}

fn row_values(workflow: &WorkflowDefinition) -> Result<(String, Option<String>), StoreError> {
    let document = serde_json::to_string(workflow)?;
    let updated_at = workflow.metadata.updated_at.map(|t| t.to_rfc3339());
    Ok((document, updated_at))
}

#[async_trait]
impl WorkflowStore for SqliteWorkflowStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn connect(&self, settings: &StoreSettings) -> Result<(), StoreError> {
        self.connection
            .get_or_try_init(|| Self::open(settings))
            .await?;
        Ok(())
    }

    async fn query(&self, query: &StoreQuery) -> Result<Vec<WorkflowDefinition>, StoreError> {
        let conn = self.connection()?;

        let mut sql = format!("SELECT document FROM {} WHERE 1 = 1", conn.table);
        if query.id.is_some() {
            sql.push_str(" AND id = ?");
        }
        if query.category.is_some() {
            sql.push_str(" AND category = ?");
        }
        if query.enabled_only {
            sql.push_str(" AND enabled = 1");
        }
        sql.push_str(" ORDER BY id");

        let mut statement = sqlx::query(&sql);
        if let Some(id) = &query.id {
            statement = statement.bind(id);
        }
        if let Some(category) = &query.category {
            statement = statement.bind(category);
        }

        let rows = statement
            .fetch_all(&conn.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to query workflows: {}", e)))?;

        let mut workflows = Vec::with_capacity(rows.len());
        for row in rows {
            let document: String = row
                .try_get("document")
                .map_err(|e| StoreError::Backend(format!("Failed to read document: {}", e)))?;
            let workflow: WorkflowDefinition = serde_json::from_str(&document)?;
            if query.matches(&workflow) {
                workflows.push(workflow);
            }
        }

        debug!(count = workflows.len(), "Queried SQLite workflow store");
        Ok(workflows)
    }

    async fn insert(&self, workflow: &WorkflowDefinition) -> Result<(), StoreError> {
        let conn = self.connection()?;
        let (document, updated_at) = row_values(workflow)?;

        sqlx::query(&format!(
            "INSERT INTO {} (id, category, enabled, document, updated_at) VALUES (?, ?, ?, ?, ?)",
            conn.table
        ))
        .bind(&workflow.id)
        .bind(&workflow.category)
        .bind(workflow.is_enabled())
        .bind(document)
        .bind(updated_at)
        .execute(&conn.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false);
            if duplicate {
                StoreError::Conflict(workflow.id.clone())
            } else {
                StoreError::Backend(format!("Failed to insert workflow: {}", e))
            }
        })?;

        Ok(())
    }

    async fn replace(&self, workflow: &WorkflowDefinition) -> Result<(), StoreError> {
        let conn = self.connection()?;
        let (document, updated_at) = row_values(workflow)?;

        let result = sqlx::query(&format!(
            "UPDATE {} SET category = ?, enabled = ?, document = ?, updated_at = ? WHERE id = ?",
            conn.table
        ))
        .bind(&workflow.category)
        .bind(workflow.is_enabled())
        .bind(document)
        .bind(updated_at)
        .bind(&workflow.id)
        .execute(&conn.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("Failed to replace workflow: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(workflow.id.clone()));
        }
        Ok(())
    }

    async fn upsert(&self, workflow: &WorkflowDefinition) -> Result<(), StoreError> {
        let conn = self.connection()?;
        let (document, updated_at) = row_values(workflow)?;

        sqlx::query(&format!(
            "INSERT INTO {} (id, category, enabled, document, updated_at) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                category = excluded.category,
                enabled = excluded.enabled,
                document = excluded.document,
                updated_at = excluded.updated_at",
            conn.table
        ))
        .bind(&workflow.id)
        .bind(&workflow.category)
        .bind(workflow.is_enabled())
        .bind(document)
        .bind(updated_at)
        .execute(&conn.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("Failed to upsert workflow: {}", e)))?;

        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        if let Some(conn) = self.connection.get() {
            conn.pool.close().await;
        }
        Ok(())
    }
}
