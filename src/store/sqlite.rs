/*!
SQLite-backed definition and run stores.

## Behavior

- One [`SqliteStore`] owns a shared `SqlitePool` and implements both store
  traits; definitions and runs live in the `workflows` and `workflow_runs`
  tables (see `migrations/`).
- When the `sqlite-migrations` feature is enabled (default), embedded
  migrations (`sqlx::migrate!("./migrations")`) run on connect; disabling
  the feature assumes external migration orchestration.
- Graph and context documents are stored as JSON text columns through the
  serde glue in the persistence module.
- Run updates are optimistic: the row is read inside a transaction, the
  delta is applied, and the write carries `WHERE revision = ?`. Zero
  affected rows means another activation won the race and the caller gets
  a revision conflict instead of a lost update.

## Schema mapping

- `workflows.graph_json` ← serialized `GraphSpec`
- `workflow_runs.context_json` ← run context object
- timestamps ← RFC3339 strings (keeps `chrono` types out of the schema)
- `workflow_runs.revision` ← optimistic concurrency token
*/

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use super::persistence::{from_json_column, parse_timestamp, to_json_column};
use super::{DefinitionStore, Result, RunStore, StoreError};
use crate::graph::{GraphSpec, WorkflowDefinition};
use crate::run::{RunUpdate, WorkflowRun};
use crate::types::{RunId, RunStatus, WorkflowId};

/// Durable SQLite store for definitions and runs.
///
/// Runs are retained indefinitely for audit; plan periodic SQL maintenance
/// (`DELETE FROM workflow_runs WHERE ended_at < ...; VACUUM`) if history
/// growth becomes a concern.
pub struct SqliteStore {
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish()
    }
}

impl SqliteStore {
    /// Connect to a SQLite database at `database_url`.
    /// Example URL: `sqlite://eventweave.db`
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("connect error: {e}"),
            })?;
        #[cfg(feature = "sqlite-migrations")]
        {
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                return Err(StoreError::Backend {
                    message: format!("migration failure: {e}"),
                });
            }
        }
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Resolve the database URL from the environment and connect.
    ///
    /// Reads `EVENTWEAVE_SQLITE_URL` (after loading `.env` if present),
    /// falling back to `sqlite://eventweave.db`. The underlying file is
    /// created if it does not exist yet.
    pub async fn connect_from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let database_url = std::env::var("EVENTWEAVE_SQLITE_URL")
            .unwrap_or_else(|_| "sqlite://eventweave.db".to_string());
        // SqlitePool::connect does not create missing files. Steps:
        // 1. Strip the "sqlite://" scheme to get the filesystem path.
        // 2. Create parent directories if needed.
        // 3. Create the file, ignoring failure if it already exists.
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.trim();
            if !path.is_empty() {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                if !p.exists() {
                    let _ = std::fs::File::create(p);
                }
            }
        }
        Self::connect(&database_url).await
    }
}

fn row_to_definition(row: &SqliteRow) -> Result<WorkflowDefinition> {
    let graph_json: String = get_column(row, "graph_json")?;
    let created_at: String = get_column(row, "created_at")?;
    Ok(WorkflowDefinition {
        id: get_column(row, "id")?,
        name: get_column(row, "name")?,
        published: get_column::<i64>(row, "published")? != 0,
        graph: from_json_column(&graph_json, "graph")?,
        created_at: parse_timestamp(&created_at, "created_at")?,
    })
}

fn row_to_run(row: &SqliteRow) -> Result<WorkflowRun> {
    let status_raw: String = get_column(row, "status")?;
    let status = RunStatus::decode(&status_raw).ok_or_else(|| StoreError::Corrupt {
        message: format!("unknown run status: {status_raw}"),
    })?;
    let started_at: String = get_column(row, "started_at")?;
    let ended_at: Option<String> = get_column(row, "ended_at")?;
    let context_json: String = get_column(row, "context_json")?;
    let revision: i64 = get_column(row, "revision")?;
    Ok(WorkflowRun {
        id: get_column(row, "id")?,
        workflow_id: get_column(row, "workflow_id")?,
        status,
        started_at: parse_timestamp(&started_at, "started_at")?,
        ended_at: ended_at
            .map(|raw| parse_timestamp(&raw, "ended_at"))
            .transpose()?,
        last_node: get_column(row, "last_node")?,
        expected_event: get_column(row, "expected_event")?,
        error: get_column(row, "error")?,
        context: from_json_column(&context_json, "context")?,
        revision: revision as u32,
    })
}

fn get_column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| StoreError::Backend {
        message: format!("reading column {name}: {e}"),
    })
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend {
        message: e.to_string(),
    }
}

#[async_trait]
impl DefinitionStore for SqliteStore {
    #[instrument(skip(self, graph), err)]
    async fn create(&self, name: &str, graph: GraphSpec) -> Result<WorkflowDefinition> {
        graph.validate()?;
        let definition = WorkflowDefinition::new(name, graph);
        let graph_json = to_json_column(&definition.graph, "graph")?;
        sqlx::query(
            "INSERT INTO workflows (id, name, published, graph_json, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&definition.id)
        .bind(&definition.name)
        .bind(i64::from(definition.published))
        .bind(&graph_json)
        .bind(definition.created_at.to_rfc3339())
        .execute(self.pool.as_ref())
        .await
        .map_err(backend)?;
        Ok(definition)
    }

    async fn find_all(&self) -> Result<Vec<WorkflowDefinition>> {
        let rows = sqlx::query("SELECT * FROM workflows ORDER BY created_at DESC")
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(backend)?;
        rows.iter().map(row_to_definition).collect()
    }

    async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<WorkflowDefinition>> {
        let row = sqlx::query("SELECT * FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(backend)?;
        row.as_ref().map(row_to_definition).transpose()
    }

    #[instrument(skip(self), err)]
    async fn publish(&self, id: &WorkflowId) -> Result<()> {
        let result = sqlx::query("UPDATE workflows SET published = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool.as_ref())
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                what: "workflow definition",
                id: id.clone(),
            });
        }
        Ok(())
    }

    async fn find_published(&self) -> Result<Vec<WorkflowDefinition>> {
        let rows =
            sqlx::query("SELECT * FROM workflows WHERE published = 1 ORDER BY created_at DESC")
                .fetch_all(self.pool.as_ref())
                .await
                .map_err(backend)?;
        rows.iter().map(row_to_definition).collect()
    }
}

#[async_trait]
impl RunStore for SqliteStore {
    #[instrument(skip(self, run), fields(run_id = %run.id), err)]
    async fn create(&self, run: WorkflowRun) -> Result<WorkflowRun> {
        let context_json = to_json_column(&run.context, "context")?;
        sqlx::query(
            "INSERT INTO workflow_runs
               (id, workflow_id, status, started_at, ended_at, last_node,
                expected_event, error, context_json, revision)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&run.id)
        .bind(&run.workflow_id)
        .bind(run.status.encode())
        .bind(run.started_at.to_rfc3339())
        .bind(run.ended_at.map(|t| t.to_rfc3339()))
        .bind(&run.last_node)
        .bind(&run.expected_event)
        .bind(&run.error)
        .bind(&context_json)
        .bind(i64::from(run.revision))
        .execute(self.pool.as_ref())
        .await
        .map_err(backend)?;
        Ok(run)
    }

    #[instrument(skip(self, update), err)]
    async fn update(
        &self,
        id: &RunId,
        expected_revision: u32,
        update: RunUpdate,
    ) -> Result<WorkflowRun> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query("SELECT * FROM workflow_runs WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;
        let mut run = match row.as_ref().map(row_to_run).transpose()? {
            Some(run) => run,
            None => {
                return Err(StoreError::NotFound {
                    what: "workflow run",
                    id: id.clone(),
                });
            }
        };
        if run.revision != expected_revision {
            return Err(StoreError::RevisionConflict {
                id: id.clone(),
                expected: expected_revision,
            });
        }

        run.apply(&update);
        let context_json = to_json_column(&run.context, "context")?;
        let result = sqlx::query(
            "UPDATE workflow_runs
             SET status = ?, ended_at = ?, last_node = ?, expected_event = ?,
                 error = ?, context_json = ?, revision = ?
             WHERE id = ? AND revision = ?",
        )
        .bind(run.status.encode())
        .bind(run.ended_at.map(|t| t.to_rfc3339()))
        .bind(&run.last_node)
        .bind(&run.expected_event)
        .bind(&run.error)
        .bind(&context_json)
        .bind(i64::from(run.revision))
        .bind(id)
        .bind(i64::from(expected_revision))
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RevisionConflict {
                id: id.clone(),
                expected: expected_revision,
            });
        }

        tx.commit().await.map_err(backend)?;
        Ok(run)
    }

    async fn find_by_id(&self, id: &RunId) -> Result<Option<WorkflowRun>> {
        let row = sqlx::query("SELECT * FROM workflow_runs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(backend)?;
        row.as_ref().map(row_to_run).transpose()
    }

    async fn find_by_workflow(&self, workflow_id: &WorkflowId) -> Result<Vec<WorkflowRun>> {
        let rows =
            sqlx::query("SELECT * FROM workflow_runs WHERE workflow_id = ? ORDER BY started_at")
                .bind(workflow_id)
                .fetch_all(self.pool.as_ref())
                .await
                .map_err(backend)?;
        rows.iter().map(row_to_run).collect()
    }

    async fn find_paused_by_event(&self, event: &str) -> Result<Vec<WorkflowRun>> {
        let rows = sqlx::query(
            "SELECT * FROM workflow_runs WHERE status = 'PAUSED' AND expected_event = ?",
        )
        .bind(event)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(backend)?;
        rows.iter().map(row_to_run).collect()
    }

    async fn find_paused_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<WorkflowRun>> {
        let rows = sqlx::query(
            "SELECT * FROM workflow_runs WHERE status = 'PAUSED' AND started_at < ?",
        )
        .bind(cutoff.to_rfc3339())
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(backend)?;
        rows.iter().map(row_to_run).collect()
    }
}
