//! SQLite-based run store

use crate::core::{EventKind, RunStatus};
use crate::persistence::{RunStore, RunSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// SQLite run store
pub struct SqliteRunStore {
    pool: SqlitePool,
}

impl SqliteRunStore {
    /// Create a new SQLite store
    pub async fn new(db_path: &str) -> Result<Self> {
        let pool = SqlitePool::connect(&format!("sqlite:{}", db_path))
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Create store with default path
    pub async fn with_default_path() -> Result<Self> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = data_dir.join("conveyor");
        std::fs::create_dir_all(&db_dir)?;

        let db_path = db_dir.join("runs.db");
        let db_path = db_path
            .to_str()
            .context("Run database path is not valid UTF-8")?;
        Self::new(db_path).await
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                workflow_name TEXT NOT NULL,
                event TEXT NOT NULL,
                branch TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                total_jobs INTEGER NOT NULL DEFAULT 0,
                succeeded_jobs INTEGER NOT NULL DEFAULT 0,
                failed_jobs INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_workflow_name ON runs(workflow_name);
            CREATE INDEX IF NOT EXISTS idx_started_at ON runs(started_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn status_from_str(status: &str) -> RunStatus {
        match status {
            "Pending" => RunStatus::Pending,
            "Running" => RunStatus::Running,
            "Succeeded" => RunStatus::Succeeded,
            "Failed" => RunStatus::Failed,
            "Skipped" => RunStatus::Skipped,
            _ => RunStatus::Pending,
        }
    }

    fn event_from_str(event: &str) -> EventKind {
        match event {
            "pull_request" => EventKind::PullRequest,
            _ => EventKind::Push,
        }
    }

    fn row_to_summary(row: &sqlx::sqlite::SqliteRow) -> Result<RunSummary> {
        Ok(RunSummary {
            run_id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            workflow_name: row.get("workflow_name"),
            event: Self::event_from_str(&row.get::<String, _>("event")),
            branch: row.get("branch"),
            status: Self::status_from_str(&row.get::<String, _>("status")),
            started_at: Self::from_naive(row.get("started_at")),
            completed_at: row
                .get::<Option<NaiveDateTime>, _>("completed_at")
                .map(Self::from_naive),
            total_jobs: row.get::<i64, _>("total_jobs") as usize,
            succeeded_jobs: row.get::<i64, _>("succeeded_jobs") as usize,
            failed_jobs: row.get::<i64, _>("failed_jobs") as usize,
        })
    }
}

#[async_trait::async_trait]
impl RunStore for SqliteRunStore {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO runs
            (id, workflow_name, event, branch, status, started_at, completed_at, total_jobs, succeeded_jobs, failed_jobs)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(run.run_id.to_string())
        .bind(&run.workflow_name)
        .bind(run.event.to_string())
        .bind(&run.branch)
        .bind(format!("{:?}", run.status))
        .bind(Self::to_naive(run.started_at))
        .bind(run.completed_at.map(Self::to_naive))
        .bind(run.total_jobs as i64)
        .bind(run.succeeded_jobs as i64)
        .bind(run.failed_jobs as i64)
        .execute(&self.pool)
        .await
        .context("Failed to save run")?;

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>> {
        let row = sqlx::query(
            r#"
            SELECT id, workflow_name, event, branch, status, started_at, completed_at, total_jobs, succeeded_jobs, failed_jobs
            FROM runs
            WHERE id = ?1
            "#,
        )
        .bind(run_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load run")?;

        row.as_ref().map(Self::row_to_summary).transpose()
    }

    async fn list_runs(&self, workflow_name: &str) -> Result<Vec<RunSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, workflow_name, event, branch, status, started_at, completed_at, total_jobs, succeeded_jobs, failed_jobs
            FROM runs
            WHERE workflow_name = ?1
            ORDER BY started_at DESC
            "#,
        )
        .bind(workflow_name)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list runs")?;

        rows.iter().map(Self::row_to_summary).collect()
    }

    async fn list_workflows(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT workflow_name
            FROM runs
            ORDER BY workflow_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list workflows")?;

        Ok(rows.iter().map(|row| row.get("workflow_name")).collect())
    }
}
