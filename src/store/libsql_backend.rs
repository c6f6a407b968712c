//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. All timestamps are written
//! as fixed-width RFC 3339 UTC strings with microsecond precision so that
//! lexical order in SQL matches chronological order.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::Database;
use crate::tasks::model::{Counts, Task, TaskPage, TaskQuery, TaskStatus, TerminalOutcome};
use crate::worker::run::{RunInput, RunRecord, RunStatus};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical write format for timestamps.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

const TASK_COLUMNS: &str = "id, status, result, created_at, updated_at";

const RUN_COLUMNS: &str =
    "id, task_id, payload, status, attempts, last_error, started_at, updated_at, finished_at";

fn row_to_task(row: &libsql::Row) -> Result<Task, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("task.id: {e}")))?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| DatabaseError::Serialization(format!("task.id parse: {e}")))?;

    let status_str: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("task.status: {e}")))?;
    let status: TaskStatus = status_str
        .parse()
        .map_err(|e: String| DatabaseError::Serialization(format!("task.status: {e}")))?;

    let result_str: Option<String> = row.get(2).ok();
    let result = match result_str {
        Some(raw) => Some(
            serde_json::from_str::<Counts>(&raw)
                .map_err(|e| DatabaseError::Serialization(format!("task.result: {e}")))?,
        ),
        None => None,
    };

    let created_str: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("task.created_at: {e}")))?;
    let updated_str: String = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("task.updated_at: {e}")))?;

    Ok(Task {
        id,
        status,
        result,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

fn row_to_run(row: &libsql::Row) -> Result<RunRecord, DatabaseError> {
    let id: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("run.id: {e}")))?;
    let task_id_str: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("run.task_id: {e}")))?;
    let task_id = Uuid::parse_str(&task_id_str)
        .map_err(|e| DatabaseError::Serialization(format!("run.task_id parse: {e}")))?;
    let payload: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("run.payload: {e}")))?;

    let status_str: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("run.status: {e}")))?;
    let status: RunStatus = status_str
        .parse()
        .map_err(|e: String| DatabaseError::Serialization(format!("run.status: {e}")))?;

    let attempts: i64 = row.get(4).unwrap_or(0);
    let last_error: Option<String> = row.get(5).ok();
    let started_str: String = row
        .get(6)
        .map_err(|e| DatabaseError::Query(format!("run.started_at: {e}")))?;
    let updated_str: String = row
        .get(7)
        .map_err(|e| DatabaseError::Query(format!("run.updated_at: {e}")))?;
    let finished_str: Option<String> = row.get(8).ok();

    Ok(RunRecord {
        id,
        input: RunInput { task_id, payload },
        status,
        attempts: u32::try_from(attempts).unwrap_or(0),
        last_error,
        started_at: parse_datetime(&started_str),
        updated_at: parse_datetime(&updated_str),
        finished_at: finished_str.as_deref().map(parse_datetime),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT 1", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("ping: {e}")))?;
        rows.next()
            .await
            .map_err(|e| DatabaseError::Query(format!("ping: {e}")))?;
        Ok(())
    }

    // ── Tasks ───────────────────────────────────────────────────────

    async fn create_task(&self) -> Result<Task, DatabaseError> {
        let task = Task::new();
        let created = format_datetime(&task.created_at);

        self.conn()
            .execute(
                "INSERT INTO tasks (id, status, result, created_at, updated_at)
                 VALUES (?1, ?2, NULL, ?3, ?3)",
                params![task.id.to_string(), task.status.as_str(), created],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_task: {e}")))?;

        debug!(task_id = %task.id, "Task created");
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_task: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_task(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_task: {e}"))),
        }
    }

    async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage, DatabaseError> {
        let conn = self.conn();
        let status = query.status.map(|s| s.as_str());

        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM tasks WHERE (?1 IS NULL OR status = ?1)",
                params![opt_text(status)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_tasks count: {e}")))?;
        let total: i64 = match rows.next().await {
            Ok(Some(row)) => row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("list_tasks count: {e}")))?,
            Ok(None) => 0,
            Err(e) => return Err(DatabaseError::Query(format!("list_tasks count: {e}"))),
        };

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE (?1 IS NULL OR status = ?1)
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?2 OFFSET ?3"
                ),
                params![
                    opt_text(status),
                    query.effective_limit() as i64,
                    query.offset as i64
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_tasks: {e}")))?;

        let mut items = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => items.push(row_to_task(&row)?),
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("list_tasks: {e}"))),
            }
        }

        Ok(TaskPage {
            items,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn set_task_terminal(
        &self,
        id: Uuid,
        outcome: &TerminalOutcome,
    ) -> Result<bool, DatabaseError> {
        let result = outcome
            .counts()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DatabaseError::Serialization(format!("task.result: {e}")))?;
        let now = format_datetime(&Utc::now());

        let affected = self
            .conn()
            .execute(
                "UPDATE tasks SET status = ?1, result = ?2, updated_at = MAX(?3, created_at)
                 WHERE id = ?4 AND status != 'completed'",
                params![
                    outcome.status().as_str(),
                    opt_text(result.as_deref()),
                    now,
                    id.to_string()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_task_terminal: {e}")))?;

        debug!(task_id = %id, status = %outcome.status(), affected, "Task terminal write");
        Ok(affected > 0)
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let affected = self
            .conn()
            .execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_task: {e}")))?;

        // The run row stays as the idempotency key; its payload goes.
        self.conn()
            .execute(
                "UPDATE runs SET payload = '' WHERE task_id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_task: {e}")))?;
        Ok(affected > 0)
    }

    // ── Runs ────────────────────────────────────────────────────────

    async fn insert_run(&self, run: &RunRecord) -> Result<bool, DatabaseError> {
        let affected = self
            .conn()
            .execute(
                &format!(
                    "INSERT OR IGNORE INTO runs ({RUN_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    run.id.as_str(),
                    run.input.task_id.to_string(),
                    run.input.payload.as_str(),
                    run.status.as_str(),
                    i64::from(run.attempts),
                    opt_text(run.last_error.as_deref()),
                    format_datetime(&run.started_at),
                    format_datetime(&run.updated_at),
                    opt_text(run.finished_at.map(|t| format_datetime(&t)).as_deref())
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_run: {e}")))?;

        if affected > 0 {
            debug!(run_id = %run.id, "Run recorded");
        }
        Ok(affected > 0)
    }

    async fn get_run(&self, id: &str) -> Result<Option<RunRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_run: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_run(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_run: {e}"))),
        }
    }

    async fn record_run_attempt(
        &self,
        id: &str,
        attempts: u32,
        last_error: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let now = format_datetime(&Utc::now());
        self.conn()
            .execute(
                "UPDATE runs SET attempts = ?1, last_error = COALESCE(?2, last_error), updated_at = ?3
                 WHERE id = ?4",
                params![i64::from(attempts), opt_text(last_error), now, id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("record_run_attempt: {e}")))?;
        Ok(())
    }

    async fn finish_run(
        &self,
        id: &str,
        status: RunStatus,
        last_error: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let now = format_datetime(&Utc::now());
        self.conn()
            .execute(
                "UPDATE runs SET status = ?1, last_error = COALESCE(?2, last_error),
                     payload = '', updated_at = ?3, finished_at = ?3
                 WHERE id = ?4 AND status = 'running'",
                params![status.as_str(), opt_text(last_error), now, id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("finish_run: {e}")))?;

        debug!(run_id = %id, status = %status, "Run finished");
        Ok(())
    }

    async fn list_running_runs(&self) -> Result<Vec<RunRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {RUN_COLUMNS} FROM runs WHERE status = 'running'
                     ORDER BY started_at ASC, rowid ASC"
                ),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_running_runs: {e}")))?;

        let mut runs = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => match row_to_run(&row) {
                    Ok(run) => runs.push(run),
                    Err(e) => tracing::warn!("Skipping run row: {e}"),
                },
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("list_running_runs: {e}"))),
            }
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn bell_counts() -> Counts {
        [("00", 512u64), ("11", 512)].into_iter().collect()
    }

    fn run_for(task: &Task) -> RunRecord {
        RunRecord::new(
            task.run_id(),
            RunInput {
                task_id: task.id,
                payload: "OPENQASM 3;".into(),
            },
        )
    }

    #[tokio::test]
    async fn test_create_and_get_task() {
        let db = test_db().await;
        let task = db.create_task().await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);

        let fetched = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, task.id);
        assert_eq!(fetched.status, TaskStatus::Pending);
        assert!(fetched.result.is_none());
        assert_eq!(fetched.created_at, task.created_at);
    }

    #[tokio::test]
    async fn test_get_missing_task() {
        let db = test_db().await;
        assert!(db.get_task(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_terminal_completed() {
        let db = test_db().await;
        let task = db.create_task().await.unwrap();

        let written = db
            .set_task_terminal(task.id, &TerminalOutcome::Completed(bell_counts()))
            .await
            .unwrap();
        assert!(written);

        let fetched = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::Completed);
        assert_eq!(fetched.result.unwrap().total(), 1024);
        assert!(fetched.updated_at >= fetched.created_at);
    }

    #[tokio::test]
    async fn test_set_terminal_failed_clears_result() {
        let db = test_db().await;
        let task = db.create_task().await.unwrap();

        db.set_task_terminal(task.id, &TerminalOutcome::Failed)
            .await
            .unwrap();
        let fetched = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::Failed);
        assert!(fetched.result.is_none());

        // A later attempt may still complete the task.
        db.set_task_terminal(task.id, &TerminalOutcome::Completed(bell_counts()))
            .await
            .unwrap();
        let fetched = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_set_terminal_never_overwrites_completed() {
        let db = test_db().await;
        let task = db.create_task().await.unwrap();
        db.set_task_terminal(task.id, &TerminalOutcome::Completed(bell_counts()))
            .await
            .unwrap();

        let written = db
            .set_task_terminal(task.id, &TerminalOutcome::Failed)
            .await
            .unwrap();
        assert!(!written);

        let fetched = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::Completed);
        assert_eq!(fetched.result, Some(bell_counts()));
    }

    #[tokio::test]
    async fn test_set_terminal_missing_is_noop() {
        let db = test_db().await;
        let written = db
            .set_task_terminal(Uuid::new_v4(), &TerminalOutcome::Failed)
            .await
            .unwrap();
        assert!(!written);
    }

    #[tokio::test]
    async fn test_delete_task() {
        let db = test_db().await;
        let task = db.create_task().await.unwrap();

        assert!(db.delete_task(task.id).await.unwrap());
        assert!(db.get_task(task.id).await.unwrap().is_none());
        assert!(!db.delete_task(task.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_total() {
        let db = test_db().await;
        let mut ids = Vec::new();
        for _ in 0..10 {
            ids.push(db.create_task().await.unwrap().id);
        }

        let page = db
            .list_tasks(&TaskQuery::default().page(5, 0))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total, 10);

        let newest: Vec<Uuid> = ids.iter().rev().take(5).copied().collect();
        let listed: Vec<Uuid> = page.items.iter().map(|t| t.id).collect();
        assert_eq!(listed, newest);

        let rest = db
            .list_tasks(&TaskQuery::default().page(5, 5))
            .await
            .unwrap();
        assert_eq!(rest.items.len(), 5);
        assert_eq!(rest.items.last().unwrap().id, ids[0]);

        let past_end = db
            .list_tasks(&TaskQuery::default().page(5, 20))
            .await
            .unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 10);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let db = test_db().await;
        let a = db.create_task().await.unwrap();
        let b = db.create_task().await.unwrap();
        let _c = db.create_task().await.unwrap();

        db.set_task_terminal(a.id, &TerminalOutcome::Completed(bell_counts()))
            .await
            .unwrap();
        db.set_task_terminal(b.id, &TerminalOutcome::Failed)
            .await
            .unwrap();

        let completed = db
            .list_tasks(&TaskQuery::default().with_status(TaskStatus::Completed))
            .await
            .unwrap();
        assert_eq!(completed.total, 1);
        assert_eq!(completed.items[0].id, a.id);

        let pending = db
            .list_tasks(&TaskQuery::default().with_status(TaskStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.total, 1);

        let all = db.list_tasks(&TaskQuery::default()).await.unwrap();
        assert_eq!(all.total, 3);
    }

    #[tokio::test]
    async fn test_list_limit_is_clamped() {
        let db = test_db().await;
        db.create_task().await.unwrap();

        let zero = db
            .list_tasks(&TaskQuery::default().page(0, 0))
            .await
            .unwrap();
        assert!(zero.items.is_empty());
        assert_eq!(zero.total, 1);

        let huge = db
            .list_tasks(&TaskQuery::default().page(10_000, 0))
            .await
            .unwrap();
        assert_eq!(huge.items.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_run_is_idempotent() {
        let db = test_db().await;
        let task = db.create_task().await.unwrap();
        let run = run_for(&task);

        assert!(db.insert_run(&run).await.unwrap());
        assert!(!db.insert_run(&run).await.unwrap());

        let stored = db.get_run(&run.id).await.unwrap().unwrap();
        assert_eq!(stored.input, run.input);
        assert_eq!(stored.status, RunStatus::Running);
        assert_eq!(stored.attempts, 0);
    }

    #[tokio::test]
    async fn test_run_attempts_and_finish() {
        let db = test_db().await;
        let task = db.create_task().await.unwrap();
        let run = run_for(&task);
        db.insert_run(&run).await.unwrap();

        db.record_run_attempt(&run.id, 1, None).await.unwrap();
        db.record_run_attempt(&run.id, 2, Some("flaky backend"))
            .await
            .unwrap();
        assert_eq!(db.list_running_runs().await.unwrap().len(), 1);

        db.finish_run(&run.id, RunStatus::Completed, None)
            .await
            .unwrap();
        let stored = db.get_run(&run.id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, 2);
        assert_eq!(stored.status, RunStatus::Completed);
        assert_eq!(stored.last_error.as_deref(), Some("flaky backend"));
        assert!(stored.finished_at.is_some());
        assert!(db.list_running_runs().await.unwrap().is_empty());

        // A finished run keeps its first terminal status.
        db.finish_run(&run.id, RunStatus::Cancelled, None)
            .await
            .unwrap();
        let stored = db.get_run(&run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_finished_run_drops_payload() {
        let db = test_db().await;
        let task = db.create_task().await.unwrap();
        let run = run_for(&task);
        db.insert_run(&run).await.unwrap();

        db.finish_run(&run.id, RunStatus::Failed, Some("bad circuit"))
            .await
            .unwrap();
        let stored = db.get_run(&run.id).await.unwrap().unwrap();
        assert!(stored.input.payload.is_empty());
        assert_eq!(stored.input.task_id, task.id);
        assert_eq!(stored.last_error.as_deref(), Some("bad circuit"));
    }

    #[tokio::test]
    async fn test_run_outlives_task_deletion() {
        let db = test_db().await;
        let task = db.create_task().await.unwrap();
        let run = run_for(&task);
        db.insert_run(&run).await.unwrap();

        db.delete_task(task.id).await.unwrap();
        let stored = db.get_run(&run.id).await.unwrap().unwrap();
        assert!(stored.input.payload.is_empty());
        // The key still blocks a second start.
        assert!(!db.insert_run(&run).await.unwrap());
    }

    #[tokio::test]
    async fn test_ping() {
        let db = test_db().await;
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_on_disk_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.db");

        let id = {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.create_task().await.unwrap().id
        };

        let db = LibSqlBackend::new_local(&path).await.unwrap();
        let task = db.get_task(id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
    }
}
