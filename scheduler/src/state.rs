//! Durable task-status storage.
//!
//! The scheduler persists the last known status per task so that
//! reconciliation can resume after a restart. Only status fetch/store is
//! in scope here; everything else the service persists lives elsewhere.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use ballast_id::TaskId;
use ballast_protocol::{TaskState, TaskStatus};
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::debug;

/// Errors from state store operations.
#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid stored state: {0}")]
    Invalid(String),
}

/// Fetch and store of task statuses.
pub trait StateStore: Send + Sync {
    /// All known task statuses.
    fn fetch_statuses(&self) -> Result<Vec<TaskStatus>, StateStoreError>;

    /// Upserts the status for one task.
    fn store_status(&self, status: &TaskStatus) -> Result<(), StateStoreError>;
}

/// SQLite-backed state store.
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// Opens or creates a state store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StateStoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StateStoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StateStoreError> {
        self.conn.lock().unwrap().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS task_statuses (
                task_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                message TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_task_statuses_state ON task_statuses(state);
            "#,
        )?;

        debug!("State store schema initialized");
        Ok(())
    }
}

impl StateStore for SqliteStateStore {
    fn fetch_statuses(&self) -> Result<Vec<TaskStatus>, StateStoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT task_id, state, agent_id, timestamp_ms, message
             FROM task_statuses ORDER BY task_id",
        )?;

        let rows = stmt.query_map([], |row| {
            let task_id: String = row.get(0)?;
            let state: String = row.get(1)?;
            let agent_id: String = row.get(2)?;
            let timestamp_ms: i64 = row.get(3)?;
            let message: Option<String> = row.get(4)?;
            Ok((task_id, state, agent_id, timestamp_ms, message))
        })?;

        let mut statuses = Vec::new();
        for row in rows {
            let (task_id, state, agent_id, timestamp_ms, message) = row?;
            let task_id: TaskId = task_id
                .parse()
                .map_err(|e| StateStoreError::Invalid(format!("task id: {e}")))?;
            let state = TaskState::from_str_opt(&state)
                .ok_or_else(|| StateStoreError::Invalid(format!("task state '{state}'")))?;
            let agent_id = agent_id
                .parse()
                .map_err(|e| StateStoreError::Invalid(format!("agent id: {e}")))?;
            statuses.push(TaskStatus {
                task_id,
                state,
                agent_id,
                timestamp_ms,
                message,
            });
        }

        Ok(statuses)
    }

    fn store_status(&self, status: &TaskStatus) -> Result<(), StateStoreError> {
        self.conn.lock().unwrap().execute(
            r#"
            INSERT INTO task_statuses (task_id, state, agent_id, timestamp_ms, message)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(task_id) DO UPDATE SET
                state = excluded.state,
                agent_id = excluded.agent_id,
                timestamp_ms = excluded.timestamp_ms,
                message = excluded.message
            "#,
            params![
                status.task_id.as_str(),
                status.state.as_str(),
                status.agent_id.as_str(),
                status.timestamp_ms,
                status.message,
            ],
        )?;
        Ok(())
    }
}

/// In-memory state store for tests.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    statuses: Mutex<HashMap<TaskId, TaskStatus>>,
}

impl InMemoryStateStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given statuses.
    #[must_use]
    pub fn with_statuses<I: IntoIterator<Item = TaskStatus>>(statuses: I) -> Self {
        let store = Self::new();
        {
            let mut map = store.statuses.lock().unwrap();
            for status in statuses {
                map.insert(status.task_id.clone(), status);
            }
        }
        store
    }
}

impl StateStore for InMemoryStateStore {
    fn fetch_statuses(&self) -> Result<Vec<TaskStatus>, StateStoreError> {
        let mut statuses: Vec<TaskStatus> =
            self.statuses.lock().unwrap().values().cloned().collect();
        statuses.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        Ok(statuses)
    }

    fn store_status(&self, status: &TaskStatus) -> Result<(), StateStoreError> {
        self.statuses
            .lock()
            .unwrap()
            .insert(status.task_id.clone(), status.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(task: &str, state: TaskState) -> TaskStatus {
        TaskStatus::new(
            task.parse().unwrap(),
            state,
            "agent-1".parse().unwrap(),
            1000,
        )
    }

    #[test]
    fn test_sqlite_store_roundtrip() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        assert!(store.fetch_statuses().unwrap().is_empty());

        store
            .store_status(&status("web-0__a", TaskState::Staging))
            .unwrap();
        store
            .store_status(&status("web-1__b", TaskState::Running))
            .unwrap();

        let fetched = store.fetch_statuses().unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].task_id.as_str(), "web-0__a");
        assert_eq!(fetched[0].state, TaskState::Staging);
    }

    #[test]
    fn test_sqlite_store_upserts() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        store
            .store_status(&status("web-0__a", TaskState::Staging))
            .unwrap();
        store
            .store_status(&status("web-0__a", TaskState::Running))
            .unwrap();

        let fetched = store.fetch_statuses().unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].state, TaskState::Running);
    }

    #[test]
    fn test_sqlite_store_preserves_message() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        let mut s = status("web-0__a", TaskState::Failed);
        s.message = Some("container exited".to_string());
        store.store_status(&s).unwrap();

        let fetched = store.fetch_statuses().unwrap();
        assert_eq!(fetched[0].message.as_deref(), Some("container exited"));
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryStateStore::with_statuses([
            status("a__1", TaskState::Running),
            status("b__2", TaskState::Finished),
        ]);
        assert_eq!(store.fetch_statuses().unwrap().len(), 2);

        store.store_status(&status("a__1", TaskState::Failed)).unwrap();
        let fetched = store.fetch_statuses().unwrap();
        assert_eq!(fetched[0].state, TaskState::Failed);
    }
}
