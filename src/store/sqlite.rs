//! SQLite-backed task store.
//!
//! One database file (`tasks.db` by default) with one row per task.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::{Connection, params};
use tracing::debug;

use super::schema::{apply_schema, read_schema_version};
use super::{StoreError, TaskStore};
use crate::calendar::{self, DayRange};
use crate::task::{NewTask, Task, TaskId};

/// Column list shared by every `SELECT`, in `row_to_task` order.
const TASK_COLUMNS: &str =
    "id, title, description, scheduled_at, time_label, priority, category, completed";

/// SQLite-backed task store.
///
/// Thread-safe via an internal `Mutex<Connection>`. Mutation ordering is the
/// coordinator's job; the mutex only keeps the connection sound.
pub struct SqliteTaskStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
    fresh: bool,
}

impl SqliteTaskStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        let fresh = apply_schema(&conn)?;
        debug!(path = %path.display(), fresh, "opened task store");
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
            fresh,
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let fresh = apply_schema(&conn)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
            fresh,
        })
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether this handle created the schema.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn schema_version(&self) -> Result<Option<u32>, StoreError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    /// Insert the "Sample Task 1" starter row into a freshly created store.
    ///
    /// Does nothing (returns `None`) for an existing database.
    pub fn seed_sample_task(&self, now: i64) -> Result<Option<TaskId>, StoreError> {
        if !self.fresh {
            return Ok(None);
        }
        let sample = NewTask::new("Sample Task 1", now, "10:00 AM")
            .with_description("This is a sample task");
        self.create(&sample).map(Some)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn query_tasks(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Task>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_task)?;

        let mut tasks = Vec::new();
        for r in rows {
            tasks.push(r?);
        }
        Ok(tasks)
    }
}

impl TaskStore for SqliteTaskStore {
    fn create(&self, task: &NewTask) -> Result<TaskId, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks \
             (title, description, scheduled_at, time_label, priority, category, completed) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.title,
                task.description,
                task.scheduled_at,
                task.time_label,
                task.priority,
                task.category,
                task.completed
            ],
        )?;
        let id = TaskId(conn.last_insert_rowid());
        debug!(task_id = %id, title = %task.title, "task created");
        Ok(id)
    }

    fn update(&self, task: &Task) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE tasks SET title = ?1, description = ?2, scheduled_at = ?3, \
             time_label = ?4, priority = ?5, category = ?6, completed = ?7 WHERE id = ?8",
            params![
                task.title,
                task.description,
                task.scheduled_at,
                task.time_label,
                task.priority,
                task.category,
                task.completed,
                task.id.0
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound(task.id));
        }
        Ok(())
    }

    fn delete(&self, id: TaskId) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.0])?;
        Ok(rows > 0)
    }

    fn set_completed(&self, id: TaskId, completed: bool) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE tasks SET completed = ?1 WHERE id = ?2",
            params![completed, id.0],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        Ok(self.query_tasks(&sql, params![id.0])?.into_iter().next())
    }

    fn read_by_day(&self, day: NaiveDate) -> Result<Vec<Task>, StoreError> {
        let range = DayRange::for_date(day);
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE scheduled_at >= ?1 AND scheduled_at <= ?2 \
             ORDER BY time_label ASC, id ASC"
        );
        self.query_tasks(&sql, params![range.start, range.end])
    }

    fn read_all_upcoming(&self, now: i64) -> Result<Vec<Task>, StoreError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE scheduled_at >= ?1 \
             ORDER BY scheduled_at ASC, time_label ASC, id ASC"
        );
        self.query_tasks(&sql, params![calendar::start_of_today(now)])
    }

    fn read_all(&self) -> Result<Vec<Task>, StoreError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY scheduled_at DESC, id DESC");
        self.query_tasks(&sql, [])
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let completed: i64 = row.get(7)?;
    Ok(Task {
        id: TaskId(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        scheduled_at: row.get(3)?,
        time_label: row.get(4)?,
        priority: row.get(5)?,
        category: row.get(6)?,
        completed: completed != 0,
    })
}
