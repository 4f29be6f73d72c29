//! Persistent task storage.
//!
//! Sub-modules:
//! - `schema`: SQLite DDL definitions.
//! - `sqlite`: SQLite-backed [`SqliteTaskStore`].
//!
//! The coordinator only depends on the [`TaskStore`] trait, so tests can
//! substitute a failing or instrumented store.

pub(crate) mod schema;
pub mod sqlite;

use chrono::NaiveDate;

use crate::task::{NewTask, Task, TaskId};

pub use sqlite::SqliteTaskStore;

/// CRUD over persisted tasks plus the two view queries.
///
/// Implementations must be safe to call from a blocking worker thread.
/// None of the methods validate task content; that happens at the boundary.
pub trait TaskStore: Send + Sync + 'static {
    /// Insert a task and return its fresh, strictly increasing id.
    fn create(&self, task: &NewTask) -> Result<TaskId, StoreError>;

    /// Replace every mutable field of the task with `task.id`.
    ///
    /// Returns [`StoreError::NotFound`] without writing anything when no
    /// such task exists.
    fn update(&self, task: &Task) -> Result<(), StoreError>;

    /// Remove a task. Returns `false` when it was already absent.
    fn delete(&self, id: TaskId) -> Result<bool, StoreError>;

    /// Set only the `completed` flag.
    fn set_completed(&self, id: TaskId, completed: bool) -> Result<(), StoreError>;

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Tasks scheduled within the local day `day`, ordered by `time_label`
    /// string comparison (lexical, so `"10:00 AM"` sorts before `"9:00 AM"`).
    fn read_by_day(&self, day: NaiveDate) -> Result<Vec<Task>, StoreError>;

    /// Tasks scheduled at or after the start of the local day containing
    /// `now`, ordered by `scheduled_at` then `time_label`.
    fn read_all_upcoming(&self, now: i64) -> Result<Vec<Task>, StoreError>;

    /// Every task, newest `scheduled_at` first.
    fn read_all(&self) -> Result<Vec<Task>, StoreError>;
}

/// Errors from the task store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("lock poisoned: {0}")]
    Lock(String),
}
