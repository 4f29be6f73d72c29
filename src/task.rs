//! Task record types and boundary validation.
//!
//! A [`Task`] is the only persisted entity. Its `scheduled_at` timestamp is
//! authoritative (it is also the reminder fire time); `time_label` is a
//! display string stored alongside it and never re-derived by the store.

use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::error::{PlannerError, Result};

/// Default priority for new tasks.
pub const DEFAULT_PRIORITY: &str = "Medium";

/// Default category for new tasks.
pub const DEFAULT_CATEGORY: &str = "General";

/// Store-assigned task identifier. Unique and immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Epoch milliseconds. The moment the task is "for" and its reminder time.
    pub scheduled_at: i64,
    /// Human-readable time, e.g. `"9:00 AM"`.
    pub time_label: String,
    pub priority: String,
    pub category: String,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    /// Build the stored form of `new` under a freshly assigned id.
    pub fn from_new(id: TaskId, new: NewTask) -> Self {
        Self {
            id,
            title: new.title,
            description: new.description,
            scheduled_at: new.scheduled_at,
            time_label: new.time_label,
            priority: new.priority,
            category: new.category,
            completed: new.completed,
        }
    }
}

/// A task that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scheduled_at: i64,
    #[serde(default)]
    pub time_label: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub completed: bool,
}

fn default_priority() -> String {
    DEFAULT_PRIORITY.to_owned()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_owned()
}

impl NewTask {
    /// Create an incomplete task with default priority and category.
    pub fn new(title: impl Into<String>, scheduled_at: i64, time_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            scheduled_at,
            time_label: time_label.into(),
            priority: default_priority(),
            category: default_category(),
            completed: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = priority.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Normalize and check a task before it is handed to the coordinator.
    ///
    /// Trims the title and rejects it when empty. An empty time label is
    /// filled in from `scheduled_at` in local time; a non-empty label is kept
    /// as given even if it disagrees with the timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Validation`] for an empty title or a
    /// `scheduled_at` outside the representable date range.
    pub fn validate(mut self) -> Result<Self> {
        self.title = validate_title(&self.title)?;
        validate_scheduled_at(self.scheduled_at)?;
        if self.time_label.trim().is_empty() {
            self.time_label = calendar::time_label_for(self.scheduled_at);
        }
        Ok(self)
    }
}

/// Validate an already-stored task before an update.
///
/// # Errors
///
/// Returns [`PlannerError::Validation`] for an empty title or label, or an
/// out-of-range `scheduled_at`.
pub fn validate_update(mut task: Task) -> Result<Task> {
    task.title = validate_title(&task.title)?;
    validate_scheduled_at(task.scheduled_at)?;
    if task.time_label.trim().is_empty() {
        return Err(PlannerError::Validation(format!(
            "task {} has an empty time label",
            task.id
        )));
    }
    Ok(task)
}

fn validate_scheduled_at(at: i64) -> Result<()> {
    if !calendar::is_representable(at) {
        return Err(PlannerError::Validation(format!(
            "scheduled time {at} is out of range"
        )));
    }
    Ok(())
}

fn validate_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(PlannerError::Validation("task name is required".to_owned()));
    }
    Ok(title.to_owned())
}

/// Render a 24-hour clock time as `"h:MM AM"` / `"h:MM PM"`.
#[must_use]
pub fn format_time_label(hour: u32, minute: u32) -> String {
    let am_pm = if hour >= 12 { "PM" } else { "AM" };
    let hour12 = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{hour12}:{minute:02} {am_pm}")
}
