//! Presentation-ready projections of task lists.
//!
//! Everything here is pure: the projector receives tasks already fetched
//! (and ordered) by the store, plus the current time, and returns the
//! day-agenda and upcoming-timeline views.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{self, RelativeDay};
use crate::task::Task;

/// Whether a timeline row shows its day badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayHeader {
    /// First row of its calendar day.
    Visible,
    /// Same day as the previous row; the badge space is kept but left blank.
    Suppressed,
}

/// One row of the day agenda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub task: Task,
    /// `"Today, 9:00 AM"`, `"Oct 3, 2026, 9:00 AM"`, ...
    pub label: String,
}

/// Tasks for one selected day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAgendaView {
    pub day: NaiveDate,
    pub relative: RelativeDay,
    /// `"Today (3 tasks)"`.
    pub header: String,
    pub items: Vec<AgendaItem>,
}

/// One row of the upcoming timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub task: Task,
    pub header: DayHeader,
    /// Row falls on the nearest day.
    pub highlighted: bool,
    /// Abbreviated weekday, e.g. `"Mon"`.
    pub day_name: String,
    /// Day of month, e.g. `"8"`.
    pub day_number: String,
}

/// All upcoming tasks in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineView {
    pub items: Vec<TimelineItem>,
    /// Calendar day of the first row; `None` for an empty timeline.
    pub nearest_day: Option<NaiveDate>,
}

impl TimelineView {
    /// Number of rows that show a day badge.
    #[must_use]
    pub fn visible_headers(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.header == DayHeader::Visible)
            .count()
    }
}

/// Builds both views from fetched task lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskViewProjector {
    hide_completed: bool,
}

impl TaskViewProjector {
    #[must_use]
    pub fn new(hide_completed: bool) -> Self {
        Self { hide_completed }
    }

    /// Project the tasks of `day` (already in store order).
    #[must_use]
    pub fn project_day(&self, day: NaiveDate, tasks: Vec<Task>, now: i64) -> DayAgendaView {
        let relative = calendar::relative_date(day, calendar::local_date(now));
        let items: Vec<AgendaItem> = tasks
            .into_iter()
            .map(|task| AgendaItem {
                label: item_label(&task, now),
                task,
            })
            .collect();
        DayAgendaView {
            day,
            relative,
            header: agenda_header(relative, items.len()),
            items,
        }
    }

    /// Project the chronologically sorted upcoming tasks.
    #[must_use]
    pub fn project_timeline(&self, tasks: Vec<Task>) -> TimelineView {
        let tasks: Vec<Task> = if self.hide_completed {
            tasks.into_iter().filter(|t| !t.completed).collect()
        } else {
            tasks
        };

        let headers = day_headers(&tasks);
        let highlights = nearest_day_highlights(&tasks);
        let nearest_day = tasks.first().map(|t| calendar::local_date(t.scheduled_at));

        let items = tasks
            .into_iter()
            .zip(headers)
            .enumerate()
            .map(|(i, (task, header))| TimelineItem {
                highlighted: highlights.as_ref().is_some_and(|h| h[i]),
                day_name: calendar::weekday_abbrev(task.scheduled_at),
                day_number: calendar::day_of_month(task.scheduled_at),
                header,
                task,
            })
            .collect();

        TimelineView { items, nearest_day }
    }
}

/// Mark the first row of each run of same-day tasks as [`DayHeader::Visible`].
#[must_use]
pub fn day_headers(tasks: &[Task]) -> Vec<DayHeader> {
    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let first_of_day = i == 0
                || !calendar::same_day(task.scheduled_at, tasks[i - 1].scheduled_at);
            if first_of_day {
                DayHeader::Visible
            } else {
                DayHeader::Suppressed
            }
        })
        .collect()
}

/// Highlight every task on the same calendar day as the first task.
///
/// Returns `None` for an empty list.
#[must_use]
pub fn nearest_day_highlights(tasks: &[Task]) -> Option<Vec<bool>> {
    let nearest = tasks.first()?.scheduled_at;
    Some(
        tasks
            .iter()
            .map(|t| calendar::same_day(t.scheduled_at, nearest))
            .collect(),
    )
}

/// `"<relative day>, <time label>"` for an agenda row.
#[must_use]
pub fn item_label(task: &Task, now: i64) -> String {
    format!(
        "{}, {}",
        calendar::relative_day(task.scheduled_at, now),
        task.time_label
    )
}

/// `"<relative day> (N tasks)"` for the agenda header.
#[must_use]
pub fn agenda_header(relative: RelativeDay, count: usize) -> String {
    format!("{relative} ({count} tasks)")
}
