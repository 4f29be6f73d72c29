//! Dayplan: a local task store with consistent reminder scheduling.
//!
//! Tasks live in SQLite. Every change goes through one serialized worker
//! that writes the store, syncs the host's reminder scheduler, then
//! republishes two views:
//!
//! - **Day agenda**: tasks of the selected calendar day.
//! - **Upcoming timeline**: tasks from today on, grouped by day with the
//!   nearest day highlighted.
//!
//! The scheduler is an external collaborator behind [`ReminderScheduler`];
//! [`TokioReminderScheduler`] is an in-process implementation.

pub mod calendar;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod paths;
pub mod reminder;
pub mod store;
pub mod task;
pub mod view;

pub use config::PlannerConfig;
pub use coordinator::{
    Clock, CoordinatorEvent, Mutation, MutationCoordinator, MutationOutcome, SystemClock,
    TaskClient, ViewSnapshot, mutation_channel,
};
pub use error::{PlannerError, Result};
pub use reminder::{ReminderError, ReminderScheduler, ReminderSync, TokioReminderScheduler};
pub use store::{SqliteTaskStore, StoreError, TaskStore};
pub use task::{NewTask, Task, TaskId};
pub use view::{DayAgendaView, TaskViewProjector, TimelineView};
