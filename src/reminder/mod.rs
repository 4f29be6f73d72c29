//! Reminder scheduling boundary.
//!
//! The core depends only on the [`ReminderScheduler`] contract: upsert a
//! one-shot wake keyed by task id, or cancel it. [`runtime`] provides an
//! in-process implementation driven by tokio timers.
//!
//! Scheduler failures never fail a mutation. [`schedule_best_effort`] and
//! [`cancel_best_effort`] turn every error into a [`ReminderSync`] value the
//! coordinator reports alongside the (already committed) store effect.

pub mod runtime;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::task::TaskId;

pub use runtime::{ReminderFired, TokioReminderScheduler};

/// Host-provided one-shot wake scheduler.
pub trait ReminderScheduler: Send + Sync + 'static {
    /// Upsert a precise wake for `id` at `fire_at` (epoch ms).
    ///
    /// Replaces any pending wake with the same id. Must be a no-op when
    /// `fire_at` is not strictly after the current time. Delivery is
    /// at-most-once, at or after `fire_at`.
    fn schedule(&self, id: TaskId, title: &str, fire_at: i64) -> Result<(), ReminderError>;

    /// Upsert an inexact wake; used when precise scheduling is refused.
    fn schedule_approximate(
        &self,
        _id: TaskId,
        _title: &str,
        _fire_at: i64,
    ) -> Result<(), ReminderError> {
        Err(ReminderError::Unavailable(
            "approximate wakes not supported".to_owned(),
        ))
    }

    /// Remove any pending wake for `id`. No-op when none exists.
    fn cancel(&self, id: TaskId) -> Result<(), ReminderError>;
}

/// Errors reported by a [`ReminderScheduler`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReminderError {
    /// The platform refused a precise wake (e.g. missing permission).
    #[error("precise scheduling denied: {0}")]
    PreciseDenied(String),

    #[error("scheduler unavailable: {0}")]
    Unavailable(String),
}

/// What happened on the scheduler side of a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ReminderSync {
    /// The mutation does not involve the scheduler.
    Untouched,
    /// `fire_at` was not in the future, so no wake was requested.
    SkippedPast,
    Scheduled,
    /// Precise scheduling was refused; an approximate wake was set instead.
    Approximate,
    Cancelled,
    /// The scheduler call failed. The store change still stands.
    Degraded(String),
}

impl ReminderSync {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Call `schedule`, falling back to `schedule_approximate` on a precise-wake
/// refusal. Never fails.
pub fn schedule_best_effort<S: ReminderScheduler + ?Sized>(
    scheduler: &S,
    id: TaskId,
    title: &str,
    fire_at: i64,
) -> ReminderSync {
    match scheduler.schedule(id, title, fire_at) {
        Ok(()) => ReminderSync::Scheduled,
        Err(ReminderError::PreciseDenied(reason)) => {
            warn!(task_id = %id, %reason, "precise reminder refused, falling back to approximate");
            match scheduler.schedule_approximate(id, title, fire_at) {
                Ok(()) => ReminderSync::Approximate,
                Err(e) => {
                    warn!(task_id = %id, error = %e, "approximate reminder failed");
                    ReminderSync::Degraded(e.to_string())
                }
            }
        }
        Err(e) => {
            warn!(task_id = %id, error = %e, "reminder schedule failed");
            ReminderSync::Degraded(e.to_string())
        }
    }
}

/// Call `cancel`. Never fails.
pub fn cancel_best_effort<S: ReminderScheduler + ?Sized>(scheduler: &S, id: TaskId) -> ReminderSync {
    match scheduler.cancel(id) {
        Ok(()) => ReminderSync::Cancelled,
        Err(e) => {
            warn!(task_id = %id, error = %e, "reminder cancel failed");
            ReminderSync::Degraded(e.to_string())
        }
    }
}
