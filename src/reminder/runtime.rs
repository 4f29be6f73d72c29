//! In-process reminder scheduler backed by tokio timers.
//!
//! Each pending wake is a spawned task sleeping until its fire time. When it
//! elapses a [`ReminderFired`] is sent on the channel given at construction.
//! Wakes do not survive a restart; the coordinator re-arms them on start.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{ReminderError, ReminderScheduler};
use crate::calendar::now_epoch_millis;
use crate::task::TaskId;

/// Notification heading shown for every reminder.
pub const REMINDER_HEADING: &str = "Time for your task!";

/// Body used when the task title is empty.
pub const FALLBACK_REMINDER_TITLE: &str = "Task Reminder";

/// A reminder whose fire time has elapsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderFired {
    pub task_id: TaskId,
    pub title: String,
    /// Requested fire time (epoch ms).
    pub fire_at: i64,
    /// Actual delivery time (epoch ms), at or after `fire_at`.
    pub fired_at: i64,
}

impl ReminderFired {
    #[must_use]
    pub fn heading(&self) -> &'static str {
        REMINDER_HEADING
    }

    #[must_use]
    pub fn body(&self) -> &str {
        if self.title.trim().is_empty() {
            FALLBACK_REMINDER_TITLE
        } else {
            &self.title
        }
    }
}

struct PendingWake {
    generation: u64,
    fire_at: i64,
    join: JoinHandle<()>,
}

#[derive(Default)]
struct WakeTable {
    next_generation: u64,
    wakes: HashMap<TaskId, PendingWake>,
}

/// Reminder scheduler that keeps wakes as tokio timer tasks.
pub struct TokioReminderScheduler {
    handle: Handle,
    table: Arc<Mutex<WakeTable>>,
    fired_tx: mpsc::UnboundedSender<ReminderFired>,
}

impl TokioReminderScheduler {
    /// Create a scheduler on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::Unavailable`] when called outside a runtime.
    pub fn new(fired_tx: mpsc::UnboundedSender<ReminderFired>) -> Result<Self, ReminderError> {
        let handle = Handle::try_current()
            .map_err(|e| ReminderError::Unavailable(format!("no tokio runtime: {e}")))?;
        Ok(Self::with_handle(handle, fired_tx))
    }

    /// Create a scheduler that spawns its timers on `handle`.
    pub fn with_handle(handle: Handle, fired_tx: mpsc::UnboundedSender<ReminderFired>) -> Self {
        Self {
            handle,
            table: Arc::new(Mutex::new(WakeTable::default())),
            fired_tx,
        }
    }

    /// Fire time of the pending wake for `id`, if any.
    pub fn pending_fire_at(&self, id: TaskId) -> Option<i64> {
        self.lock().ok()?.wakes.get(&id).map(|w| w.fire_at)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().map(|t| t.wakes.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, WakeTable>, ReminderError> {
        self.table
            .lock()
            .map_err(|e| ReminderError::Unavailable(format!("wake table poisoned: {e}")))
    }

    fn arm(&self, id: TaskId, title: &str, fire_at: i64) -> Result<(), ReminderError> {
        let now = now_epoch_millis();
        let mut table = self.lock()?;
        if fire_at <= now {
            // Replacing with a past time still drops whatever was pending.
            if let Some(stale) = table.wakes.remove(&id) {
                stale.join.abort();
                debug!(task_id = %id, fire_at, "reminder moved into the past, pending wake dropped");
            } else {
                debug!(task_id = %id, fire_at, "reminder time already passed, not scheduling");
            }
            return Ok(());
        }

        table.next_generation += 1;
        let generation = table.next_generation;

        let delay = Duration::from_millis(u64::try_from(fire_at - now).unwrap_or(0));
        let wake_table = Arc::clone(&self.table);
        let fired_tx = self.fired_tx.clone();
        let title = title.to_owned();
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;

            // Deliver only if this wake is still the registered one.
            let still_current = match wake_table.lock() {
                Ok(mut table) => match table.wakes.get(&id) {
                    Some(w) if w.generation == generation => {
                        table.wakes.remove(&id);
                        true
                    }
                    _ => false,
                },
                Err(_) => false,
            };
            if !still_current {
                return;
            }

            let fired = ReminderFired {
                task_id: id,
                title,
                fire_at,
                fired_at: now_epoch_millis(),
            };
            if fired_tx.send(fired).is_err() {
                debug!(task_id = %id, "reminder receiver dropped");
            }
        });

        if let Some(previous) = table.wakes.insert(
            id,
            PendingWake {
                generation,
                fire_at,
                join,
            },
        ) {
            previous.join.abort();
        }
        debug!(task_id = %id, fire_at, "reminder armed");
        Ok(())
    }
}

impl ReminderScheduler for TokioReminderScheduler {
    fn schedule(&self, id: TaskId, title: &str, fire_at: i64) -> Result<(), ReminderError> {
        self.arm(id, title, fire_at)
    }

    // Tokio timers carry no precision guarantee of their own, so both paths
    // arm the same kind of wake.
    fn schedule_approximate(&self, id: TaskId, title: &str, fire_at: i64) -> Result<(), ReminderError> {
        self.arm(id, title, fire_at)
    }

    fn cancel(&self, id: TaskId) -> Result<(), ReminderError> {
        if let Some(wake) = self.lock()?.wakes.remove(&id) {
            wake.join.abort();
            debug!(task_id = %id, "reminder cancelled");
        }
        Ok(())
    }
}

impl Drop for TokioReminderScheduler {
    fn drop(&mut self) {
        if let Ok(mut table) = self.table.lock() {
            for (_, wake) in table.wakes.drain() {
                wake.join.abort();
            }
        }
    }
}
