//! Serialized mutation worker for the task store and reminder scheduler.
//!
//! Every state-changing request (add, update, delete, toggle completion,
//! select day) travels over one mpsc channel to a single
//! [`MutationCoordinator`]. The worker handles one request at a time:
//!
//! 1. write to the [`TaskStore`],
//! 2. sync the [`ReminderScheduler`],
//! 3. re-read and reproject both views,
//! 4. publish the new [`ViewSnapshot`],
//!
//! and only then receives the next request. Store and scheduler calls run on
//! the blocking pool, never concurrently with another mutation. Requests are
//! not fair across callers, but each one is atomic with respect to the rest.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::calendar::{self, now_epoch_millis};
use crate::config::CoordinatorConfig;
use crate::error::{PlannerError, Result};
use crate::reminder::{self, ReminderScheduler, ReminderSync};
use crate::store::TaskStore;
use crate::task::{self, NewTask, Task, TaskId};
use crate::view::{DayAgendaView, TaskViewProjector, TimelineView};

/// Source of "now" for scheduling decisions and relative labels.
pub trait Clock: Send + Sync + 'static {
    /// Current time in epoch milliseconds.
    fn now_millis(&self) -> i64;
}

/// Wall-clock [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        now_epoch_millis()
    }
}

/// A state-changing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    Add { task: NewTask },
    Update { task: Task },
    Delete { id: TaskId },
    ToggleCompletion { id: TaskId, completed: bool },
    SetSelectedDay { day: NaiveDate },
}

impl Mutation {
    fn kind(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::ToggleCompletion { .. } => "toggle_completion",
            Self::SetSelectedDay { .. } => "set_selected_day",
        }
    }

    /// Boundary validation, applied before the request is queued.
    fn validated(self) -> Result<Self> {
        match self {
            Self::Add { task } => Ok(Self::Add {
                task: task.validate()?,
            }),
            Self::Update { task } => Ok(Self::Update {
                task: task::validate_update(task)?,
            }),
            other => Ok(other),
        }
    }
}

/// Result of a completed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    /// Task the mutation touched; the new id for an add.
    pub task_id: Option<TaskId>,
    /// Scheduler side of the mutation. Never a reason for failure.
    pub reminder: ReminderSync,
    /// Version of the snapshot published by this mutation.
    pub version: u64,
}

/// Point-in-time consistent pair of views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    /// Increases by one per published snapshot.
    pub version: u64,
    pub selected_day: NaiveDate,
    pub agenda: DayAgendaView,
    pub timeline: TimelineView,
}

/// Notifications broadcast by the coordinator.
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    /// A mutation finished and a fresh snapshot was published.
    ViewsUpdated(Arc<ViewSnapshot>),
    /// A scheduler call failed; the store change stands.
    ReminderDegraded { task_id: TaskId, reason: String },
}

struct MutationRequest {
    mutation: Mutation,
    response_tx: oneshot::Sender<Result<MutationOutcome>>,
}

/// Cloneable handle for submitting mutations and observing views.
#[derive(Clone)]
pub struct TaskClient {
    request_tx: mpsc::Sender<MutationRequest>,
    event_tx: broadcast::Sender<CoordinatorEvent>,
    views_rx: watch::Receiver<Arc<ViewSnapshot>>,
}

impl TaskClient {
    /// Validate and submit a mutation, waiting until it is applied and
    /// published (or has failed).
    pub async fn submit(&self, mutation: Mutation) -> Result<MutationOutcome> {
        let mutation = mutation.validated()?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(MutationRequest {
                mutation,
                response_tx,
            })
            .await
            .map_err(|e| PlannerError::Channel(format!("coordinator stopped: {e}")))?;

        response_rx
            .await
            .map_err(|e| PlannerError::Channel(format!("mutation response dropped: {e}")))?
    }

    pub async fn add(&self, task: NewTask) -> Result<MutationOutcome> {
        self.submit(Mutation::Add { task }).await
    }

    pub async fn update(&self, task: Task) -> Result<MutationOutcome> {
        self.submit(Mutation::Update { task }).await
    }

    pub async fn delete(&self, id: TaskId) -> Result<MutationOutcome> {
        self.submit(Mutation::Delete { id }).await
    }

    pub async fn toggle_completion(&self, id: TaskId, completed: bool) -> Result<MutationOutcome> {
        self.submit(Mutation::ToggleCompletion { id, completed })
            .await
    }

    pub async fn set_selected_day(&self, day: NaiveDate) -> Result<MutationOutcome> {
        self.submit(Mutation::SetSelectedDay { day }).await
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn views(&self) -> Arc<ViewSnapshot> {
        Arc::clone(&self.views_rx.borrow())
    }

    /// Watch receiver that changes once per published snapshot.
    #[must_use]
    pub fn watch_views(&self) -> watch::Receiver<Arc<ViewSnapshot>> {
        self.views_rx.clone()
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.event_tx.subscribe()
    }
}

/// Single worker owning the store, the scheduler and the published views.
pub struct MutationCoordinator<S: TaskStore, R: ReminderScheduler, C: Clock = SystemClock> {
    store: Arc<S>,
    scheduler: Arc<R>,
    clock: Arc<C>,
    projector: TaskViewProjector,
    selected_day: NaiveDate,
    version: u64,
    rearm_on_start: bool,
    request_rx: mpsc::Receiver<MutationRequest>,
    event_tx: broadcast::Sender<CoordinatorEvent>,
    views_tx: watch::Sender<Arc<ViewSnapshot>>,
}

/// What the blocking half of a mutation hands back to the worker.
struct Applied {
    task_id: Option<TaskId>,
    reminder: ReminderSync,
    selected_day: NaiveDate,
    day_tasks: Vec<Task>,
    upcoming: Vec<Task>,
    now: i64,
}

/// Create a coordinator and its client handle.
///
/// Reads the store once to build the initial (version 0) snapshot for
/// today's date.
///
/// # Errors
///
/// Returns an error if the initial store read fails.
pub fn mutation_channel<S, R, C>(
    config: &CoordinatorConfig,
    projector: TaskViewProjector,
    store: Arc<S>,
    scheduler: Arc<R>,
    clock: Arc<C>,
) -> Result<(TaskClient, MutationCoordinator<S, R, C>)>
where
    S: TaskStore,
    R: ReminderScheduler,
    C: Clock,
{
    let now = clock.now_millis();
    let selected_day = calendar::local_date(now);
    let day_tasks = store.read_by_day(selected_day)?;
    let upcoming = store.read_all_upcoming(now)?;
    let initial = Arc::new(ViewSnapshot {
        version: 0,
        selected_day,
        agenda: projector.project_day(selected_day, day_tasks, now),
        timeline: projector.project_timeline(upcoming),
    });

    let (request_tx, request_rx) = mpsc::channel(config.request_capacity.max(1));
    let (event_tx, _event_rx) = broadcast::channel(config.event_capacity.max(1));
    let (views_tx, views_rx) = watch::channel(initial);

    Ok((
        TaskClient {
            request_tx,
            event_tx: event_tx.clone(),
            views_rx,
        },
        MutationCoordinator {
            store,
            scheduler,
            clock,
            projector,
            selected_day,
            version: 0,
            rearm_on_start: config.rearm_reminders_on_start,
            request_rx,
            event_tx,
            views_tx,
        },
    ))
}

impl<S: TaskStore, R: ReminderScheduler, C: Clock> MutationCoordinator<S, R, C> {
    /// Drain mutation requests until every [`TaskClient`] is dropped.
    pub async fn run(mut self) {
        if self.rearm_on_start {
            match self.rearm_reminders().await {
                Ok(count) => info!(count, "re-armed pending reminders"),
                Err(e) => error!(error = %e, "reminder re-arm failed"),
            }
        }

        info!(selected_day = %self.selected_day, "mutation coordinator started");
        while let Some(request) = self.request_rx.recv().await {
            let result = self.apply(request.mutation).await;
            let _ = request.response_tx.send(result);
        }
        info!("mutation coordinator stopped");
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Re-issue `schedule` for every stored task whose time is still ahead.
    ///
    /// Completed tasks are included; completion never cancels a reminder.
    /// Returns how many wakes the scheduler accepted. Degraded ones are
    /// logged and left out of the count.
    pub async fn rearm_reminders(&self) -> Result<usize> {
        let store = Arc::clone(&self.store);
        let scheduler = Arc::clone(&self.scheduler);
        let clock = Arc::clone(&self.clock);
        run_blocking(move || {
            let now = clock.now_millis();
            let mut count = 0;
            for task in store.read_all_upcoming(now)? {
                if task.scheduled_at <= now {
                    continue;
                }
                match reminder::schedule_best_effort(
                    scheduler.as_ref(),
                    task.id,
                    &task.title,
                    task.scheduled_at,
                ) {
                    ReminderSync::Scheduled | ReminderSync::Approximate => count += 1,
                    ReminderSync::Degraded(reason) => {
                        warn!(task_id = %task.id, %reason, "reminder re-arm degraded");
                    }
                    _ => {}
                }
            }
            Ok(count)
        })
        .await
    }

    /// Apply one mutation end to end and publish the result.
    async fn apply(&mut self, mutation: Mutation) -> Result<MutationOutcome> {
        let kind = mutation.kind();
        debug!(kind, "mutation admitted");

        let store = Arc::clone(&self.store);
        let scheduler = Arc::clone(&self.scheduler);
        let clock = Arc::clone(&self.clock);
        let selected_day = self.selected_day;

        let applied = run_blocking(move || {
            execute(
                store.as_ref(),
                scheduler.as_ref(),
                clock.as_ref(),
                mutation,
                selected_day,
            )
        })
        .await
        .inspect_err(|e| match e {
            PlannerError::NotFound(id) => debug!(kind, task_id = %id, "mutation target missing"),
            other => error!(kind, error = %other, "mutation failed"),
        })?;

        self.selected_day = applied.selected_day;
        self.version += 1;
        let snapshot = Arc::new(ViewSnapshot {
            version: self.version,
            selected_day: applied.selected_day,
            agenda: self
                .projector
                .project_day(applied.selected_day, applied.day_tasks, applied.now),
            timeline: self.projector.project_timeline(applied.upcoming),
        });
        self.views_tx.send_replace(Arc::clone(&snapshot));
        let _ = self
            .event_tx
            .send(CoordinatorEvent::ViewsUpdated(snapshot));

        if let (ReminderSync::Degraded(reason), Some(task_id)) = (&applied.reminder, applied.task_id)
        {
            warn!(kind, task_id = %task_id, %reason, "mutation applied with degraded reminder");
            let _ = self.event_tx.send(CoordinatorEvent::ReminderDegraded {
                task_id,
                reason: reason.clone(),
            });
        }

        debug!(kind, version = self.version, "views published");
        Ok(MutationOutcome {
            task_id: applied.task_id,
            reminder: applied.reminder,
            version: self.version,
        })
    }
}

/// Store write, scheduler sync and the two view reads, on a blocking thread.
fn execute<S, R, C>(
    store: &S,
    scheduler: &R,
    clock: &C,
    mutation: Mutation,
    selected_day: NaiveDate,
) -> Result<Applied>
where
    S: TaskStore + ?Sized,
    R: ReminderScheduler + ?Sized,
    C: Clock + ?Sized,
{
    let mut selected_day = selected_day;
    let (task_id, reminder) = match mutation {
        Mutation::Add { task } => {
            let id = store.create(&task)?;
            let sync = if task.scheduled_at > clock.now_millis() {
                reminder::schedule_best_effort(scheduler, id, &task.title, task.scheduled_at)
            } else {
                ReminderSync::SkippedPast
            };
            (Some(id), sync)
        }
        Mutation::Update { task } => {
            store.update(&task)?;
            let sync =
                reminder::schedule_best_effort(scheduler, task.id, &task.title, task.scheduled_at);
            (Some(task.id), sync)
        }
        Mutation::Delete { id } => {
            if !store.delete(id)? {
                debug!(task_id = %id, "delete of absent task");
            }
            (Some(id), reminder::cancel_best_effort(scheduler, id))
        }
        Mutation::ToggleCompletion { id, completed } => {
            store.set_completed(id, completed)?;
            (Some(id), ReminderSync::Untouched)
        }
        Mutation::SetSelectedDay { day } => {
            selected_day = day;
            (None, ReminderSync::Untouched)
        }
    };

    let now = clock.now_millis();
    let day_tasks = store.read_by_day(selected_day)?;
    let upcoming = store.read_all_upcoming(now)?;

    Ok(Applied {
        task_id,
        reminder,
        selected_day,
        day_tasks,
        upcoming,
        now,
    })
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PlannerError::Channel(format!("mutation worker task failed: {e}")))?
}
