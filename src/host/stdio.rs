//! Newline-delimited JSON bridge between a host shell and the coordinator.
//!
//! Each input line is a [`CommandEnvelope`]; each command gets exactly one
//! [`ResponseEnvelope`] line. Coordinator events and fired reminders are
//! written as [`EventEnvelope`] lines on the same stream, so responses and
//! events may interleave.
//!
//! Stdout carries only the protocol; diagnostics go through `tracing`.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{error, info, warn};

use super::contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope, events};
use crate::coordinator::{CoordinatorEvent, TaskClient};
use crate::error::{PlannerError, Result};
use crate::reminder::ReminderFired;
use crate::task::{NewTask, Task, TaskId};

#[derive(Deserialize)]
struct IdPayload {
    id: TaskId,
}

#[derive(Deserialize)]
struct TogglePayload {
    id: TaskId,
    completed: bool,
}

#[derive(Deserialize)]
struct DayPayload {
    day: NaiveDate,
}

/// Serve the bridge on stdin/stdout until stdin closes or `runtime.stop`.
///
/// # Errors
///
/// Returns an error if stdin cannot be read or stdout cannot be written.
pub async fn run_stdio_bridge(
    client: TaskClient,
    fired_rx: Option<mpsc::UnboundedReceiver<ReminderFired>>,
) -> Result<()> {
    serve(
        client,
        fired_rx,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Serve the bridge over arbitrary line-oriented I/O.
///
/// Runs a reader loop on the current task plus two forwarders (coordinator
/// events, fired reminders) that share the writer. Returns once the reader
/// sees EOF or `runtime.stop`; the forwarders are stopped then.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub async fn serve<R, W>(
    client: TaskClient,
    fired_rx: Option<mpsc::UnboundedReceiver<ReminderFired>>,
    reader: R,
    writer: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer = Arc::new(Mutex::new(writer));

    let event_handle = tokio::spawn(forward_events(
        client.subscribe_events(),
        Arc::clone(&writer),
    ));
    let fired_handle = fired_rx.map(|rx| tokio::spawn(forward_fired(rx, Arc::clone(&writer))));

    let result = run_reader(client, reader, writer).await;

    event_handle.abort();
    let _ = event_handle.await;
    if let Some(handle) = fired_handle {
        handle.abort();
        let _ = handle.await;
    }
    result
}

async fn run_reader<R, W>(client: TaskClient, mut reader: R, writer: Arc<Mutex<W>>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| PlannerError::Channel(format!("failed to read command line: {e}")))?;
        if bytes_read == 0 {
            info!("input closed, stopping bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: CommandEnvelope = match serde_json::from_str(trimmed) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, raw_line = %trimmed, "unparseable command envelope");
                let response = ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse command envelope: {e}"),
                );
                write_json(&writer, &response).await?;
                continue;
            }
        };

        let is_stop = envelope.command == CommandName::RuntimeStop;
        let response = dispatch(&client, &envelope).await;
        write_json(&writer, &response).await?;

        if is_stop {
            info!("runtime.stop received, stopping bridge");
            break;
        }
    }
    Ok(())
}

/// Route one command to the client and build its response.
pub async fn dispatch(client: &TaskClient, envelope: &CommandEnvelope) -> ResponseEnvelope {
    if let Err(e) = envelope.validate() {
        return ResponseEnvelope::error(envelope.request_id.clone(), e.to_string());
    }

    match route(client, envelope).await {
        Ok(payload) => ResponseEnvelope::ok(envelope.request_id.clone(), payload),
        Err(e) => {
            warn!(
                command = envelope.command.as_str(),
                request_id = %envelope.request_id,
                error = %e,
                "command failed"
            );
            ResponseEnvelope::error(envelope.request_id.clone(), e.to_string())
        }
    }
}

async fn route(client: &TaskClient, envelope: &CommandEnvelope) -> Result<serde_json::Value> {
    let command = envelope.command;
    let outcome = match command {
        CommandName::TaskAdd => client.add(parse_payload::<NewTask>(envelope)?).await?,
        CommandName::TaskUpdate => client.update(parse_payload::<Task>(envelope)?).await?,
        CommandName::TaskDelete => client.delete(parse_payload::<IdPayload>(envelope)?.id).await?,
        CommandName::TaskToggle => {
            let toggle = parse_payload::<TogglePayload>(envelope)?;
            client.toggle_completion(toggle.id, toggle.completed).await?
        }
        CommandName::DaySelect => {
            client
                .set_selected_day(parse_payload::<DayPayload>(envelope)?.day)
                .await?
        }
        CommandName::ViewsGet => return to_value(&*client.views()),
        CommandName::RuntimeStop => return Ok(serde_json::json!({ "stopping": true })),
    };
    to_value(&outcome)
}

fn parse_payload<T: serde::de::DeserializeOwned>(envelope: &CommandEnvelope) -> Result<T> {
    T::deserialize(&envelope.payload).map_err(|e| {
        PlannerError::Validation(format!(
            "invalid {} payload: {e}",
            envelope.command.as_str()
        ))
    })
}

fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| PlannerError::Channel(format!("failed to serialize response: {e}")))
}

/// Event envelope for a coordinator event.
fn coordinator_event_envelope(event: &CoordinatorEvent) -> Result<EventEnvelope> {
    match event {
        CoordinatorEvent::ViewsUpdated(snapshot) => Ok(EventEnvelope::new(
            events::VIEWS_UPDATED,
            to_value(&**snapshot)?,
        )),
        CoordinatorEvent::ReminderDegraded { task_id, reason } => Ok(EventEnvelope::new(
            events::REMINDER_DEGRADED,
            serde_json::json!({ "task_id": task_id, "reason": reason }),
        )),
    }
}

fn fired_event_envelope(fired: &ReminderFired) -> EventEnvelope {
    EventEnvelope::new(
        events::REMINDER_FIRED,
        serde_json::json!({
            "task_id": fired.task_id,
            "heading": fired.heading(),
            "body": fired.body(),
            "fire_at": fired.fire_at,
            "fired_at": fired.fired_at,
        }),
    )
}

async fn forward_events<W>(mut event_rx: broadcast::Receiver<CoordinatorEvent>, writer: Arc<Mutex<W>>)
where
    W: AsyncWrite + Unpin,
{
    loop {
        match event_rx.recv().await {
            Ok(event) => {
                let envelope = match coordinator_event_envelope(&event) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        error!(error = %e, "failed to encode coordinator event, skipping");
                        continue;
                    }
                };
                if let Err(e) = write_json(&writer, &envelope).await {
                    warn!(error = %e, "event write failed, stopping event forwarder");
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(lagged = n, "event forwarder lagged, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn forward_fired<W>(mut fired_rx: mpsc::UnboundedReceiver<ReminderFired>, writer: Arc<Mutex<W>>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(fired) = fired_rx.recv().await {
        info!(task_id = %fired.task_id, fire_at = fired.fire_at, "reminder fired");
        if let Err(e) = write_json(&writer, &fired_event_envelope(&fired)).await {
            warn!(error = %e, "reminder write failed, stopping reminder forwarder");
            break;
        }
    }
}

/// Write one JSON line and flush.
async fn write_json<W, T>(writer: &Mutex<W>, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let mut json = serde_json::to_string(value)
        .map_err(|e| PlannerError::Channel(format!("failed to serialize envelope: {e}")))?;
    json.push('\n');

    let mut w = writer.lock().await;
    w.write_all(json.as_bytes())
        .await
        .map_err(|e| PlannerError::Channel(format!("failed to write envelope: {e}")))?;
    w.flush()
        .await
        .map_err(|e| PlannerError::Channel(format!("failed to flush output: {e}")))?;
    Ok(())
}
