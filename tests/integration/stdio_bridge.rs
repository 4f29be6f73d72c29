//! JSON line protocol end to end over in-memory pipes.

use std::sync::Arc;
use std::time::Duration;

use dayplan::calendar::now_epoch_millis;
use dayplan::config::CoordinatorConfig;
use dayplan::host::contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};
use dayplan::host::stdio::serve;
use dayplan::{
    SqliteTaskStore, SystemClock, TaskClient, TaskViewProjector, TokioReminderScheduler,
    mutation_channel,
};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::helpers::{RecordingScheduler, noon_today, start};

fn line(envelope: &CommandEnvelope) -> String {
    let mut json = serde_json::to_string(envelope).unwrap();
    json.push('\n');
    json
}

fn responses(output: &str) -> Vec<ResponseEnvelope> {
    output
        .lines()
        .filter_map(|l| serde_json::from_str::<ResponseEnvelope>(l).ok())
        .collect()
}

async fn run_script(client: TaskClient, input: String) -> String {
    let (mut input_tx, input_rx) = tokio::io::duplex(64 * 1024);
    let (output_tx, mut output_rx) = tokio::io::duplex(1024 * 1024);

    input_tx.write_all(input.as_bytes()).await.unwrap();
    drop(input_tx);

    serve(client, None, BufReader::new(input_rx), output_tx)
        .await
        .unwrap();

    let mut output = String::new();
    output_rx.read_to_string(&mut output).await.unwrap();
    output
}

#[tokio::test]
async fn scripted_session_gets_one_response_per_command() {
    let store = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
    let scheduler = Arc::new(RecordingScheduler::default());
    let client = start(store, Arc::clone(&scheduler), noon_today());
    let tomorrow_nine = crate::helpers::at(2026, 10, 17, 9, 0);

    let mut input = String::new();
    input.push_str(&line(&CommandEnvelope::new(
        "add-1",
        CommandName::TaskAdd,
        json!({"title": "Pay rent", "scheduled_at": tomorrow_nine, "time_label": "9:00 AM"}),
    )));
    input.push_str("not json\n\n");
    input.push_str(&line(&CommandEnvelope::new(
        "day-1",
        CommandName::DaySelect,
        json!({"day": "2026-10-17"}),
    )));
    input.push_str(&line(&CommandEnvelope::new(
        "toggle-1",
        CommandName::TaskToggle,
        json!({"id": 1, "completed": true}),
    )));
    input.push_str(&line(&CommandEnvelope::new(
        "add-2",
        CommandName::TaskAdd,
        json!({"title": "   ", "scheduled_at": tomorrow_nine}),
    )));
    input.push_str(&line(&CommandEnvelope::new(
        "views-1",
        CommandName::ViewsGet,
        serde_json::Value::Null,
    )));
    input.push_str(&line(&CommandEnvelope::new(
        "stop-1",
        CommandName::RuntimeStop,
        serde_json::Value::Null,
    )));
    input.push_str(&line(&CommandEnvelope::new(
        "after-stop",
        CommandName::ViewsGet,
        serde_json::Value::Null,
    )));

    let output = run_script(client, input).await;
    let responses = responses(&output);
    let ids: Vec<&str> = responses.iter().map(|r| r.request_id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["add-1", "parse-error", "day-1", "toggle-1", "add-2", "views-1", "stop-1"]
    );

    assert!(responses[0].ok);
    assert_eq!(responses[0].payload["task_id"], 1);
    assert_eq!(responses[0].payload["reminder"]["status"], "scheduled");
    assert!(!responses[1].ok);
    assert!(responses[2].ok);
    assert!(responses[3].ok);
    assert!(!responses[4].ok, "blank title is rejected");

    let views = &responses[5].payload;
    assert_eq!(views["selected_day"], "2026-10-17");
    assert_eq!(views["agenda"]["header"], "Tomorrow (1 tasks)");
    assert_eq!(views["agenda"]["items"][0]["task"]["completed"], true);
    assert_eq!(views["timeline"]["items"][0]["highlighted"], true);

    assert_eq!(responses[6].payload["stopping"], true);
    assert_eq!(scheduler.calls().len(), 1);
}

#[tokio::test]
async fn views_updated_events_follow_mutations() {
    let store = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
    let client = start(store, Arc::new(RecordingScheduler::default()), noon_today());

    let (mut input_tx, input_rx) = tokio::io::duplex(64 * 1024);
    let (output_tx, output_rx) = tokio::io::duplex(1024 * 1024);
    let bridge = tokio::spawn(serve(client, None, BufReader::new(input_rx), output_tx));
    let mut lines = BufReader::new(output_rx).lines();

    input_tx
        .write_all(
            line(&CommandEnvelope::new(
                "add-1",
                CommandName::TaskAdd,
                json!({"title": "Stretch", "scheduled_at": crate::helpers::at(2026, 10, 18, 7, 0), "time_label": "7:00 AM"}),
            ))
            .as_bytes(),
        )
        .await
        .unwrap();

    let mut got_response = false;
    let mut got_event = false;
    while !(got_response && got_event) {
        let next = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Ok(event) = serde_json::from_str::<EventEnvelope>(&next) {
            assert_eq!(event.event, "views.updated");
            assert_eq!(event.payload["version"], 1);
            got_event = true;
        } else {
            let response: ResponseEnvelope = serde_json::from_str(&next).unwrap();
            assert_eq!(response.request_id, "add-1");
            got_response = true;
        }
    }

    drop(input_tx);
    bridge.await.unwrap().unwrap();
}

#[tokio::test]
async fn fired_reminders_are_forwarded_as_events() {
    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let scheduler = Arc::new(TokioReminderScheduler::new(fired_tx).unwrap());
    let (client, coordinator) = mutation_channel(
        &CoordinatorConfig::default(),
        TaskViewProjector::default(),
        Arc::new(SqliteTaskStore::open_in_memory().unwrap()),
        scheduler,
        Arc::new(SystemClock),
    )
    .unwrap();
    coordinator.spawn();

    let (mut input_tx, input_rx) = tokio::io::duplex(64 * 1024);
    let (output_tx, output_rx) = tokio::io::duplex(1024 * 1024);
    let bridge = tokio::spawn(serve(
        client,
        Some(fired_rx),
        BufReader::new(input_rx),
        output_tx,
    ));
    let mut lines = BufReader::new(output_rx).lines();

    input_tx
        .write_all(
            line(&CommandEnvelope::new(
                "add-1",
                CommandName::TaskAdd,
                json!({"title": "Stand up", "scheduled_at": now_epoch_millis() + 100, "time_label": "now"}),
            ))
            .as_bytes(),
        )
        .await
        .unwrap();

    let fired = loop {
        let next = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Ok(event) = serde_json::from_str::<EventEnvelope>(&next) {
            if event.event == "reminder.fired" {
                break event;
            }
        }
    };
    assert_eq!(fired.payload["heading"], "Time for your task!");
    assert_eq!(fired.payload["body"], "Stand up");
    assert_eq!(fired.payload["task_id"], 1);

    drop(input_tx);
    bridge.await.unwrap().unwrap();
}
