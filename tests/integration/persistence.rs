//! On-disk persistence and reminder re-arming across restarts.

use std::sync::Arc;

use dayplan::config::{CoordinatorConfig, PlannerConfig};
use dayplan::{NewTask, SqliteTaskStore, TaskId, TaskStore, TaskViewProjector, mutation_channel};

use crate::helpers::{Call, FixedClock, RecordingScheduler, at, noon_today, start};

#[tokio::test]
async fn tasks_survive_a_restart_and_ids_are_not_reused() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("tasks.db");

    let (first, second) = {
        let store = Arc::new(SqliteTaskStore::open(&db).unwrap());
        let client = start(store, Arc::new(RecordingScheduler::default()), noon_today());
        let first = client
            .add(NewTask::new("first", at(2026, 10, 20, 9, 0), "9:00 AM"))
            .await
            .unwrap()
            .task_id
            .unwrap();
        let second = client
            .add(NewTask::new("second", at(2026, 10, 21, 9, 0), "9:00 AM"))
            .await
            .unwrap()
            .task_id
            .unwrap();
        client.delete(second).await.unwrap();
        (first, second)
    };

    let store = Arc::new(SqliteTaskStore::open(&db).unwrap());
    assert!(!store.is_fresh());
    let all = store.read_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, first);

    let client = start(store, Arc::new(RecordingScheduler::default()), noon_today());
    let third = client
        .add(NewTask::new("third", at(2026, 10, 22, 9, 0), "9:00 AM"))
        .await
        .unwrap()
        .task_id
        .unwrap();
    assert!(third > second, "deleted ids are never handed out again");
    assert_eq!(client.views().timeline.items.len(), 2);
}

#[tokio::test]
async fn restart_rearms_future_reminders_before_first_request() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteTaskStore::open(&dir.path().join("tasks.db")).unwrap());
    let future = store
        .create(&NewTask::new("future", at(2026, 10, 17, 9, 0), "9:00 AM"))
        .unwrap();
    store
        .create(&NewTask::new("morning", at(2026, 10, 16, 8, 0), "8:00 AM"))
        .unwrap();
    store
        .create(&NewTask::new("last week", at(2026, 10, 9, 8, 0), "8:00 AM"))
        .unwrap();

    let scheduler = Arc::new(RecordingScheduler::default());
    let (client, coordinator) = mutation_channel(
        &CoordinatorConfig::default(),
        TaskViewProjector::default(),
        store,
        Arc::clone(&scheduler),
        Arc::new(FixedClock::new(noon_today())),
    )
    .unwrap();
    coordinator.spawn();

    client.delete(TaskId(999)).await.unwrap();
    assert_eq!(
        scheduler.calls(),
        vec![
            Call::Schedule {
                id: future,
                title: "future".to_owned(),
                fire_at: at(2026, 10, 17, 9, 0)
            },
            Call::Cancel(TaskId(999)),
        ]
    );
}

#[tokio::test]
async fn initial_snapshot_reflects_existing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteTaskStore::open(&dir.path().join("tasks.db")).unwrap());
    store
        .create(&NewTask::new("today", at(2026, 10, 16, 17, 0), "5:00 PM"))
        .unwrap();

    let client = start(store, Arc::new(RecordingScheduler::default()), noon_today());
    let views = client.views();
    assert_eq!(views.version, 0);
    assert_eq!(views.agenda.header, "Today (1 tasks)");
    assert_eq!(views.agenda.items[0].label, "Today, 5:00 PM");
    assert_eq!(views.timeline.items.len(), 1);
}

#[test]
fn configured_paths_and_seed_flag_drive_store_setup() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    let mut config = PlannerConfig::default();
    config.store.db_path = Some(dir.path().join("data").join("tasks.db"));
    config.store.seed_sample_task = true;
    config.save_to_file(&config_path).unwrap();

    let loaded = PlannerConfig::load_or_default(&config_path).unwrap();
    let db_path = loaded.store.resolved_db_path();
    assert_eq!(db_path, dir.path().join("data").join("tasks.db"));

    let store = SqliteTaskStore::open(&db_path).unwrap();
    let seeded = store.seed_sample_task(noon_today()).unwrap().unwrap();
    let sample = store.get(seeded).unwrap().unwrap();
    assert_eq!(sample.title, "Sample Task 1");
    assert_eq!(sample.time_label, "10:00 AM");
    drop(store);

    let reopened = SqliteTaskStore::open(&db_path).unwrap();
    assert_eq!(reopened.seed_sample_task(noon_today()).unwrap(), None);
    assert_eq!(reopened.read_all().unwrap().len(), 1);
}
