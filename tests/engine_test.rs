//! Lifecycle engine integration tests: timer state machine, dependency
//! resolution, completion fan-out, and full-replace updates, all against a
//! temp-dir SQLite database with a manual clock.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use taskd::clock::ManualClock;
use taskd::config::DaemonConfig;
use taskd::error::Error;
use taskd::storage::Storage;
use taskd::tasks::engine::{NewTask, TaskUpdate};
use taskd::tasks::{Priority, TaskStatus};
use taskd::AppContext;
use tempfile::TempDir;

async fn make_ctx(dir: &TempDir) -> (AppContext, Arc<ManualClock>) {
    let mut config = DaemonConfig::default();
    config.data_dir = dir.path().to_path_buf();
    config.scheduler.disabled = true;
    let storage = Arc::new(Storage::new(dir.path()).await.unwrap());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap(),
    ));
    let ctx = AppContext::with_storage(config, storage, clock.clone());
    (ctx, clock)
}

fn new_task(title: &str) -> NewTask {
    serde_json::from_value(serde_json::json!({
        "title": title,
        "priority": "HIGH",
    }))
    .unwrap()
}

fn update_for(task: &taskd::tasks::Task, status: TaskStatus) -> TaskUpdate {
    serde_json::from_value(serde_json::json!({
        "title": task.title,
        "description": task.description,
        "priority": "HIGH",
        "status": match status {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        },
        "subtaskIds": task.subtask_ids,
        "recurrenceRule": task.recurrence_rule,
        "resourceIds": [],
    }))
    .unwrap()
}

async fn register_user(ctx: &AppContext, name: &str) -> String {
    let user = ctx
        .users
        .register(
            &serde_json::from_value(serde_json::json!({
                "username": name,
                "email": format!("{name}@example.com"),
                "password": "secret",
                "role": "TEAM_MEMBER",
            }))
            .unwrap(),
        )
        .await
        .unwrap();
    user.id
}

#[tokio::test]
async fn timer_scenario_high_priority_90_minutes() {
    let dir = TempDir::new().unwrap();
    let (ctx, clock) = make_ctx(&dir).await;

    let task = ctx.engine.create_task(&new_task("ship it"), &[]).await.unwrap();
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.priority, Priority::High);
    assert!(task.dependency_ids.is_empty());
    assert_eq!(task.time_spent, 0);

    let task = ctx.engine.start_timer(&task.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::InProgress);
    assert!(task.start_time.is_some());

    clock.advance(Duration::minutes(90));
    let task = ctx.engine.stop_timer(&task.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(task.time_spent, 90);
}

#[tokio::test]
async fn start_timer_twice_is_invalid_state() {
    let dir = TempDir::new().unwrap();
    let (ctx, _clock) = make_ctx(&dir).await;

    let task = ctx.engine.create_task(&new_task("t"), &[]).await.unwrap();
    ctx.engine.start_timer(&task.id).await.unwrap();
    let err = ctx.engine.start_timer(&task.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)), "got {err:?}");

    // Still invalid after stop — there is no reset path.
    ctx.engine.stop_timer(&task.id).await.unwrap();
    let err = ctx.engine.start_timer(&task.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn stop_timer_preconditions() {
    let dir = TempDir::new().unwrap();
    let (ctx, _clock) = make_ctx(&dir).await;

    let task = ctx.engine.create_task(&new_task("t"), &[]).await.unwrap();
    let err = ctx.engine.stop_timer(&task.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)), "stop before start");

    ctx.engine.start_timer(&task.id).await.unwrap();
    ctx.engine.stop_timer(&task.id).await.unwrap();
    let err = ctx.engine.stop_timer(&task.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)), "double stop");
}

#[tokio::test]
async fn timer_ops_on_missing_task_are_not_found() {
    let dir = TempDir::new().unwrap();
    let (ctx, _clock) = make_ctx(&dir).await;

    assert!(matches!(
        ctx.engine.start_timer("nope").await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        ctx.engine.stop_timer("nope").await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        ctx.engine.delete_task("nope").await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn missing_dependency_ids_are_silently_dropped() {
    let dir = TempDir::new().unwrap();
    let (ctx, _clock) = make_ctx(&dir).await;

    let t1 = ctx.engine.create_task(&new_task("one"), &[]).await.unwrap();
    let t2 = ctx.engine.create_task(&new_task("two"), &[]).await.unwrap();

    let deps = vec![t1.id.clone(), t2.id.clone(), "no-such-task".to_string()];
    let t3 = ctx.engine.create_task(&new_task("three"), &deps).await.unwrap();

    let mut expected = vec![t1.id, t2.id];
    expected.sort();
    let mut actual = t3.dependency_ids.clone();
    actual.sort();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn stop_timer_notifies_unfinished_dependents_exactly_once() {
    let dir = TempDir::new().unwrap();
    let (ctx, _clock) = make_ctx(&dir).await;

    let alice = register_user(&ctx, "alice").await;
    let bob = register_user(&ctx, "bob").await;

    let dep = ctx.engine.create_task(&new_task("foundation"), &[]).await.unwrap();
    let blocked = ctx
        .engine
        .create_task(&new_task("blocked"), &[dep.id.clone()])
        .await
        .unwrap();
    let finished = ctx
        .engine
        .create_task(&new_task("finished"), &[dep.id.clone()])
        .await
        .unwrap();
    // Unassigned dependent — no notification target.
    ctx.engine
        .create_task(&new_task("orphan"), &[dep.id.clone()])
        .await
        .unwrap();

    ctx.engine.assign_task_to_user(&blocked.id, &alice).await.unwrap();
    ctx.engine.assign_task_to_user(&finished.id, &bob).await.unwrap();
    // Mark bob's dependent DONE so it is excluded from the fan-out.
    ctx.engine
        .update_task(&finished.id, &update_for(&finished, TaskStatus::Done))
        .await
        .unwrap();

    ctx.engine.start_timer(&dep.id).await.unwrap();
    ctx.engine.stop_timer(&dep.id).await.unwrap();

    let alice_inbox = ctx.storage.list_notifications_for_user(&alice).await.unwrap();
    let dependency_msgs: Vec<_> = alice_inbox
        .iter()
        .filter(|n| n.message.starts_with("Dependency"))
        .collect();
    assert_eq!(dependency_msgs.len(), 1);
    assert_eq!(
        dependency_msgs[0].message,
        "Dependency 'foundation' completed for task 'blocked'"
    );

    let bob_inbox = ctx.storage.list_notifications_for_user(&bob).await.unwrap();
    assert!(
        bob_inbox.iter().all(|n| !n.message.starts_with("Dependency")),
        "done dependents must not be notified"
    );
}

#[tokio::test]
async fn update_status_change_notifies_assignee() {
    let dir = TempDir::new().unwrap();
    let (ctx, _clock) = make_ctx(&dir).await;

    let alice = register_user(&ctx, "alice").await;
    let task = ctx.engine.create_task(&new_task("report"), &[]).await.unwrap();
    ctx.engine.assign_task_to_user(&task.id, &alice).await.unwrap();

    let task = ctx.engine.get_task(&task.id).await.unwrap();
    ctx.engine
        .update_task(&task.id, &update_for(&task, TaskStatus::InProgress))
        .await
        .unwrap();
    // Same status again — no second status notification.
    let task = ctx.engine.get_task(&task.id).await.unwrap();
    ctx.engine
        .update_task(&task.id, &update_for(&task, TaskStatus::InProgress))
        .await
        .unwrap();

    let inbox = ctx.storage.list_notifications_for_user(&alice).await.unwrap();
    let status_msgs: Vec<_> = inbox
        .iter()
        .filter(|n| n.message.contains("status changed"))
        .collect();
    assert_eq!(status_msgs.len(), 1);
    assert_eq!(
        status_msgs[0].message,
        "Your task 'report' status changed to IN_PROGRESS"
    );
}

#[tokio::test]
async fn update_replaces_subtasks_and_deletes_orphans() {
    let dir = TempDir::new().unwrap();
    let (ctx, _clock) = make_ctx(&dir).await;

    let parent = ctx.engine.create_task(&new_task("parent"), &[]).await.unwrap();
    let s1 = ctx.engine.create_task(&new_task("s1"), &[]).await.unwrap();
    let s2 = ctx.engine.create_task(&new_task("s2"), &[]).await.unwrap();

    let mut update = update_for(&parent, TaskStatus::Todo);
    update.subtask_ids = vec![s1.id.clone(), s2.id.clone()];
    let parent_view = ctx.engine.update_task(&parent.id, &update).await.unwrap();
    assert_eq!(parent_view.subtask_ids.len(), 2);

    // Drop s2 from the set — it is deleted, not just detached.
    let mut update = update_for(&parent_view, TaskStatus::Todo);
    update.subtask_ids = vec![s1.id.clone()];
    let parent_view = ctx.engine.update_task(&parent.id, &update).await.unwrap();
    assert_eq!(parent_view.subtask_ids, vec![s1.id.clone()]);
    assert!(matches!(
        ctx.engine.get_task(&s2.id).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn delete_cascades_to_subtasks() {
    let dir = TempDir::new().unwrap();
    let (ctx, _clock) = make_ctx(&dir).await;

    let parent = ctx.engine.create_task(&new_task("parent"), &[]).await.unwrap();
    let child = ctx
        .engine
        .create_task(
            &serde_json::from_value(serde_json::json!({
                "title": "child",
                "priority": "LOW",
                "parentTaskId": parent.id,
            }))
            .unwrap(),
            &[],
        )
        .await
        .unwrap();

    ctx.engine.delete_task(&parent.id).await.unwrap();
    assert!(matches!(
        ctx.engine.get_task(&child.id).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn assignment_notifies_and_validates_both_sides() {
    let dir = TempDir::new().unwrap();
    let (ctx, _clock) = make_ctx(&dir).await;

    let alice = register_user(&ctx, "alice").await;
    let task = ctx.engine.create_task(&new_task("chore"), &[]).await.unwrap();

    let mut events = ctx.broadcaster.subscribe();
    let assigned = ctx.engine.assign_task_to_user(&task.id, &alice).await.unwrap();
    assert_eq!(assigned.assigned_user_id.as_deref(), Some(alice.as_str()));

    let inbox = ctx.storage.list_notifications_for_user(&alice).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].message, "Task 'chore' has been assigned to you.");

    // The notification is also broadcast to in-process subscribers.
    let event: serde_json::Value = serde_json::from_str(&events.recv().await.unwrap()).unwrap();
    assert_eq!(event["event"], "notification.created");
    assert_eq!(event["params"]["userId"], serde_json::json!(alice));

    assert!(matches!(
        ctx.engine.assign_task_to_user(&task.id, "ghost").await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        ctx.engine.assign_task_to_user("ghost", &alice).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn resource_assignment_drops_unknown_ids() {
    let dir = TempDir::new().unwrap();
    let (ctx, _clock) = make_ctx(&dir).await;

    let printer = ctx
        .storage
        .create_resource("printer", Some("equipment"))
        .await
        .unwrap();
    let task = ctx.engine.create_task(&new_task("print"), &[]).await.unwrap();

    let task = ctx
        .engine
        .assign_resources(&task.id, &[printer.id.clone(), "bogus".to_string()])
        .await
        .unwrap();
    assert_eq!(task.resources.len(), 1);
    assert_eq!(task.resources[0].id, printer.id);
}

#[tokio::test]
async fn paged_listing_reports_totals() {
    let dir = TempDir::new().unwrap();
    let (ctx, _clock) = make_ctx(&dir).await;

    for i in 0..5 {
        ctx.engine
            .create_task(&new_task(&format!("t{i}")), &[])
            .await
            .unwrap();
    }

    let (page0, total) = ctx.engine.list_tasks(0, 2).await.unwrap();
    assert_eq!(page0.len(), 2);
    assert_eq!(total, 5);
    let (page2, _) = ctx.engine.list_tasks(2, 2).await.unwrap();
    assert_eq!(page2.len(), 1);
}
