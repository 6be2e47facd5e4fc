//! Background jobs: recurring-task generation and pending-task reminders.
//!
//! Each pass is a plain function over the store so tests can drive it
//! directly; the job loops only tick a tokio interval, run the pass, and log.
//! Passes do full table scans with no pagination and no mutual exclusion
//! against concurrent API mutations — accepted limitations of the design.

use std::sync::Arc;

use anyhow::Result;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::notify::Notifier;
use crate::tasks::model::TaskStatus;
use crate::tasks::store::{TaskInsert, TaskStore};

/// Spawn one clone per recurring task and reset the original to TODO.
///
/// The clone copies title/description/priority only — fresh TODO status, no
/// dependencies, assignee, resources, or recurrence rule. There is no
/// duplicate prevention: every pass over a still-recurring task spawns
/// another clone, and the template's status reset happens even when it is
/// already DONE (see DESIGN.md).
pub async fn recurrence_pass(store: &TaskStore, clock: &dyn Clock) -> Result<usize> {
    let now = clock.now().to_rfc3339();
    let mut spawned = 0usize;

    for task in store.list_all_tasks().await? {
        if !task.is_recurring() {
            continue;
        }
        store
            .insert_task(
                &TaskInsert {
                    title: task.title.clone(),
                    description: task.description.clone(),
                    priority: task.priority.clone(),
                    status: TaskStatus::Todo.as_str().to_string(),
                    ..TaskInsert::default()
                },
                &now,
            )
            .await?;
        store
            .set_status(&task.id, TaskStatus::Todo.as_str(), &now)
            .await?;
        spawned += 1;
    }

    Ok(spawned)
}

/// Send a reminder to the assignee of every TODO task.
///
/// Not idempotent: each pass re-sends for every still-pending assigned task.
pub async fn reminder_pass(store: &TaskStore, notifier: &Notifier) -> Result<usize> {
    let mut sent = 0usize;

    for task in store.list_all_tasks().await? {
        if TaskStatus::parse(&task.status) != TaskStatus::Todo {
            continue;
        }
        let Some(assignee) = task.assigned_user_id.as_deref() else {
            continue;
        };
        notifier
            .send(
                assignee,
                &format!("Reminder: Task '{}' is pending.", task.title),
            )
            .await;
        sent += 1;
    }

    Ok(sent)
}

/// Recurring-task generator loop. Call from `tokio::spawn` during startup.
pub async fn run_recurrence_job(store: Arc<TaskStore>, clock: Arc<dyn Clock>, interval_secs: u64) {
    info!(interval_secs, "recurrence job started");
    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.tick().await; // first tick fires immediately — skip it
    loop {
        ticker.tick().await;
        match recurrence_pass(&store, clock.as_ref()).await {
            Ok(n) if n > 0 => info!(spawned = n, "recurrence pass spawned tasks"),
            Ok(_) => {}
            Err(e) => warn!(err = %e, "recurrence pass error"),
        }
    }
}

/// Pending-task reminder loop. Call from `tokio::spawn` during startup.
pub async fn run_reminder_job(store: Arc<TaskStore>, notifier: Arc<Notifier>, interval_secs: u64) {
    info!(interval_secs, "reminder job started");
    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match reminder_pass(&store, &notifier).await {
            Ok(n) if n > 0 => info!(sent = n, "reminder pass sent notifications"),
            Ok(_) => {}
            Err(e) => warn!(err = %e, "reminder pass error"),
        }
    }
}
