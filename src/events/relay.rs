use super::EventBroadcaster;
use anyhow::{Context, Result};
use iland_api::api::{TaskApi, TrackOptions};
use iland_api::models::task::Task;
use iland_api::EventStream;
use tokio_util::sync::CancellationToken;

/// Pump remote events into the broadcaster until the stream ends or `cancel`
/// fires. Subscribers always see a final `StreamClosed`.
///
/// Returns the number of events relayed.
pub async fn relay_events(
    mut stream: EventStream,
    broadcaster: EventBroadcaster,
    cancel: CancellationToken,
) -> usize {
    tracing::info!(target: "console", "Relaying remote events");
    let mut relayed = 0;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                stream.close();
                break;
            }
            event = stream.next_event() => event,
        };

        let Some(event) = event else {
            tracing::warn!(target: "console", "Event stream ended");
            break;
        };

        tracing::debug!(
            target: "console",
            event_id = %event.id,
            kind = %event.kind,
            entity = %event.entity_name,
            "Remote event"
        );
        broadcaster.remote(event);
        relayed += 1;
    }

    broadcaster.stream_closed();
    tracing::info!(target: "console", relayed, "Stopped relaying remote events");
    relayed
}

/// Wait for a task to settle and announce it to subscribers
pub async fn track_and_announce<C>(
    client: &C,
    task_id: &str,
    options: TrackOptions,
    broadcaster: &EventBroadcaster,
) -> Result<Task>
where
    C: TaskApi + Sync,
{
    let task = client
        .track_task_with(task_id, options)
        .await
        .with_context(|| format!("Failed to track task {task_id}"))?;

    tracing::info!(
        target: "console",
        task_id = %task_id,
        status = task.status.as_str(),
        "Task settled"
    );
    broadcaster.task_completed(task.clone());
    Ok(task)
}
