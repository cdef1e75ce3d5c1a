use iland_api::models::event::Event as RemoteEvent;
use iland_api::models::task::Task;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

mod relay;

pub use relay::{relay_events, track_and_announce};

/// Events delivered to local subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ConsoleEvent {
    /// Pushed by the server over the event socket
    Remote(RemoteEvent),
    TaskCompleted {
        task_id: String,
        succeeded: bool,
        task: Task,
    },
    StreamClosed,
}

/// Fan-out of console events to any number of in-process subscribers
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: Arc<broadcast::Sender<ConsoleEvent>>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.sender.subscribe()
    }

    /// Broadcast an event to all subscribers
    ///
    /// # Returns
    /// The number of receivers that received the event
    pub fn broadcast(&self, event: ConsoleEvent) -> usize {
        match self.sender.send(event) {
            Ok(count) => {
                tracing::trace!(target: "console", subscribers = count, "Broadcast event");
                count
            }
            Err(_) => {
                tracing::debug!(target: "console", "No active subscribers, event dropped");
                0
            }
        }
    }

    pub fn remote(&self, event: RemoteEvent) {
        self.broadcast(ConsoleEvent::Remote(event));
    }

    pub fn task_completed(&self, task: Task) {
        self.broadcast(ConsoleEvent::TaskCompleted {
            task_id: task.id.clone(),
            succeeded: task.succeeded(),
            task,
        });
    }

    pub fn stream_closed(&self) {
        self.broadcast(ConsoleEvent::StreamClosed);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iland_api::models::task::TaskStatus;

    #[tokio::test]
    async fn test_event_broadcasting() {
        let broadcaster = EventBroadcaster::new(10);
        let mut receiver = broadcaster.subscribe();

        broadcaster.remote(RemoteEvent {
            id: "e-1".to_string(),
            entity_name: "web-01".to_string(),
            ..RemoteEvent::default()
        });

        match receiver.recv().await.unwrap() {
            ConsoleEvent::Remote(event) => {
                assert_eq!(event.id, "e-1");
                assert_eq!(event.entity_name, "web-01");
            }
            other => panic!("Expected Remote event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn task_completion_reports_outcome() {
        let broadcaster = EventBroadcaster::default();
        let mut receiver = broadcaster.subscribe();

        broadcaster.task_completed(Task {
            id: "t-1".to_string(),
            status: TaskStatus::Error,
            synced: true,
            ..Task::default()
        });

        match receiver.recv().await.unwrap() {
            ConsoleEvent::TaskCompleted {
                task_id, succeeded, ..
            } => {
                assert_eq!(task_id, "t-1");
                assert!(!succeeded);
            }
            other => panic!("Expected TaskCompleted event, got {other:?}"),
        }
    }

    #[test]
    fn broadcast_without_subscribers_is_dropped() {
        let broadcaster = EventBroadcaster::new(4);
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(broadcaster.broadcast(ConsoleEvent::StreamClosed), 0);
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(ConsoleEvent::StreamClosed).unwrap();
        assert_eq!(json, serde_json::json!({"type": "StreamClosed"}));
    }
}
