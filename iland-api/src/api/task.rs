use crate::client::Client;
use crate::error::{ApiError, ApiResult};
use crate::models::task::Task;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default upper bound on how long [`TaskApi::track_task`] waits
pub const DEFAULT_TRACK_DEADLINE: Duration = Duration::from_secs(60 * 60);

/// How to wait for a task to settle
#[derive(Debug, Clone)]
pub struct TrackOptions {
    /// Pause before each poll
    pub interval: Duration,
    /// Stop after this many polls
    pub max_polls: Option<u32>,
    /// Stop once this much time has passed since tracking began
    pub deadline: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_polls: None,
            deadline: Some(DEFAULT_TRACK_DEADLINE),
            cancel: None,
        }
    }
}

impl TrackOptions {
    /// Poll until the task settles, however long that takes
    pub fn unbounded() -> Self {
        Self {
            deadline: None,
            ..Self::default()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Task API methods
#[async_trait]
pub trait TaskApi {
    /// Get a task snapshot by ID
    async fn get_task(&self, task_id: &str) -> ApiResult<Task>;

    /// Wait for a task to settle using the client's poll interval and the
    /// default deadline
    async fn track_task(&self, task_id: &str) -> ApiResult<Task>;

    /// Wait for a task to settle.
    ///
    /// Returns the first snapshot with `active == false && synced == true`,
    /// whatever its status; callers inspect `status` to detect failure. A
    /// failed poll ends tracking immediately with that error.
    async fn track_task_with(&self, task_id: &str, options: TrackOptions) -> ApiResult<Task>;
}

#[async_trait]
impl TaskApi for Client {
    async fn get_task(&self, task_id: &str) -> ApiResult<Task> {
        self.get_object(&format!("/v1/tasks/{}", urlencoding::encode(task_id)))
            .await
    }

    async fn track_task(&self, task_id: &str) -> ApiResult<Task> {
        let options = TrackOptions::default().with_interval(self.config().poll_interval);
        self.track_task_with(task_id, options).await
    }

    async fn track_task_with(&self, task_id: &str, options: TrackOptions) -> ApiResult<Task> {
        let started = Instant::now();
        let cancel = options.cancel.unwrap_or_else(CancellationToken::new);
        let mut polls: u32 = 0;

        tracing::debug!(target: "api::task", task_id = %task_id, "Tracking task");

        loop {
            if options.max_polls.is_some_and(|max| polls >= max) {
                return Err(ApiError::TrackingTimeout {
                    task_id: task_id.to_string(),
                    polls,
                });
            }

            if let Some(deadline) = options.deadline {
                let remaining = deadline.saturating_sub(started.elapsed());
                if remaining < options.interval {
                    return Err(ApiError::TrackingTimeout {
                        task_id: task_id.to_string(),
                        polls,
                    });
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                _ = tokio::time::sleep(options.interval) => {}
            }

            let task = tokio::select! {
                _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                task = self.get_task(task_id) => task?,
            };
            polls += 1;

            if task.is_terminal() {
                tracing::info!(
                    target: "api::task",
                    task_id = %task_id,
                    status = task.status.as_str(),
                    polls,
                    "Task settled"
                );
                return Ok(task);
            }

            tracing::trace!(
                target: "api::task",
                task_id = %task_id,
                status = task.status.as_str(),
                progress = task.progress,
                "Task still in progress"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_bounded() {
        let options = TrackOptions::default();
        assert_eq!(options.interval, Duration::from_secs(5));
        assert_eq!(options.deadline, Some(DEFAULT_TRACK_DEADLINE));
        assert!(options.max_polls.is_none());
    }

    #[test]
    fn unbounded_opts_out_of_deadline() {
        let options = TrackOptions::unbounded().with_max_polls(3);
        assert!(options.deadline.is_none());
        assert_eq!(options.max_polls, Some(3));
    }
}
