use crate::models::SubmissionRecord;
use crate::orchestration::progress::RunSummary;
use crate::state_machine::RunState;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Progress events emitted by a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        total_tiles: usize,
        total_batches: usize,
    },
    BatchStarted {
        batch_index: usize,
        batch_size: usize,
    },
    TileProcessed {
        record: SubmissionRecord,
        summary: RunSummary,
    },
    BatchCompleted {
        batch_index: usize,
        batch_summary: RunSummary,
    },
    RunCompleted {
        summary: RunSummary,
    },
    RunAborted {
        reason: String,
        state_before: RunState,
        summary: RunSummary,
    },
}

impl RunEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run.started",
            Self::BatchStarted { .. } => "batch.started",
            Self::TileProcessed { .. } => "tile.processed",
            Self::BatchCompleted { .. } => "batch.completed",
            Self::RunCompleted { .. } => "run.completed",
            Self::RunAborted { .. } => "run.aborted",
        }
    }
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub run_id: Uuid,
    pub event: RunEvent,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// Broadcast publisher for run progress events
#[derive(Debug, Clone)]
pub struct RunEventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

impl RunEventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event for `run_id`.
    pub fn publish(&self, run_id: Uuid, event: RunEvent) {
        let event = PublishedEvent {
            run_id,
            event,
            published_at: chrono::Utc::now(),
        };

        // send() only fails when nobody is subscribed, which is fine for a progress stream
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RunEventPublisher {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let publisher = RunEventPublisher::default();
        assert_eq!(publisher.subscriber_count(), 0);
        publisher.publish(
            Uuid::new_v4(),
            RunEvent::BatchStarted {
                batch_index: 0,
                batch_size: 2,
            },
        );
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let publisher = RunEventPublisher::new(16);
        let mut rx = publisher.subscribe();
        let run_id = Uuid::new_v4();

        publisher.publish(
            run_id,
            RunEvent::RunStarted {
                total_tiles: 3,
                total_batches: 2,
            },
        );
        publisher.publish(
            run_id,
            RunEvent::BatchStarted {
                batch_index: 0,
                batch_size: 2,
            },
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(first.run_id, run_id);
        assert_eq!(first.event.name(), "run.started");
        assert_eq!(rx.recv().await.unwrap().event.name(), "batch.started");
    }
}
