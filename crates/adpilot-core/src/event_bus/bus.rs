use super::types::WorkflowEvent;
use tokio::sync::broadcast;

/// Fan-out of [`WorkflowEvent`]s to any number of subscribers.
///
/// A subscriber that falls more than `capacity` events behind gets
/// `RecvError::Lagged`; publishing never waits on subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns how many subscribers got it.
    pub fn publish(&self, event: WorkflowEvent) -> usize {
        // no receivers is not an error
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
