//! In-process publish/subscribe
//!
//! The bus distributes domain events to any number of subscribers. It is a
//! transport only: nothing is stored, delivery is best-effort, and a
//! subscriber that falls more than `capacity` messages behind loses the
//! oldest ones (it observes `RecvError::Lagged`).
//!
//! ```text
//! Service ──publish──▶ EventBus ──▶ subscriber (workflow supervisor)
//!                               └─▶ subscriber (tests, diagnostics)
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;

/// Errors raised by event bus implementations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventBusError {
    /// The bus has been shut down and accepts no more messages
    #[error("event bus closed")]
    Closed,
}

/// Publish/subscribe abstraction shared by producers and consumers
///
/// `publish` never blocks and never waits for subscribers. The return value
/// is the number of subscribers the message was handed to.
pub trait EventBus<M>: Send + Sync {
    fn publish(&self, message: M) -> Result<usize, EventBusError>;

    fn subscribe(&self) -> broadcast::Receiver<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    fn publish(&self, message: M) -> Result<usize, EventBusError> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> broadcast::Receiver<M> {
        (**self).subscribe()
    }
}

/// Broadcast-channel backed bus
///
/// Publishing with no live subscribers is not an error; the message is
/// simply dropped.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    sender: broadcast::Sender<M>,
}

impl<M: Clone + Send + 'static> InMemoryEventBus<M> {
    /// Default number of messages buffered per subscriber
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates a bus buffering up to `capacity` messages per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<M: Clone + Send + 'static> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl<M: Clone + Send + 'static> EventBus<M> for InMemoryEventBus<M> {
    fn publish(&self, message: M) -> Result<usize, EventBusError> {
        // SendError only means nobody is listening right now
        match self.sender.send(message) {
            Ok(delivered) => Ok(delivered),
            Err(_) => {
                tracing::trace!("event published with no subscribers");
                Ok(0)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<M> {
        self.sender.subscribe()
    }
}
