use crate::PipelineEvent;

use tokio::sync::mpsc;
use tracing::debug;

/// Capacity of the event queue. Posting applies backpressure instead of
/// dropping events when the consumer lags.
pub(crate) const EVENT_QUEUE_CAPACITY: usize = 64;

/// Producer half of the pipeline's single-consumer event channel.
///
/// Multiple producers may post concurrently; delivery preserves each
/// producer's submission order and the channel serializes delivery to one
/// consumer. An event posted after the consumer is gone is discarded
/// silently: the caller has torn down, so there is nobody left to tell.
#[derive(Clone)]
pub(crate) struct CallbackChannel {
    tx: mpsc::Sender<PipelineEvent>,
}

impl CallbackChannel {
    pub(crate) fn new() -> (Self, PipelineEvents) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        (Self { tx }, PipelineEvents { rx })
    }

    /// Enqueue an event from async context.
    pub(crate) async fn post(&self, event: PipelineEvent) {
        if self.tx.send(event).await.is_err() {
            debug!("Event consumer gone, discarding event");
        }
    }

    /// Enqueue an event from a blocking worker thread.
    pub(crate) fn post_blocking(&self, event: PipelineEvent) {
        if self.tx.blocking_send(event).is_err() {
            debug!("Event consumer gone, discarding event");
        }
    }
}

/// Consumer half of the pipeline's event channel, handed to the caller at
/// pipeline construction.
#[derive(Debug)]
pub struct PipelineEvents {
    rx: mpsc::Receiver<PipelineEvent>,
}

impl PipelineEvents {
    /// Receive the next event. `None` once the pipeline has been dropped
    /// and the queue is drained.
    pub async fn recv(&mut self) -> Option<PipelineEvent> {
        self.rx.recv().await
    }

    /// Blocking receive for synchronous consumers. Must not be called
    /// from async context.
    pub fn blocking_recv(&mut self) -> Option<PipelineEvent> {
        self.rx.blocking_recv()
    }
}
