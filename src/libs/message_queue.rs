use crate::libs::core::models::UserId;
use crate::libs::messenger::Messenger;
use crate::libs::storage::records::{OutboundMessage, QueuedMessage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Ordered, rate-limited buffer between the chat logic and the [`Messenger`].
///
/// Producers append with [`enqueue`](Self::enqueue) from any thread. Once
/// [`start`](Self::start)ed, a background task pops exactly one message per
/// tick (`1 / rate_limit` seconds) and hands it to the messenger. Delivery is
/// at-most-once: failed sends are logged and dropped, and anything still
/// buffered when [`stop`](Self::stop) is called is discarded.
pub struct OutboundQueue {
    messenger: Arc<dyn Messenger>,
    queue: Mutex<VecDeque<QueuedMessage>>,
    rate_limit: u32,
    worker: Mutex<Option<DrainWorker>>,
}

struct DrainWorker {
    cancel: CancellationToken,
    _handle: JoinHandle<()>,
}

impl OutboundQueue {
    pub fn new(messenger: Arc<dyn Messenger>, rate_limit: u32) -> Self {
        Self {
            messenger,
            queue: Mutex::new(VecDeque::new()),
            rate_limit: rate_limit.max(1),
            worker: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.rate_limit
    }

    fn buffer(&self) -> MutexGuard<'_, VecDeque<QueuedMessage>> {
        // the buffer holds plain values, a panicked producer cannot leave it half-written
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue(&self, message: QueuedMessage) {
        self.buffer().push_back(message);
    }

    pub fn enqueue_text(&self, destination: UserId, text: impl Into<String>) {
        self.enqueue(QueuedMessage::text(destination, text));
    }

    pub fn enqueue_photo(
        &self,
        destination: UserId,
        file_ref: impl Into<String>,
        caption: Option<String>,
    ) {
        self.enqueue(QueuedMessage::photo(destination, file_ref, caption));
    }

    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer().is_empty()
    }

    /// Copy of the buffered messages in delivery order.
    pub fn pending(&self) -> Vec<QueuedMessage> {
        self.buffer().iter().cloned().collect()
    }

    /// Pops the head message and sends it. Returns `false` if the queue was empty.
    pub fn send_next(&self) -> bool {
        let Some(queued) = self.buffer().pop_front() else {
            return false;
        };

        let result = match &queued.message {
            OutboundMessage::Text { text } => self.messenger.send_text(queued.destination, text),
            OutboundMessage::Photo { file_ref, caption } => {
                self.messenger
                    .send_photo(queued.destination, file_ref, caption.as_deref())
            }
        };

        if let Err(err) = result {
            warn!(
                message_id = %queued.message_id,
                destination = %queued.destination,
                "Error sending message: {err}"
            );
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Spawns the drain loop on the current tokio runtime. No-op if already running.
    pub fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(self).drain(cancel.clone()));
        *worker = Some(DrainWorker {
            cancel,
            _handle: handle,
        });
    }

    /// Signals the drain loop to exit and discards whatever is still buffered.
    pub fn stop(&self) {
        let Some(worker) = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };
        worker.cancel.cancel();

        let dropped = {
            let mut buffer = self.buffer();
            let dropped = buffer.len();
            buffer.clear();
            dropped
        };
        if dropped > 0 {
            warn!(dropped, "outbound queue stopped with undelivered messages");
        }
    }

    async fn drain(self: Arc<Self>, cancel: CancellationToken) {
        let period = self.period();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("outbound queue started (period={period:?})");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("outbound queue stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if self.send_next() {
                        debug!(remaining = self.len(), "outbound message sent");
                    }
                }
            }
        }
    }
}
