use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::channel::{ChannelKey, SubscriptionId};
use super::error::TransportResult;
use super::frame::{Decoded, SequencedFrame, StreamFrame, decode};
use super::transport::{RawEventStream, Transport};

const ENDED_EARLY_MESSAGE: &str = "stream ended before a terminal event";

/// Owns every live push connection, at most one per [`ChannelKey`].
///
/// Each subscription gets a reader task that decodes raw events and hands frames to
/// its listener in transport order. Cloning shares the same connection table.
#[derive(Clone)]
pub struct StreamMultiplexer {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    runtime: Handle,
    channels: Mutex<HashMap<ChannelKey, LiveChannel>>,
    next_subscription: AtomicU64,
}

struct LiveChannel {
    id: SubscriptionId,
    alive: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl LiveChannel {
    /// Stops delivery and drops the reader, which releases the connection.
    fn close(self) {
        self.alive.store(false, Ordering::SeqCst);
        self.reader.abort();
    }
}

impl StreamMultiplexer {
    /// Creates a multiplexer on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_runtime(transport, Handle::current())
    }

    pub fn with_runtime(transport: Arc<dyn Transport>, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                runtime,
                channels: Mutex::new(HashMap::new()),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    /// Opens a channel for `key`, closing the one already live for it first.
    ///
    /// The listener sees frames in transport order and nothing after the first terminal
    /// frame. Transport failures, including a failure to open, arrive as one
    /// [`StreamFrame::TransportFailure`].
    pub fn subscribe<F>(&self, key: ChannelKey, listener: F) -> Subscription
    where
        F: FnMut(SequencedFrame) + Send + 'static,
    {
        let id = SubscriptionId::new(self.inner.next_subscription.fetch_add(1, Ordering::SeqCst));
        let alive = Arc::new(AtomicBool::new(true));

        let mut channels = self.inner.channels();
        if let Some(previous) = channels.remove(&key) {
            tracing::debug!(channel = %key, replaced = %previous.id, subscription = %id, "replacing live channel");
            previous.close();
        }

        let opened = self.inner.transport.open(&key);
        let reader = self.inner.runtime.spawn(pump(
            Arc::downgrade(&self.inner),
            key.clone(),
            id,
            Arc::clone(&alive),
            opened,
            listener,
        ));
        channels.insert(key.clone(), LiveChannel { id, alive, reader });
        drop(channels);

        tracing::debug!(channel = %key, subscription = %id, "channel subscribed");
        Subscription {
            id,
            key,
            inner: Arc::downgrade(&self.inner),
            cancelled: false,
        }
    }

    pub fn is_live(&self, key: &ChannelKey) -> bool {
        self.inner.channels().contains_key(key)
    }

    pub fn live_subscription(&self, key: &ChannelKey) -> Option<SubscriptionId> {
        self.inner.channels().get(key).map(|channel| channel.id)
    }

    pub fn live_count(&self) -> usize {
        self.inner.channels().len()
    }

    /// Closes whatever is live for `key`. Returns false when nothing was.
    pub fn close(&self, key: &ChannelKey) -> bool {
        let removed = self.inner.channels().remove(key);
        match removed {
            Some(channel) => {
                tracing::debug!(channel = %key, subscription = %channel.id, "channel closed");
                channel.close();
                true
            }
            None => false,
        }
    }

    pub fn close_all(&self) {
        let drained = self.inner.channels().drain().collect::<Vec<_>>();
        for (key, channel) in drained {
            tracing::debug!(channel = %key, subscription = %channel.id, "channel closed");
            channel.close();
        }
    }
}

impl Inner {
    fn channels(&self) -> MutexGuard<'_, HashMap<ChannelKey, LiveChannel>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes the entry for `key` only if it still belongs to `id`.
    fn take_if_current(&self, key: &ChannelKey, id: SubscriptionId) -> Option<LiveChannel> {
        let mut channels = self.channels();
        match channels.get(key) {
            Some(channel) if channel.id == id => channels.remove(key),
            Some(_) | None => None,
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let channels = self
            .channels
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, channel) in channels.drain() {
            channel.close();
        }
    }
}

/// Handle to one subscription instance. Cancelling is idempotent; dropping cancels.
pub struct Subscription {
    id: SubscriptionId,
    key: ChannelKey,
    inner: Weak<Inner>,
    cancelled: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Closes this instance's connection. A newer subscription on the same key is left
    /// untouched, and repeated calls do nothing.
    pub fn cancel(&mut self) {
        if self.is_cancelled() {
            return;
        }
        self.cancelled = true;

        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        if let Some(channel) = inner.take_if_current(&self.key, self.id) {
            tracing::debug!(channel = %self.key, subscription = %self.id, "subscription cancelled");
            channel.close();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

async fn pump<F>(
    inner: Weak<Inner>,
    key: ChannelKey,
    id: SubscriptionId,
    alive: Arc<AtomicBool>,
    opened: TransportResult<RawEventStream>,
    mut listener: F,
) where
    F: FnMut(SequencedFrame) + Send + 'static,
{
    let mut deliver = |frame: StreamFrame| {
        // A replaced or cancelled instance must stay silent even if the abort has not
        // landed yet.
        if !alive.load(Ordering::SeqCst) {
            return false;
        }
        listener(SequencedFrame::new(id, frame));
        true
    };

    match opened {
        Ok(mut events) => loop {
            let frame = match events.next().await {
                Some(Ok(raw)) => match decode(&raw) {
                    Decoded::Frame(frame) => frame,
                    Decoded::Malformed { event } => {
                        tracing::warn!(channel = %key, subscription = %id, %event, "skipping malformed frame");
                        continue;
                    }
                },
                Some(Err(error)) => {
                    tracing::error!(channel = %key, subscription = %id, %error, "push transport failed");
                    StreamFrame::TransportFailure(error.to_string())
                }
                None => {
                    tracing::error!(channel = %key, subscription = %id, "push transport ended early");
                    StreamFrame::TransportFailure(ENDED_EARLY_MESSAGE.to_string())
                }
            };

            let terminal = frame.is_terminal();
            if !deliver(frame) || terminal {
                // Leaving the loop drops `events`, closing the connection.
                break;
            }
        },
        Err(error) => {
            tracing::error!(channel = %key, subscription = %id, %error, "failed to open push transport");
            deliver(StreamFrame::TransportFailure(error.to_string()));
        }
    }

    alive.store(false, Ordering::SeqCst);
    if let Some(inner) = inner.upgrade()
        && inner.take_if_current(&key, id).is_some()
    {
        tracing::debug!(channel = %key, subscription = %id, "channel finished");
    }
}
