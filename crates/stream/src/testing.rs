//! Scripted in-memory transport for driving the multiplexer from tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use futures::channel::mpsc;

use super::channel::ChannelKey;
use super::error::{TransportError, TransportResult};
use super::frame::{DONE_SENTINEL, ERROR_EVENT, RawEvent};
use super::transport::{RawEventStream, Transport};

type EventSender = mpsc::UnboundedSender<TransportResult<RawEvent>>;

/// Transport whose connections are fed by the test. A connection counts as live until
/// the multiplexer drops its stream.
#[derive(Default)]
pub struct ScriptedTransport {
    state: Mutex<ScriptState>,
}

#[derive(Default)]
struct ScriptState {
    connections: Vec<(ChannelKey, EventSender)>,
    refuse_next: Option<String>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `open` fail with the given reason.
    pub fn refuse_next_open(&self, reason: impl Into<String>) {
        self.lock().refuse_next = Some(reason.into());
    }

    pub fn open_count(&self, key: &ChannelKey) -> usize {
        self.lock()
            .connections
            .iter()
            .filter(|(connection_key, _)| connection_key == key)
            .count()
    }

    pub fn live_connections(&self, key: &ChannelKey) -> usize {
        self.lock()
            .connections
            .iter()
            .filter(|(connection_key, sender)| connection_key == key && !sender.is_closed())
            .count()
    }

    /// Sends an event on the most recent connection for `key`.
    pub fn push(&self, key: &ChannelKey, event: RawEvent) -> bool {
        self.send(key, Ok(event))
    }

    pub fn push_chunk(&self, key: &ChannelKey, text: &str) -> bool {
        self.push(key, RawEvent::message(text))
    }

    pub fn push_done(&self, key: &ChannelKey) -> bool {
        self.push(key, RawEvent::message(DONE_SENTINEL))
    }

    pub fn push_error(&self, key: &ChannelKey, message: &str) -> bool {
        self.push(key, RawEvent::new(ERROR_EVENT, message))
    }

    /// Simulates a dropped connection.
    pub fn fail(&self, key: &ChannelKey, details: &str) -> bool {
        self.send(
            key,
            Err(TransportError::Disconnected {
                stage: "scripted-transport",
                details: details.to_string(),
            }),
        )
    }

    /// Ends the most recent connection for `key` without a terminal event.
    pub fn hang_up(&self, key: &ChannelKey) {
        if let Some((_, sender)) = self
            .lock()
            .connections
            .iter()
            .rev()
            .find(|(connection_key, _)| connection_key == key)
        {
            sender.close_channel();
        }
    }

    fn send(&self, key: &ChannelKey, item: TransportResult<RawEvent>) -> bool {
        let state = self.lock();
        let Some((_, sender)) = state
            .connections
            .iter()
            .rev()
            .find(|(connection_key, _)| connection_key == key)
        else {
            return false;
        };
        sender.unbounded_send(item).is_ok()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, key: &ChannelKey) -> TransportResult<RawEventStream> {
        let mut state = self.lock();
        if let Some(details) = state.refuse_next.take() {
            return Err(TransportError::Disconnected {
                stage: "scripted-open",
                details,
            });
        }

        let (sender, receiver) = mpsc::unbounded();
        state.connections.push((key.clone(), sender));
        Ok(receiver.boxed())
    }
}

/// Lets spawned reader tasks run until they are idle.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
