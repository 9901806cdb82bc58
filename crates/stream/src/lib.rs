//! Server-push channels for conversations: one live connection per
//! (conversation, purpose), decoded into chunk / completion / error frames.

pub mod channel;
pub mod error;
pub mod frame;
pub mod multiplexer;
pub mod sse;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use channel::{ChannelKey, Purpose, SubscriptionId};
pub use error::{TransportError, TransportResult};
pub use frame::{
    DONE_EVENT, DONE_SENTINEL, Decoded, ERROR_EVENT, MESSAGE_EVENT, RawEvent, SequencedFrame,
    StreamFrame, decode,
};
pub use multiplexer::{StreamMultiplexer, Subscription};
pub use sse::SseTransport;
pub use transport::{RawEventStream, Transport};
