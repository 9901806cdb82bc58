use futures::stream::BoxStream;

use super::channel::ChannelKey;
use super::error::TransportResult;
use super::frame::RawEvent;

/// Ordered raw events of one open connection. Dropping it closes the connection.
pub type RawEventStream = BoxStream<'static, TransportResult<RawEvent>>;

/// Opens server-push connections for channel keys.
///
/// `open` must not block; the connection is established when the returned stream is
/// first polled.
pub trait Transport: Send + Sync {
    fn open(&self, key: &ChannelKey) -> TransportResult<RawEventStream>;
}
