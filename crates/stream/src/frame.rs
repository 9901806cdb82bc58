use serde_json::Value;

use super::channel::SubscriptionId;

/// Reserved data payload that marks the end of a suggestion.
///
/// Upstream content equal to this literal cannot be told apart from completion.
pub const DONE_SENTINEL: &str = "[DONE]";
/// Event name carrying a server-reported generation failure.
pub const ERROR_EVENT: &str = "error";
/// Event name signalling completion without relying on the sentinel payload.
pub const DONE_EVENT: &str = "done";
/// Default event name for plain data events.
pub const MESSAGE_EVENT: &str = "message";

const FALLBACK_ERROR_MESSAGE: &str = "suggestion generation failed";

/// One undecoded push event as read from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub event: String,
    pub data: String,
}

impl RawEvent {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }

    pub fn message(data: impl Into<String>) -> Self {
        Self::new(MESSAGE_EVENT, data)
    }
}

/// Decoded unit of a push stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Chunk(String),
    Complete,
    /// The server reported a failure for the current suggestion.
    Error(String),
    /// The connection itself failed or ended early.
    TransportFailure(String),
}

impl StreamFrame {
    /// Returns true when no frame can follow this one on the same subscription.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Chunk(_))
    }
}

/// Frame tagged with the subscription instance that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedFrame {
    pub subscription: SubscriptionId,
    pub frame: StreamFrame,
}

impl SequencedFrame {
    pub fn new(subscription: SubscriptionId, frame: StreamFrame) -> Self {
        Self {
            subscription,
            frame,
        }
    }
}

/// Outcome of decoding one raw event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Frame(StreamFrame),
    /// The event does not belong to the plain-text protocol; skip it.
    Malformed { event: String },
}

pub fn decode(raw: &RawEvent) -> Decoded {
    match raw.event.as_str() {
        ERROR_EVENT => Decoded::Frame(StreamFrame::Error(error_message(&raw.data))),
        DONE_EVENT => Decoded::Frame(StreamFrame::Complete),
        "" | MESSAGE_EVENT if raw.data == DONE_SENTINEL => Decoded::Frame(StreamFrame::Complete),
        "" | MESSAGE_EVENT => Decoded::Frame(StreamFrame::Chunk(raw.data.clone())),
        other => Decoded::Malformed {
            event: other.to_string(),
        },
    }
}

fn error_message(data: &str) -> String {
    let trimmed = data.trim();
    if trimmed.is_empty() {
        return FALLBACK_ERROR_MESSAGE.to_string();
    }

    // Some servers wrap the message as `{"message": "..."}`.
    if trimmed.starts_with('{')
        && let Ok(Value::Object(object)) = serde_json::from_str::<Value>(trimmed)
        && let Some(Value::String(message)) = object.get("message")
    {
        return message.clone();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_payload_is_completion_never_a_chunk() {
        assert_eq!(
            decode(&RawEvent::message(DONE_SENTINEL)),
            Decoded::Frame(StreamFrame::Complete)
        );
        assert_eq!(
            decode(&RawEvent::new("", DONE_SENTINEL)),
            Decoded::Frame(StreamFrame::Complete)
        );
    }

    #[test]
    fn sentinel_is_matched_exactly() {
        assert_eq!(
            decode(&RawEvent::message(" [DONE]")),
            Decoded::Frame(StreamFrame::Chunk(" [DONE]".to_string()))
        );
    }

    #[test]
    fn done_event_completes_regardless_of_payload() {
        assert_eq!(
            decode(&RawEvent::new(DONE_EVENT, "")),
            Decoded::Frame(StreamFrame::Complete)
        );
    }

    #[test]
    fn chunks_keep_whitespace_verbatim() {
        assert_eq!(
            decode(&RawEvent::message(" livraison ")),
            Decoded::Frame(StreamFrame::Chunk(" livraison ".to_string()))
        );
    }

    #[test]
    fn error_event_uses_plain_or_wrapped_message() {
        assert_eq!(
            decode(&RawEvent::new(ERROR_EVENT, "quota exceeded")),
            Decoded::Frame(StreamFrame::Error("quota exceeded".to_string()))
        );
        assert_eq!(
            decode(&RawEvent::new(ERROR_EVENT, r#"{"message":"model offline"}"#)),
            Decoded::Frame(StreamFrame::Error("model offline".to_string()))
        );
        assert_eq!(
            decode(&RawEvent::new(ERROR_EVENT, "")),
            Decoded::Frame(StreamFrame::Error(FALLBACK_ERROR_MESSAGE.to_string()))
        );
    }

    #[test]
    fn unknown_event_names_are_malformed() {
        assert_eq!(
            decode(&RawEvent::new("usage", r#"{"tokens":12}"#)),
            Decoded::Malformed {
                event: "usage".to_string()
            }
        );
    }

    #[test]
    fn only_chunks_are_non_terminal() {
        assert!(!StreamFrame::Chunk("a".into()).is_terminal());
        assert!(StreamFrame::Complete.is_terminal());
        assert!(StreamFrame::Error("e".into()).is_terminal());
        assert!(StreamFrame::TransportFailure("t".into()).is_terminal());
    }
}
