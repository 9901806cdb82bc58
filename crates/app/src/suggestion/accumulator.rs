use souffle_stream::{SequencedFrame, StreamFrame, SubscriptionId};

/// Folds the frames of suggestion subscriptions into one growing text.
///
/// The state is a plain value threaded through [`apply`](Self::apply); every accepted
/// frame bumps `version`. A new suggestion starts whenever a chunk arrives while
/// nothing is streaming, or when it comes from a different subscription instance
/// than the buffered text. Clearing mid-stream discards the rest of that instance up
/// to and including its terminal frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuggestionAccumulator {
    subscription: Option<SubscriptionId>,
    buffer: String,
    is_streaming: bool,
    error: Option<String>,
    completed: bool,
    discarded: Option<SubscriptionId>,
    version: u64,
}

impl SuggestionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn apply(mut self, sequenced: SequencedFrame) -> Self {
        let SequencedFrame {
            subscription,
            frame,
        } = sequenced;

        if let Some(current) = self.subscription
            && subscription < current
        {
            tracing::trace!(%subscription, %current, "dropping frame from superseded subscription");
            return self;
        }

        if self.discarded == Some(subscription) {
            match frame {
                StreamFrame::Chunk(_) => return self,
                StreamFrame::Complete => {
                    self.discarded = None;
                    self.version += 1;
                    return self;
                }
                // A failure still ends the feed, so it is reported.
                StreamFrame::Error(_) | StreamFrame::TransportFailure(_) => self.discarded = None,
            }
        }

        let same_instance = self.subscription == Some(subscription);
        match frame {
            StreamFrame::Chunk(text) => {
                if !self.is_streaming || !same_instance {
                    self.reset_sequence();
                }
                self.is_streaming = true;
                self.buffer.push_str(&text);
            }
            StreamFrame::Complete => {
                if !same_instance {
                    self.reset_sequence();
                }
                self.is_streaming = false;
                self.completed = true;
            }
            StreamFrame::Error(message) | StreamFrame::TransportFailure(message) => {
                // Uncommitted text is never surfaced as if it were a finished suggestion.
                self.reset_sequence();
                self.is_streaming = false;
                self.error = Some(message);
            }
        }

        self.subscription = Some(subscription);
        self.version += 1;
        self
    }

    /// Drops the current text or error, as the operator's "clear" action does.
    #[must_use]
    pub fn clear(mut self) -> Self {
        if self.is_streaming {
            self.discarded = self.subscription;
        }
        self.reset_sequence();
        self.is_streaming = false;
        self.version += 1;
        self
    }

    fn reset_sequence(&mut self) {
        self.buffer.clear();
        self.error = None;
        self.completed = false;
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    /// True while the rest of a cleared suggestion from `subscription` is being dropped.
    pub fn is_discarding(&self, subscription: SubscriptionId) -> bool {
        self.discarded == Some(subscription)
    }

    /// Nothing streamed, finished or failed yet: the "awaiting input" state.
    pub fn is_idle(&self) -> bool {
        !self.is_streaming && self.buffer.is_empty() && self.error.is_none()
    }

    /// Text revealed so far while a suggestion is still streaming.
    pub fn preview(&self) -> Option<&str> {
        self.is_streaming.then_some(self.buffer.as_str())
    }

    /// The finished suggestion, once completion has been observed.
    pub fn finished_text(&self) -> Option<&str> {
        (self.completed && !self.is_streaming && !self.buffer.is_empty())
            .then_some(self.buffer.as_str())
    }
}
