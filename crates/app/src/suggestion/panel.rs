use std::mem;

use souffle_gateway::{
    ChatMessage, ConversationGateway, ConversationId, GatewayResult, NewChatMessage,
};
use souffle_stream::{ChannelKey, SequencedFrame, StreamMultiplexer, Subscription, SubscriptionId};
use tokio::sync::mpsc;

use super::accumulator::SuggestionAccumulator;
use super::types::Suggestion;
use crate::ghost::{GhostInput, GhostInputEvent, KeyDownEvent, KeyOutcome};

/// Receiving end of the panel's frame queue. The owner drains it and hands each frame
/// back to [`SuggestionPanel::handle_frame`].
pub type PanelFrames = mpsc::UnboundedReceiver<SequencedFrame>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelView<'a> {
    /// No conversation selected.
    Inactive,
    AwaitingInput,
    Streaming { preview: &'a str },
    Ready { text: &'a str },
    Failed { message: &'a str },
}

/// What a frame changed, for the owner to render or log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelUpdate {
    /// Frame from an instance that is no longer current.
    Stale,
    /// Remainder of a suggestion the operator dismissed while it streamed.
    Discarded,
    Preview(String),
    SuggestionReady(Suggestion),
    /// The server completed without sending any text.
    EmptyCompletion,
    Failed(String),
}

/// Live suggestion feed for one conversation, feeding finished suggestions into the
/// ghost input.
pub struct SuggestionPanel {
    multiplexer: StreamMultiplexer,
    frames: mpsc::UnboundedSender<SequencedFrame>,
    conversation_id: Option<ConversationId>,
    subscription: Option<Subscription>,
    accumulator: SuggestionAccumulator,
    input: GhostInput,
}

impl SuggestionPanel {
    pub fn new(multiplexer: StreamMultiplexer, input: GhostInput) -> (Self, PanelFrames) {
        let (frames, receiver) = mpsc::unbounded_channel();
        let panel = Self {
            multiplexer,
            frames,
            conversation_id: None,
            subscription: None,
            accumulator: SuggestionAccumulator::new(),
            input,
        };
        (panel, receiver)
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation_id.as_ref()
    }

    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.subscription.as_ref().map(Subscription::id)
    }

    pub fn accumulator(&self) -> &SuggestionAccumulator {
        &self.accumulator
    }

    pub fn input(&self) -> &GhostInput {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut GhostInput {
        &mut self.input
    }

    /// Starts following `conversation_id`, dropping whatever the panel showed before.
    pub fn activate(&mut self, conversation_id: ConversationId) {
        self.deactivate();
        self.reset_accumulator();
        self.input.clear_variants();

        tracing::debug!(conversation_id = %conversation_id, "suggestion panel activated");
        self.conversation_id = Some(conversation_id);
        self.subscribe();
    }

    pub fn deactivate(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            tracing::debug!(subscription = %subscription.id(), "suggestion panel deactivated");
            subscription.cancel();
        }
        self.conversation_id = None;
    }

    /// Re-subscribes after a failed feed. Does nothing unless the last frame was a failure.
    pub fn retry(&mut self) -> bool {
        if self.conversation_id.is_none() || self.accumulator.error().is_none() {
            return false;
        }
        self.reset_accumulator();
        self.subscribe();
        true
    }

    /// Forgets the current suggestion and variants.
    pub fn clear(&mut self) {
        self.reset_accumulator();
        self.input.clear_variants();
    }

    pub fn view(&self) -> PanelView<'_> {
        if self.conversation_id.is_none() {
            return PanelView::Inactive;
        }
        if let Some(message) = self.accumulator.error() {
            return PanelView::Failed { message };
        }
        if let Some(preview) = self.accumulator.preview() {
            return PanelView::Streaming { preview };
        }
        match self.accumulator.finished_text() {
            Some(text) => PanelView::Ready { text },
            None => PanelView::AwaitingInput,
        }
    }

    pub fn handle_frame(&mut self, frame: SequencedFrame) -> PanelUpdate {
        if self.subscription_id() != Some(frame.subscription) {
            tracing::trace!(subscription = %frame.subscription, "ignoring frame from stale subscription");
            return PanelUpdate::Stale;
        }

        let terminal = frame.frame.is_terminal();
        let discarding = self.accumulator.is_discarding(frame.subscription);
        self.accumulator = mem::take(&mut self.accumulator).apply(frame);

        if discarding && self.accumulator.error().is_none() {
            if terminal {
                self.subscribe();
            }
            return PanelUpdate::Discarded;
        }
        if let Some(message) = self.accumulator.error() {
            tracing::error!(
                conversation_id = ?self.conversation_id.as_ref().map(ConversationId::as_str),
                error = %message,
                "suggestion feed failed"
            );
            return PanelUpdate::Failed(message.to_string());
        }
        if !terminal {
            return PanelUpdate::Preview(self.accumulator.buffer().to_string());
        }

        // Completed: the server will push the next suggestion on a fresh instance.
        self.subscribe();
        match self.accumulator.finished_text() {
            Some(text) => {
                let suggestion = Suggestion::new(text);
                tracing::info!(chars = text.chars().count(), "suggestion ready");
                self.input.set_variants(vec![suggestion.clone()]);
                PanelUpdate::SuggestionReady(suggestion)
            }
            None => PanelUpdate::EmptyCompletion,
        }
    }

    pub fn handle_key(&mut self, event: &KeyDownEvent) -> KeyOutcome {
        let outcome = self.input.handle_key(event);
        if outcome.event() == Some(&GhostInputEvent::Dismissed) {
            self.reset_accumulator();
        }
        outcome
    }

    /// Commits the finished suggestion shown in the panel, its "use" action.
    pub fn use_suggestion(&mut self) -> Option<GhostInputEvent> {
        let suggestion = Suggestion::new(self.accumulator.finished_text()?);
        tracing::debug!(chars = suggestion.text.chars().count(), "suggestion used from panel");
        Some(self.input.accept_suggestion(suggestion))
    }

    /// Sends the committed text as the assistant's reply, accepting the previewed
    /// variant first when nothing was typed. The value is kept if the send fails.
    pub async fn accept_and_send(
        &mut self,
        gateway: &dyn ConversationGateway,
    ) -> GatewayResult<Option<ChatMessage>> {
        let Some(conversation_id) = self.conversation_id.clone() else {
            return Ok(None);
        };
        if self.input.value().is_empty()
            && let Some(GhostInputEvent::Accepted(suggestion)) = self.input.accept()
        {
            tracing::debug!(
                chars = suggestion.text.chars().count(),
                "previewed variant accepted for sending"
            );
        }

        let text = self.input.value().trim().to_string();
        if text.is_empty() {
            return Ok(None);
        }

        let message = gateway
            .append_message(&conversation_id, NewChatMessage::assistant(text))
            .await
            .inspect_err(|error| {
                tracing::warn!(conversation_id = %conversation_id, %error, "failed to send reply");
            })?;

        self.input.take_value();
        self.clear();
        tracing::info!(conversation_id = %conversation_id, message_id = %message.id, "reply sent");
        Ok(Some(message))
    }

    fn subscribe(&mut self) {
        let Some(conversation_id) = self.conversation_id.clone() else {
            return;
        };

        let frames = self.frames.clone();
        let subscription = self
            .multiplexer
            .subscribe(ChannelKey::suggestions(conversation_id), move |frame| {
                if frames.send(frame).is_err() {
                    tracing::trace!("suggestion panel dropped, discarding frame");
                }
            });
        // The replaced subscription is already superseded, so dropping it closes nothing.
        self.subscription = Some(subscription);
    }

    fn reset_accumulator(&mut self) {
        self.accumulator = mem::take(&mut self.accumulator).clear();
    }
}

impl Drop for SuggestionPanel {
    fn drop(&mut self) {
        self.deactivate();
    }
}
