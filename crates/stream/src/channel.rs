use std::fmt;

use souffle_gateway::ConversationId;

/// What a push channel carries for its conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Purpose {
    Messages,
    Suggestions,
}

impl Purpose {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::Suggestions => "suggestions",
        }
    }
}

/// Routing key of one logical stream. At most one transport is live per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    conversation_id: ConversationId,
    purpose: Purpose,
}

impl ChannelKey {
    pub fn new(conversation_id: ConversationId, purpose: Purpose) -> Self {
        Self {
            conversation_id,
            purpose,
        }
    }

    pub fn suggestions(conversation_id: ConversationId) -> Self {
        Self::new(conversation_id, Purpose::Suggestions)
    }

    pub fn messages(conversation_id: ConversationId) -> Self {
        Self::new(conversation_id, Purpose::Messages)
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn purpose(&self) -> Purpose {
        self.purpose
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.conversation_id, self.purpose.as_str())
    }
}

/// Identifier of one subscription instance.
///
/// Minted fresh on every subscribe so frames of a replaced instance can be told apart
/// from frames of its successor on the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl SubscriptionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}
