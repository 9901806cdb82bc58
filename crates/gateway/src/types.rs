use serde::{Deserialize, Serialize};

use super::ids::{ConversationId, MessageId};

/// Speaker of one conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub message: String,
    pub role: ChatRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ConversationId,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub message: String,
    pub role: ChatRole,
}

impl NewChatMessage {
    pub fn new(role: ChatRole, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            role,
        }
    }

    /// Customer-side message, as injected by the client simulator.
    pub fn user(message: impl Into<String>) -> Self {
        Self::new(ChatRole::User, message)
    }

    /// Operator reply, typically an accepted suggestion.
    pub fn assistant(message: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_payload_decodes_with_lowercase_roles() {
        let payload = r#"{
            "id": "chat-1",
            "messages": [
                {"id": "m-1", "message": "Où est ma commande ?", "role": "user"},
                {"id": "m-2", "message": "Je vérifie.", "role": "assistant"}
            ],
            "context": "commande #1234"
        }"#;

        let chat: Chat = serde_json::from_str(payload).expect("chat payload should decode");

        assert_eq!(chat.id.as_str(), "chat-1");
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, ChatRole::User);
        assert_eq!(chat.messages[1].role, ChatRole::Assistant);
        assert_eq!(chat.context, "commande #1234");
    }

    #[test]
    fn chat_without_messages_or_context_uses_defaults() {
        let chat: Chat = serde_json::from_str(r#"{"id": "fresh"}"#).expect("minimal chat");
        assert!(chat.messages.is_empty());
        assert!(chat.context.is_empty());
    }

    #[test]
    fn outgoing_message_serializes_role_in_lowercase() {
        let body = serde_json::to_value(NewChatMessage::assistant("Bonjour")).expect("serialize");
        assert_eq!(body["role"], "assistant");
        assert_eq!(body["message"], "Bonjour");
    }
}
