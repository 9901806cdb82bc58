//! In-memory gateway for tests of the layers above the HTTP client.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::error::{GatewayResult, StatusSnafu};
use super::ids::{ConversationId, MessageId};
use super::types::{Chat, ChatMessage, NewChatMessage};
use super::{BoxFuture, ConversationGateway};

#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    chats: Vec<Chat>,
    next_id: u64,
    failing_status: Option<u16>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chat(chat_id: impl Into<ConversationId>) -> Self {
        let gateway = Self::new();
        gateway.lock().chats.push(Chat {
            id: chat_id.into(),
            messages: Vec::new(),
            context: String::new(),
        });
        gateway
    }

    /// Makes every following call fail with the given HTTP status.
    pub fn fail_with_status(&self, status: u16) {
        self.lock().failing_status = Some(status);
    }

    pub fn messages(&self, chat_id: &ConversationId) -> Vec<ChatMessage> {
        self.lock()
            .chats
            .iter()
            .find(|chat| &chat.id == chat_id)
            .map(|chat| chat.messages.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn checked(&self, operation: &'static str) -> GatewayResult<MutexGuard<'_, MemoryState>> {
        let state = self.lock();
        if let Some(status) = state.failing_status {
            return StatusSnafu {
                stage: "memory-gateway",
                operation,
                status,
            }
            .fail();
        }
        Ok(state)
    }
}

impl MemoryState {
    fn mint(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

impl ConversationGateway for MemoryGateway {
    fn list_chats<'a>(&'a self) -> BoxFuture<'a, GatewayResult<Vec<Chat>>> {
        Box::pin(async move { Ok(self.checked("list chats")?.chats.clone()) })
    }

    fn create_chat<'a>(&'a self) -> BoxFuture<'a, GatewayResult<Chat>> {
        Box::pin(async move {
            let mut state = self.checked("create chat")?;
            let chat = Chat {
                id: ConversationId::new(state.mint("chat")),
                messages: Vec::new(),
                context: String::new(),
            };
            state.chats.push(chat.clone());
            Ok(chat)
        })
    }

    fn get_chat<'a>(
        &'a self,
        chat_id: &'a ConversationId,
    ) -> BoxFuture<'a, GatewayResult<Option<Chat>>> {
        Box::pin(async move {
            let state = self.checked("fetch chat")?;
            Ok(state.chats.iter().find(|chat| &chat.id == chat_id).cloned())
        })
    }

    fn append_message<'a>(
        &'a self,
        chat_id: &'a ConversationId,
        message: NewChatMessage,
    ) -> BoxFuture<'a, GatewayResult<ChatMessage>> {
        Box::pin(async move {
            let mut state = self.checked("append message")?;
            let id = MessageId::new(state.mint("message"));
            let Some(chat) = state.chats.iter_mut().find(|chat| &chat.id == chat_id) else {
                return StatusSnafu {
                    stage: "memory-gateway",
                    operation: "append message",
                    status: 404_u16,
                }
                .fail();
            };

            let stored = ChatMessage {
                id,
                message: message.message,
                role: message.role,
            };
            chat.messages.push(stored.clone());
            Ok(stored)
        })
    }

    fn update_context<'a>(
        &'a self,
        chat_id: &'a ConversationId,
        context: String,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            let mut state = self.checked("update context")?;
            if let Some(chat) = state.chats.iter_mut().find(|chat| &chat.id == chat_id) {
                chat.context = context;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GatewayError, first_or_create_chat, require_chat};

    #[tokio::test]
    async fn first_or_create_creates_only_when_empty() {
        let gateway = MemoryGateway::new();

        let created = first_or_create_chat(&gateway).await.expect("create chat");
        let reused = first_or_create_chat(&gateway).await.expect("reuse chat");

        assert_eq!(created.id, reused.id);
        assert_eq!(gateway.list_chats().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn require_chat_reports_missing_conversation() {
        let gateway = MemoryGateway::new();

        let error = require_chat(&gateway, &ConversationId::new("nope"))
            .await
            .expect_err("missing chat");

        assert!(matches!(error, GatewayError::ConversationNotFound { .. }));
    }

    #[tokio::test]
    async fn failing_status_is_propagated_not_swallowed() {
        let gateway = MemoryGateway::with_chat("c");
        gateway.fail_with_status(503);

        let error = gateway
            .append_message(&ConversationId::new("c"), NewChatMessage::user("hi"))
            .await
            .expect_err("configured failure");

        assert_eq!(error.status(), Some(503));
    }
}
