use std::future::Future;
use std::pin::Pin;

pub mod error;
pub mod http;
pub mod ids;
pub mod routes;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use error::{GatewayError, GatewayResult};
pub use http::HttpConversationGateway;
pub use ids::{ConversationId, MessageId};
pub use routes::{ApiRoutes, DEFAULT_API_BASE_URL};
pub use types::{Chat, ChatMessage, ChatRole, NewChatMessage};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Request/response access to conversations. Failures surface as a single
/// [`GatewayError`] carrying the HTTP status when there was one.
pub trait ConversationGateway: Send + Sync {
    fn list_chats<'a>(&'a self) -> BoxFuture<'a, GatewayResult<Vec<Chat>>>;
    fn create_chat<'a>(&'a self) -> BoxFuture<'a, GatewayResult<Chat>>;
    fn get_chat<'a>(
        &'a self,
        chat_id: &'a ConversationId,
    ) -> BoxFuture<'a, GatewayResult<Option<Chat>>>;
    fn append_message<'a>(
        &'a self,
        chat_id: &'a ConversationId,
        message: NewChatMessage,
    ) -> BoxFuture<'a, GatewayResult<ChatMessage>>;
    fn update_context<'a>(
        &'a self,
        chat_id: &'a ConversationId,
        context: String,
    ) -> BoxFuture<'a, GatewayResult<()>>;
}

pub async fn first_chat(gateway: &dyn ConversationGateway) -> GatewayResult<Option<Chat>> {
    Ok(gateway.list_chats().await?.into_iter().next())
}

/// Fetches a conversation that must exist.
pub async fn require_chat(
    gateway: &dyn ConversationGateway,
    chat_id: &ConversationId,
) -> GatewayResult<Chat> {
    match gateway.get_chat(chat_id).await? {
        Some(chat) => Ok(chat),
        None => error::ConversationNotFoundSnafu {
            stage: "require-chat",
            id: chat_id.to_string(),
        }
        .fail(),
    }
}

/// Picks the first existing conversation, creating one when there is none.
pub async fn first_or_create_chat(gateway: &dyn ConversationGateway) -> GatewayResult<Chat> {
    if let Some(chat) = first_chat(gateway).await? {
        return Ok(chat);
    }

    tracing::info!("no conversation found, creating one");
    gateway.create_chat().await
}
