use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use snafu::ResultExt;

use super::error::{BuildClientSnafu, DecodeSnafu, GatewayResult, RequestSnafu, StatusSnafu};
use super::ids::ConversationId;
use super::routes::ApiRoutes;
use super::types::{Chat, ChatMessage, NewChatMessage};
use super::{BoxFuture, ConversationGateway};

/// `ConversationGateway` backed by the JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpConversationGateway {
    client: reqwest::Client,
    routes: ApiRoutes,
}

impl HttpConversationGateway {
    pub fn new(routes: ApiRoutes, timeout: Duration) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context(BuildClientSnafu {
                stage: "build-gateway-client",
            })?;

        Ok(Self::with_client(client, routes))
    }

    pub fn with_client(client: reqwest::Client, routes: ApiRoutes) -> Self {
        Self { client, routes }
    }

    pub fn routes(&self) -> &ApiRoutes {
        &self.routes
    }

    async fn dispatch(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> GatewayResult<Response> {
        request.send().await.context(RequestSnafu {
            stage: "send-request",
            operation,
        })
    }

    fn ensure_success(operation: &'static str, response: Response) -> GatewayResult<Response> {
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(operation, status = status.as_u16(), "gateway request rejected");
            return StatusSnafu {
                stage: "check-status",
                operation,
                status: status.as_u16(),
            }
            .fail();
        }

        Ok(response)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> GatewayResult<Response> {
        let response = self.dispatch(operation, request).await?;
        Self::ensure_success(operation, response)
    }

    async fn send_json<T>(&self, operation: &'static str, request: RequestBuilder) -> GatewayResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(operation, request).await?;
        response.json::<T>().await.context(DecodeSnafu {
            stage: "decode-response",
            operation,
        })
    }
}

impl ConversationGateway for HttpConversationGateway {
    fn list_chats<'a>(&'a self) -> BoxFuture<'a, GatewayResult<Vec<Chat>>> {
        Box::pin(async move {
            self.send_json("list chats", self.client.get(self.routes.chats()))
                .await
        })
    }

    fn create_chat<'a>(&'a self) -> BoxFuture<'a, GatewayResult<Chat>> {
        Box::pin(async move {
            let chat: Chat = self
                .send_json("create chat", self.client.post(self.routes.chats()))
                .await?;
            tracing::debug!(conversation_id = %chat.id, "created conversation");
            Ok(chat)
        })
    }

    fn get_chat<'a>(
        &'a self,
        chat_id: &'a ConversationId,
    ) -> BoxFuture<'a, GatewayResult<Option<Chat>>> {
        Box::pin(async move {
            let operation = "fetch chat";
            let response = self
                .dispatch(operation, self.client.get(self.routes.chat(chat_id)))
                .await?;

            // A missing conversation is an answer, not a failure.
            if response.status() == StatusCode::NOT_FOUND {
                tracing::debug!(conversation_id = %chat_id, "conversation not found");
                return Ok(None);
            }

            let response = Self::ensure_success(operation, response)?;
            let chat = response.json::<Chat>().await.context(DecodeSnafu {
                stage: "decode-response",
                operation,
            })?;
            Ok(Some(chat))
        })
    }

    fn append_message<'a>(
        &'a self,
        chat_id: &'a ConversationId,
        message: NewChatMessage,
    ) -> BoxFuture<'a, GatewayResult<ChatMessage>> {
        Box::pin(async move {
            let request = self.client.post(self.routes.messages(chat_id)).json(&message);
            self.send_json("append message", request).await
        })
    }

    fn update_context<'a>(
        &'a self,
        chat_id: &'a ConversationId,
        context: String,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            // The API takes the context as a bare JSON string.
            let request = self.client.put(self.routes.context(chat_id)).json(&context);
            self.send("update context", request).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::{ChatRole, GatewayError};

    /// Answers exactly one request with a canned status and JSON body.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let address = listener.local_addr().expect("listener address");

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept connection");
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            let _ = socket.shutdown().await;
        });

        format!("http://{address}")
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut received = Vec::new();
        let mut buffer = [0_u8; 1024];

        loop {
            let read = socket.read(&mut buffer).await.expect("read request");
            if read == 0 {
                return;
            }
            received.extend_from_slice(&buffer[..read]);

            let text = String::from_utf8_lossy(&received);
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);

            if received.len() >= header_end + 4 + content_length {
                return;
            }
        }
    }

    fn gateway(base_url: &str) -> HttpConversationGateway {
        HttpConversationGateway::new(ApiRoutes::new(base_url), Duration::from_secs(5))
            .expect("gateway client")
    }

    #[tokio::test]
    async fn list_chats_decodes_payload() {
        let base_url = serve_once(
            "200 OK",
            r#"[{"id":"a","messages":[],"context":""},{"id":"b","messages":[],"context":""}]"#,
        )
        .await;

        let chats = gateway(&base_url).list_chats().await.expect("list chats");

        assert_eq!(chats.len(), 2);
        assert_eq!(chats[1].id.as_str(), "b");
    }

    #[tokio::test]
    async fn missing_chat_is_none_rather_than_error() {
        let base_url = serve_once("404 Not Found", "{}").await;

        let chat = gateway(&base_url)
            .get_chat(&ConversationId::new("gone"))
            .await
            .expect("404 maps to None");

        assert!(chat.is_none());
    }

    #[tokio::test]
    async fn server_errors_embed_the_status_code() {
        let base_url = serve_once("500 Internal Server Error", "{}").await;

        let error = gateway(&base_url)
            .append_message(&ConversationId::new("c"), NewChatMessage::user("hello"))
            .await
            .expect_err("500 must be an error");

        assert!(matches!(error, GatewayError::Status { status: 500, .. }));
        assert_eq!(error.status(), Some(500));
        assert!(error.to_string().contains("500"));
    }

    #[tokio::test]
    async fn appended_message_round_trips_server_echo() {
        let base_url = serve_once(
            "201 Created",
            r#"{"id":"m-9","message":"Votre colis est parti.","role":"assistant"}"#,
        )
        .await;

        let message = gateway(&base_url)
            .append_message(
                &ConversationId::new("c"),
                NewChatMessage::assistant("Votre colis est parti."),
            )
            .await
            .expect("append message");

        assert_eq!(message.id.as_str(), "m-9");
        assert_eq!(message.role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn update_context_accepts_empty_success_body() {
        let base_url = serve_once("200 OK", "").await;

        gateway(&base_url)
            .update_context(&ConversationId::new("c"), "client VIP".to_string())
            .await
            .expect("update context");
    }
}
