use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest_eventsource::{Event, EventSource, retry};
use snafu::ResultExt;
use souffle_gateway::ApiRoutes;

use super::channel::{ChannelKey, Purpose};
use super::error::{BuildClientSnafu, OpenEventSourceSnafu, TransportError, TransportResult};
use super::frame::RawEvent;
use super::transport::{RawEventStream, Transport};

/// Server-Sent Events transport for the conversation push endpoints.
#[derive(Debug, Clone)]
pub struct SseTransport {
    client: reqwest::Client,
    routes: ApiRoutes,
}

impl SseTransport {
    pub fn new(routes: ApiRoutes) -> TransportResult<Self> {
        // No overall timeout: a push stream stays open until it ends or is cancelled.
        let client = reqwest::Client::builder()
            .build()
            .context(BuildClientSnafu {
                stage: "build-sse-client",
            })?;

        Ok(Self::with_client(client, routes))
    }

    pub fn with_client(client: reqwest::Client, routes: ApiRoutes) -> Self {
        Self { client, routes }
    }

    fn url_for(&self, key: &ChannelKey) -> String {
        match key.purpose() {
            Purpose::Suggestions => self.routes.suggestion_stream(key.conversation_id()),
            Purpose::Messages => self.routes.message_stream(key.conversation_id()),
        }
    }
}

impl Transport for SseTransport {
    fn open(&self, key: &ChannelKey) -> TransportResult<RawEventStream> {
        let url = self.url_for(key);
        tracing::debug!(channel = %key, %url, "opening event source");

        let request = self.client.get(&url).header(ACCEPT, "text/event-stream");
        let mut source = EventSource::new(request).context(OpenEventSourceSnafu {
            stage: "open-event-source",
            url,
        })?;
        // Reconnects are the caller's decision, never the transport's.
        source.set_retry_policy(Box::new(retry::Never));

        let events = source.filter_map(|item| async move {
            match item {
                Ok(Event::Open) => None,
                Ok(Event::Message(message)) => Some(Ok(RawEvent::new(message.event, message.data))),
                Err(source) => Some(Err(TransportError::EventSource {
                    stage: "read-event-source",
                    source,
                })),
            }
        });

        Ok(events.boxed())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use souffle_gateway::ConversationId;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    use super::*;
    use crate::frame::StreamFrame;
    use crate::multiplexer::StreamMultiplexer;

    async fn serve_event_stream(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let address = listener.local_addr().expect("listener address");

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept connection");
            let mut request = Vec::new();
            let mut buffer = [0_u8; 1024];
            while !String::from_utf8_lossy(&request).contains("\r\n\r\n") {
                let read = socket.read(&mut buffer).await.expect("read request");
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
            }

            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncache-control: no-cache\r\nconnection: close\r\n\r\n{body}"
            );
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write event stream");
            let _ = socket.shutdown().await;
        });

        format!("http://{address}")
    }

    #[test]
    fn purposes_map_to_their_push_endpoints() {
        let transport = SseTransport::with_client(
            reqwest::Client::new(),
            ApiRoutes::new("http://assist.local"),
        );
        let chat_id = ConversationId::new("c-7");

        assert_eq!(
            transport.url_for(&ChannelKey::suggestions(chat_id.clone())),
            "http://assist.local/api/chats/c-7/suggestions/stream"
        );
        assert_eq!(
            transport.url_for(&ChannelKey::messages(chat_id)),
            "http://assist.local/api/chats/c-7/messages/stream"
        );
    }

    #[tokio::test]
    async fn server_sent_events_decode_into_ordered_frames() {
        let base_url = serve_event_stream(
            "data: Votre colis\n\ndata:  est parti\n\nevent: usage\ndata: {}\n\ndata: [DONE]\n\n",
        )
        .await;
        let transport = SseTransport::new(ApiRoutes::new(base_url)).expect("sse transport");
        let multiplexer = StreamMultiplexer::new(Arc::new(transport));
        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();

        let _subscription = multiplexer.subscribe(
            ChannelKey::suggestions(ConversationId::new("c-1")),
            move |frame| {
                let _ = frame_tx.send(frame.frame);
            },
        );

        let mut frames = Vec::new();
        while let Ok(Some(frame)) =
            tokio::time::timeout(Duration::from_secs(5), frame_rx.recv()).await
        {
            let terminal = frame.is_terminal();
            frames.push(frame);
            if terminal {
                break;
            }
        }

        assert_eq!(
            frames,
            vec![
                StreamFrame::Chunk("Votre colis".into()),
                StreamFrame::Chunk(" est parti".into()),
                StreamFrame::Complete,
            ]
        );
    }
}
