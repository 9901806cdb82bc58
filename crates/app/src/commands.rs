//! Command implementations behind the `souffle` binary.

use std::future::Future;
use std::sync::Arc;

use snafu::ResultExt;
use souffle_gateway::{
    ChatMessage, ConversationGateway, ConversationId, HttpConversationGateway, NewChatMessage,
    first_or_create_chat, require_chat,
};
use souffle_stream::{SseTransport, StreamMultiplexer, Transport};

use crate::demo::{ScenarioCatalog, replay_keys};
use crate::error::{AppResult, FeedFailedSnafu, GatewaySnafu, SettingsSnafu, TransportSnafu};
use crate::ghost::{GhostInput, GhostInputEvent};
use crate::settings::{Settings, SettingsStore};
use crate::suggestion::{PanelUpdate, Suggestion, SuggestionPanel};

pub fn http_gateway(settings: &Settings) -> AppResult<HttpConversationGateway> {
    HttpConversationGateway::new(settings.routes(), settings.request_timeout()).context(
        GatewaySnafu {
            stage: "build-gateway",
        },
    )
}

pub fn sse_transport(settings: &Settings) -> AppResult<Arc<dyn Transport>> {
    let transport = SseTransport::new(settings.routes()).context(TransportSnafu {
        stage: "build-transport",
    })?;
    Ok(Arc::new(transport))
}

/// Follows the suggestion feed of `chat` (or the first conversation) until `shutdown`
/// resolves, handing every finished suggestion to `on_suggestion`.
///
/// A failed feed ends the command; retrying is left to whoever runs it.
pub async fn watch<S, F>(
    gateway: &dyn ConversationGateway,
    transport: Arc<dyn Transport>,
    placeholder: &str,
    chat: Option<ConversationId>,
    shutdown: S,
    mut on_suggestion: F,
) -> AppResult<()>
where
    S: Future,
    F: FnMut(&Suggestion),
{
    let chat = match chat {
        Some(chat_id) => require_chat(gateway, &chat_id).await,
        None => first_or_create_chat(gateway).await,
    }
    .context(GatewaySnafu {
        stage: "resolve-conversation",
    })?;

    let (mut panel, mut frames) =
        SuggestionPanel::new(StreamMultiplexer::new(transport), GhostInput::new(placeholder));
    panel.activate(chat.id.clone());
    tracing::info!(conversation_id = %chat.id, "watching suggestions");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(conversation_id = %chat.id, "stopped watching suggestions");
                break;
            }
            Some(frame) = frames.recv() => match panel.handle_frame(frame) {
                PanelUpdate::Preview(preview) => {
                    tracing::debug!(conversation_id = %chat.id, %preview, "suggestion streaming");
                }
                PanelUpdate::SuggestionReady(suggestion) => on_suggestion(&suggestion),
                PanelUpdate::EmptyCompletion => {
                    tracing::debug!(conversation_id = %chat.id, "suggestion completed empty");
                }
                PanelUpdate::Stale | PanelUpdate::Discarded => {}
                PanelUpdate::Failed(message) => {
                    panel.deactivate();
                    return FeedFailedSnafu {
                        stage: "watch-suggestions",
                        conversation_id: chat.id.to_string(),
                        message,
                    }
                    .fail();
                }
            }
        }
    }

    panel.deactivate();
    Ok(())
}

/// Posts a customer message, standing in for the client side of the conversation.
pub async fn simulate(
    gateway: &dyn ConversationGateway,
    chat_id: &ConversationId,
    text: &str,
) -> AppResult<Option<ChatMessage>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let message = gateway
        .append_message(chat_id, NewChatMessage::user(text))
        .await
        .context(GatewaySnafu {
            stage: "simulate-client-message",
        })?;
    tracing::info!(conversation_id = %chat_id, message_id = %message.id, "client message posted");
    Ok(Some(message))
}

/// Replaces the operator notes attached to a conversation.
pub async fn set_context(
    gateway: &dyn ConversationGateway,
    chat_id: &ConversationId,
    context: &str,
) -> AppResult<()> {
    gateway
        .update_context(chat_id, context.to_string())
        .await
        .context(GatewaySnafu {
            stage: "update-context",
        })?;
    tracing::info!(conversation_id = %chat_id, "context updated");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub value: String,
    pub accepted: Option<Suggestion>,
    pub events: Vec<GhostInputEvent>,
}

/// Loads a canned scenario into a focused ghost input and replays `keys` over it.
pub fn demo(scenario: &str, keys: &str, placeholder: &str) -> AppResult<DemoReport> {
    let catalog = ScenarioCatalog::builtin()?;
    let mut input = GhostInput::new(placeholder);
    input.focus();
    input.set_variants(catalog.suggestions(scenario).to_vec());

    let events = replay_keys(&mut input, keys)?
        .into_iter()
        .filter_map(|outcome| outcome.into_event())
        .collect::<Vec<_>>();
    let accepted = events.iter().rev().find_map(|event| match event {
        GhostInputEvent::Accepted(suggestion) => Some(suggestion.clone()),
        _ => None,
    });

    Ok(DemoReport {
        value: input.value().to_string(),
        accepted,
        events,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsChanges {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub placeholder: Option<String>,
}

impl SettingsChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Applies `changes` to the stored settings and returns the result. With no changes the
/// current settings are returned untouched.
pub fn configure(store: &mut SettingsStore, changes: SettingsChanges) -> AppResult<Settings> {
    if changes.is_empty() {
        return Ok(store.settings().clone());
    }

    let mut settings = store.settings().clone();
    if let Some(api_base_url) = changes.api_base_url {
        settings.api_base_url = api_base_url;
    }
    if let Some(request_timeout_secs) = changes.request_timeout_secs {
        settings.request_timeout_secs = request_timeout_secs;
    }
    if let Some(placeholder) = changes.placeholder {
        settings.placeholder = placeholder;
    }

    store.update(settings).context(SettingsSnafu {
        stage: "save-settings",
    })?;
    Ok(store.settings().clone())
}

/// The accepted suggestion's sources, one line each, for terminal output.
pub fn source_lines(suggestion: &Suggestion) -> Vec<String> {
    suggestion
        .sources
        .iter()
        .map(|source| format!("{} ({}): {}", source.title, source.url, source.snippet))
        .collect()
}

/// Resolves an optional `--chat` argument.
pub fn chat_argument(raw: Option<&str>) -> Option<ConversationId> {
    raw.map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(ConversationId::from)
}
