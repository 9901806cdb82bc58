use std::borrow::Cow;

use super::ids::ConversationId;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// URL layout of the conversation API, rooted at `{base}/api`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoutes {
    api_root: String,
}

impl ApiRoutes {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        let base_url = base_url.as_ref().trim().trim_end_matches('/');
        let base_url = if base_url.is_empty() {
            DEFAULT_API_BASE_URL
        } else {
            base_url
        };

        Self {
            api_root: format!("{base_url}/api"),
        }
    }

    pub fn chats(&self) -> String {
        format!("{}/chats", self.api_root)
    }

    pub fn chat(&self, chat_id: &ConversationId) -> String {
        format!("{}/chats/{}", self.api_root, segment(chat_id))
    }

    pub fn messages(&self, chat_id: &ConversationId) -> String {
        format!("{}/chats/{}/messages", self.api_root, segment(chat_id))
    }

    pub fn context(&self, chat_id: &ConversationId) -> String {
        format!("{}/chats/{}/context", self.api_root, segment(chat_id))
    }

    pub fn suggestion_stream(&self, chat_id: &ConversationId) -> String {
        format!("{}/chats/{}/suggestions/stream", self.api_root, segment(chat_id))
    }

    pub fn message_stream(&self, chat_id: &ConversationId) -> String {
        format!("{}/chats/{}/messages/stream", self.api_root, segment(chat_id))
    }
}

/// Conversation ids are opaque server strings, so they are escaped as one path segment.
fn segment(chat_id: &ConversationId) -> Cow<'_, str> {
    urlencoding::encode(chat_id.as_str())
}

impl Default for ApiRoutes {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_do_not_double_up() {
        let routes = ApiRoutes::new("https://assist.example.com/");
        let chat_id = ConversationId::new("c-42");

        assert_eq!(routes.chats(), "https://assist.example.com/api/chats");
        assert_eq!(
            routes.suggestion_stream(&chat_id),
            "https://assist.example.com/api/chats/c-42/suggestions/stream"
        );
        assert_eq!(
            routes.message_stream(&chat_id),
            "https://assist.example.com/api/chats/c-42/messages/stream"
        );
    }

    #[test]
    fn conversation_ids_are_escaped_as_a_single_segment() {
        let routes = ApiRoutes::new("https://assist.example.com");
        let chat_id = ConversationId::new("a/b?c#d e");

        assert_eq!(
            routes.messages(&chat_id),
            "https://assist.example.com/api/chats/a%2Fb%3Fc%23d%20e/messages"
        );
        assert_eq!(
            routes.chat(&ConversationId::new("c-42_x.y~z")),
            "https://assist.example.com/api/chats/c-42_x.y~z"
        );
    }

    #[test]
    fn blank_base_url_falls_back_to_local_server() {
        assert_eq!(ApiRoutes::new("  ").chats(), "http://localhost:8000/api/chats");
    }
}
