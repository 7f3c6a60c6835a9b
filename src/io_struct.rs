use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

fn default_room() -> String {
    "lobby".to_string()
}

/// Incoming chat context from the frontend bridge.
#[derive(Debug, Deserialize)]
pub struct McpEvent {
    #[serde(default = "default_room")]
    pub room: String,
    #[serde(default)]
    pub recent: Vec<String>,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventAck {
    pub ok: bool,
    pub queued: bool,
    pub room: String,
    pub bias: String,
}

/// Payload published to the chat pub/sub channel. Append-only; never mutated
/// after creation. The consuming frontend expects exactly this shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub user: String,
    pub text: String,
    pub room: String,
    pub role: String,
    pub timestamp: String,
    pub task_id: Option<String>,
}

impl ChatMessage {
    pub fn bot(user: String, text: String, room: String, task_id: Option<String>) -> Self {
        ChatMessage {
            user,
            text,
            room,
            role: "bot".to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            task_id,
        }
    }
}

/// One turn of a chat-completion conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}
