/// Control frames exchanged over the notification socket
use crate::models::SubscriberId;
use serde::{Deserialize, Serialize};

/// Messages a client may send to the server.
///
/// Only `subscribe` is handled; anything else fails to parse and is
/// ignored, leaving the connection open but unrouted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Establish routing for a subscriber on this connection
    #[serde(rename_all = "camelCase")]
    Subscribe { subscriber_id: SubscriberId },
}

impl ClientMessage {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Server control frames sent outside the notification stream itself
/// (delivered notifications go out as bare serialized records).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Routing established for the given subscriber
    #[serde(rename_all = "camelCase")]
    Connected {
        subscriber_id: SubscriberId,
        timestamp: i64,
    },

    /// Non-fatal error surfaced to the client
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn connected(subscriber_id: SubscriberId) -> Self {
        ServerMessage::Connected {
            subscriber_id,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
