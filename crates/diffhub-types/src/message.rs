use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::MessageId;

/// Kind of message pushed to a client connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    /// First message on a new connection, carries the connection id.
    Connected,
    /// A comparison request reached a terminal state.
    ComparisonCompleted,
    /// Reply to a heartbeat.
    HeartbeatAck,
    /// Free-form server notice.
    Notice,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::ComparisonCompleted => "comparisonCompleted",
            Self::HeartbeatAck => "heartbeatAck",
            Self::Notice => "notice",
        };
        f.write_str(s)
    }
}

/// Envelope delivered to subscribed connections:
/// `{messageId, type, payload, createdAt}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub message_id: MessageId,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl PushMessage {
    pub fn new(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_id: MessageId::new(),
            message_type,
            payload,
            created_at: Utc::now(),
        }
    }
}
