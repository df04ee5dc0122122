use serde::{Deserialize, Serialize};

use diffhub_notify::BusMessage;
use diffhub_types::{ComparisonStatus, MessageType, PushMessage, RequestId};

/// Emitted once per request when it reaches `Completed` or `Failed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub request_id: RequestId,
    pub status: ComparisonStatus,
    /// Change summary for a completed request, the error for a failed one.
    pub summary: String,
}

impl CompletionEvent {
    pub fn to_push_message(&self) -> PushMessage {
        PushMessage::new(
            MessageType::ComparisonCompleted,
            serde_json::to_value(self).unwrap_or_default(),
        )
    }

    pub fn to_bus_message(&self) -> BusMessage {
        BusMessage::RequestCompleted {
            request_id: self.request_id,
            status: self.status,
            summary: self.summary.clone(),
        }
    }
}
