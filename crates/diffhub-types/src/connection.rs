use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{ConnectionId, RequestId, SubscriptionId};

/// Prefix of the channel that carries completion events for a request.
pub const COMPARISON_CHANNEL_PREFIX: &str = "comparison:";

/// Channel name for a comparison request: `comparison:<requestId>`.
pub fn comparison_channel(request_id: &RequestId) -> String {
    format!("{COMPARISON_CHANNEL_PREFIX}{request_id}")
}

/// A live client session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub connection_id: ConnectionId,
    pub user_id: String,
    pub connected_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Connection {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            connection_id: ConnectionId::new(),
            user_id: user_id.into(),
            connected_at: now,
            last_activity_at: now,
            is_active: true,
        }
    }

    /// Record client activity.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.last_activity_at {
            self.last_activity_at = at;
        }
    }
}

/// Channel interest bound to exactly one connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub subscription_id: SubscriptionId,
    pub user_id: String,
    pub connection_id: ConnectionId,
    pub channels: BTreeSet<String>,
}

impl Subscription {
    pub fn new<I, S>(user_id: impl Into<String>, connection_id: ConnectionId, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subscription_id: SubscriptionId::new(),
            user_id: user_id.into(),
            connection_id,
            channels: channels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.channels.contains(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_channel_format() {
        let id = RequestId::from_uuid(uuid::Uuid::nil());
        assert_eq!(
            comparison_channel(&id),
            "comparison:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut conn = Connection::new("alice");
        let before = conn.last_activity_at;
        conn.touch(before - chrono::Duration::seconds(10));
        assert_eq!(conn.last_activity_at, before);
        conn.touch(before + chrono::Duration::seconds(10));
        assert!(conn.last_activity_at > before);
    }

    #[test]
    fn subscription_deduplicates_channels() {
        let sub = Subscription::new("bob", ConnectionId::new(), ["a", "b", "a"]);
        assert_eq!(sub.channels.len(), 2);
        assert!(sub.contains("a"));
        assert!(!sub.contains("c"));
    }
}
