//! Typed cross-service eventing.
//!
//! The bus decouples the comparison core from other services. Only an
//! in-process implementation ships here; a broker-backed one implements the
//! same trait.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use diffhub_types::{ComparisonStatus, RequestId};

/// A message exchanged with other services.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BusMessage {
    /// A comparison request reached a terminal status.
    #[serde(rename_all = "camelCase")]
    RequestCompleted {
        request_id: RequestId,
        status: ComparisonStatus,
        summary: String,
    },
    /// New commits were pushed to a branch of a repository.
    #[serde(rename_all = "camelCase")]
    RepositoryPushDetected {
        repository_path: PathBuf,
        branch: String,
    },
}

/// Receiving end of a bus subscription.
pub type BusStream = broadcast::Receiver<BusMessage>;

/// Generic publish/subscribe interface for [`BusMessage`]s.
pub trait MessageBus: Send + Sync {
    /// Publish to every current subscriber; returns how many received it.
    fn publish(&self, message: BusMessage) -> usize;

    fn subscribe(&self) -> BusStream;
}

/// In-process bus on a tokio broadcast channel.
///
/// Subscribers that fall more than `capacity` messages behind observe a
/// `Lagged` error and skip ahead.
#[derive(Clone, Debug)]
pub struct BroadcastBus {
    sender: broadcast::Sender<BusMessage>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl MessageBus for BroadcastBus {
    fn publish(&self, message: BusMessage) -> usize {
        trace!(?message, "bus publish");
        // No subscribers is not an error.
        self.sender.send(message).unwrap_or(0)
    }

    fn subscribe(&self) -> BusStream {
        self.sender.subscribe()
    }
}
