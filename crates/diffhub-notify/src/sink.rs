//! Per-connection delivery.

use tokio::sync::mpsc::{self, error::TrySendError};

use diffhub_types::{ConnectionId, PushMessage};

use crate::error::{NotifyError, NotifyResult};

/// Receiving half handed to the transport that serves a connection.
pub type MessageStream = mpsc::Receiver<PushMessage>;

/// Pushes messages to one client connection.
///
/// `deliver` must not block: a slow or dead client is reported as
/// [`NotifyError::Transport`] instead.
pub trait ConnectionSink: Send + Sync {
    fn deliver(&self, connection_id: ConnectionId, message: &PushMessage) -> NotifyResult<()>;

    /// `true` once the client side has gone away.
    fn is_closed(&self) -> bool;
}

/// Sink backed by a bounded tokio mpsc channel.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    sender: mpsc::Sender<PushMessage>,
}

impl ChannelSink {
    /// Create a sink buffering up to `capacity` messages (at least one).
    pub fn new(capacity: usize) -> (Self, MessageStream) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl ConnectionSink for ChannelSink {
    fn deliver(&self, connection_id: ConnectionId, message: &PushMessage) -> NotifyResult<()> {
        self.sender
            .try_send(message.clone())
            .map_err(|e| NotifyError::Transport {
                connection_id,
                reason: match e {
                    TrySendError::Full(_) => "outbound buffer full".to_string(),
                    TrySendError::Closed(_) => "connection closed".to_string(),
                },
            })
    }

    fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
