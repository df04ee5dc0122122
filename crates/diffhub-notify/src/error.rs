use diffhub_types::ConnectionId;

/// Errors produced by the notification subsystem.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// No connection with this id is registered.
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    /// A connection with this id is already registered.
    #[error("connection already registered: {0}")]
    AlreadyConnected(ConnectionId),

    /// The subscribing user does not own the connection.
    #[error("connection {connection_id} belongs to {owner}, not {user_id}")]
    NotOwner {
        connection_id: ConnectionId,
        owner: String,
        user_id: String,
    },

    /// Delivery to a single connection failed.
    #[error("delivery to {connection_id} failed: {reason}")]
    Transport {
        connection_id: ConnectionId,
        reason: String,
    },
}

/// Convenience alias used throughout the notify crate.
pub type NotifyResult<T> = Result<T, NotifyError>;
