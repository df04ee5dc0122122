use diffhub_types::{RequestId, TypeError};

/// Errors from request and result store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No request with this id is stored.
    #[error("request not found: {0}")]
    NotFound(RequestId),

    /// A request or result with this id is already stored.
    #[error("already exists: {0}")]
    AlreadyExists(RequestId),

    /// The requested status change is not allowed from the current status.
    #[error("request {id}: {source}")]
    InvalidTransition {
        id: RequestId,
        #[source]
        source: TypeError,
    },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
