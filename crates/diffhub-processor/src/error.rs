use diffhub_diff::DiffError;
use diffhub_store::StoreError;
use diffhub_types::RequestId;

/// Errors surfaced by the processor and the service facade.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The submission was malformed; nothing was stored or queued.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("request not found: {0}")]
    RequestNotFound(RequestId),

    /// The processor has been shut down and accepts no more work.
    #[error("processor is shut down")]
    ShuttingDown,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Diff(#[from] DiffError),
}

impl ProcessorError {
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::Diff(e) => e.is_validation(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::RequestNotFound(_) | Self::Store(StoreError::NotFound(_)) => true,
            Self::Diff(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// Convenience alias used throughout the processor crate.
pub type ProcessorResult<T> = Result<T, ProcessorError>;
