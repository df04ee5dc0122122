use thiserror::Error;

use crate::request::ComparisonStatus;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ComparisonStatus,
        to: ComparisonStatus,
    },

    #[error("unknown status: {0}")]
    UnknownStatus(String),
}
