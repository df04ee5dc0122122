use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::RequestId;

/// Lifecycle state of a comparison request.
///
/// Transitions are one-directional: `Pending -> Processing -> {Completed | Failed}`.
/// `Completed` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ComparisonStatus {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a single step from `self` to `next` is permitted.
    pub fn can_transition_to(&self, next: ComparisonStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            other => Err(TypeError::UnknownStatus(other.to_string())),
        }
    }
}

/// A request to compare two branches of a repository.
///
/// `completed_at` and `error_message` are only ever set by the terminal
/// transitions ([`ComparisonRequest::complete`] / [`ComparisonRequest::fail`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRequest {
    pub request_id: RequestId,
    pub repository_path: PathBuf,
    pub from_branch: String,
    pub into_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub status: ComparisonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ComparisonRequest {
    /// Create a new `Pending` request with a fresh id.
    pub fn new(
        repository_path: impl Into<PathBuf>,
        from_branch: impl Into<String>,
        into_branch: impl Into<String>,
        requester_id: Option<String>,
    ) -> Self {
        Self {
            request_id: RequestId::new(),
            repository_path: repository_path.into(),
            from_branch: from_branch.into(),
            into_branch: into_branch.into(),
            requester_id,
            requested_at: Utc::now(),
            status: ComparisonStatus::Pending,
            completed_at: None,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `Pending -> Processing`.
    pub fn begin_processing(&mut self) -> Result<(), TypeError> {
        self.transition(ComparisonStatus::Processing)
    }

    /// `Processing -> Completed`, stamping `completed_at`.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), TypeError> {
        self.transition(ComparisonStatus::Completed)?;
        self.completed_at = Some(at);
        Ok(())
    }

    /// `Processing -> Failed`, stamping `completed_at` and `error_message`.
    pub fn fail(&mut self, message: impl Into<String>, at: DateTime<Utc>) -> Result<(), TypeError> {
        self.transition(ComparisonStatus::Failed)?;
        self.completed_at = Some(at);
        self.error_message = Some(message.into());
        Ok(())
    }

    fn transition(&mut self, next: ComparisonStatus) -> Result<(), TypeError> {
        if !self.status.can_transition_to(next) {
            return Err(TypeError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
