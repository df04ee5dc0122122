use chrono::{DateTime, Utc};

use diffhub_types::{ComparisonRequest, ComparisonStatus, DiffResult, RequestId};

use crate::error::StoreResult;

/// Outcome of an attempt to move a request from `Pending` to `Processing`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller won the claim; carries the request as now stored.
    Claimed(ComparisonRequest),
    /// Another worker already holds the request.
    AlreadyClaimed,
    /// The request already reached a terminal status.
    Terminal(ComparisonStatus),
}

impl ClaimOutcome {
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed(_))
    }
}

/// Owner of every comparison request record.
///
/// All implementations must satisfy these invariants:
/// - Status transitions follow `Pending -> Processing -> {Completed | Failed}`.
/// - [`claim`](Self::claim) is atomic: among concurrent callers for the same
///   id, at most one observes [`ClaimOutcome::Claimed`].
/// - `completed_at` and `error_message` are written only by the terminal
///   transitions.
pub trait ComparisonRequestStore: Send + Sync {
    /// Store a new request. Fails with `AlreadyExists` on a duplicate id.
    fn insert(&self, request: ComparisonRequest) -> StoreResult<()>;

    /// Snapshot of a request, or `Ok(None)` if unknown.
    fn get(&self, id: &RequestId) -> StoreResult<Option<ComparisonRequest>>;

    /// Compare-and-set `Pending -> Processing`. Fails with `NotFound` for an
    /// unknown id.
    fn claim(&self, id: &RequestId) -> StoreResult<ClaimOutcome>;

    /// `Processing -> Completed`, stamping `completed_at`.
    fn complete(&self, id: &RequestId, at: DateTime<Utc>) -> StoreResult<ComparisonRequest>;

    /// `Processing -> Failed`, stamping `completed_at` and `error_message`.
    fn fail(&self, id: &RequestId, message: &str, at: DateTime<Utc>) -> StoreResult<ComparisonRequest>;

    /// Remove a request that is still `Pending`, for a submission that could
    /// not be queued. Returns `false` if the id is unknown or already claimed.
    fn discard(&self, id: &RequestId) -> StoreResult<bool>;

    /// Requests submitted by `requester` (all requests for `None`), newest
    /// first.
    fn list_requests(&self, requester: Option<&str>) -> StoreResult<Vec<ComparisonRequest>>;
}

/// Write-once storage for computed diffs, keyed by request id.
pub trait DiffResultStore: Send + Sync {
    /// Store a result. Fails with `AlreadyExists` if one is already stored
    /// for the same request.
    fn put(&self, result: DiffResult) -> StoreResult<()>;

    /// The stored result, or `Ok(None)` if none exists.
    fn get(&self, id: &RequestId) -> StoreResult<Option<DiffResult>>;

    fn exists(&self, id: &RequestId) -> StoreResult<bool> {
        Ok(self.get(id)?.is_some())
    }
}
