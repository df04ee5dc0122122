//! Request/response facade over the store, the generator, and the processor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use diffhub_diff::{validate_branch_name, DiffGenerator};
use diffhub_store::{ComparisonRequestStore, DiffResultStore};
use diffhub_types::{ComparisonRequest, ComparisonStatus, FileDiff, RequestId};

use crate::error::{ProcessorError, ProcessorResult};
use crate::processor::ProcessorHandle;

/// A comparison submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub repository_path: PathBuf,
    pub from_branch: String,
    pub into_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<String>,
}

/// Immediate answer to a submission: the new id, always `Pending`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub request_id: RequestId,
    pub status: ComparisonStatus,
}

/// Polling view of a request. Diff fields are present only once the
/// request is `Completed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonView {
    pub request_id: RequestId,
    pub status: ComparisonStatus,
    pub from_branch: String,
    pub into_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_diffs: Option<Vec<FileDiff>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_additions: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_deletions: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_modifications: Option<usize>,
}

impl ComparisonView {
    fn pending_or_failed(request: ComparisonRequest) -> Self {
        Self {
            request_id: request.request_id,
            status: request.status,
            from_branch: request.from_branch,
            into_branch: request.into_branch,
            completed_at: request.completed_at,
            error_message: request.error_message,
            file_diffs: None,
            total_additions: None,
            total_deletions: None,
            total_modifications: None,
        }
    }
}

/// Entry point for submitting and polling comparisons.
#[derive(Clone)]
pub struct ComparisonService {
    requests: Arc<dyn ComparisonRequestStore>,
    results: Arc<dyn DiffResultStore>,
    generator: DiffGenerator,
    processor: Arc<ProcessorHandle>,
}

impl ComparisonService {
    pub fn new(
        requests: Arc<dyn ComparisonRequestStore>,
        results: Arc<dyn DiffResultStore>,
        generator: DiffGenerator,
        processor: Arc<ProcessorHandle>,
    ) -> Self {
        Self {
            requests,
            results,
            generator,
            processor,
        }
    }

    pub fn processor(&self) -> &Arc<ProcessorHandle> {
        &self.processor
    }

    /// Validate, store as `Pending`, and queue. Malformed input is rejected
    /// here and never reaches the queue.
    pub async fn submit(&self, submission: SubmitRequest) -> ProcessorResult<SubmitResponse> {
        validate_submission(&submission)?;
        if !self.processor.is_running() {
            return Err(ProcessorError::ShuttingDown);
        }

        let request = ComparisonRequest::new(
            submission.repository_path,
            submission.from_branch,
            submission.into_branch,
            submission.requester_id,
        );
        let id = request.request_id;
        info!(
            request_id = %id,
            repo = %request.repository_path.display(),
            from = %request.from_branch,
            into = %request.into_branch,
            "comparison submitted"
        );
        self.requests.insert(request)?;
        if let Err(e) = self.processor.enqueue(id).await {
            if let Err(discard) = self.requests.discard(&id) {
                warn!(request_id = %id, error = %discard, "cannot discard unqueued request");
            }
            return Err(e);
        }

        Ok(SubmitResponse {
            request_id: id,
            status: ComparisonStatus::Pending,
        })
    }

    /// Current state of a request, with the diff once it has completed.
    pub fn get_result(&self, id: &RequestId) -> ProcessorResult<ComparisonView> {
        let request = self
            .requests
            .get(id)?
            .ok_or(ProcessorError::RequestNotFound(*id))?;
        if request.status != ComparisonStatus::Completed {
            return Ok(ComparisonView::pending_or_failed(request));
        }

        let result = self
            .results
            .get(id)?
            .ok_or(ProcessorError::RequestNotFound(*id))?;
        Ok(ComparisonView {
            total_additions: Some(result.total_additions),
            total_deletions: Some(result.total_deletions),
            total_modifications: Some(result.total_modifications),
            file_diffs: Some(result.file_diffs),
            ..ComparisonView::pending_or_failed(request)
        })
    }

    pub async fn list_branches(&self, repository_path: &Path) -> ProcessorResult<Vec<String>> {
        Ok(self.generator.list_branches(repository_path).await?)
    }

    /// Requests of `requester` (everyone for `None`), newest first.
    pub fn list_requests(&self, requester: Option<&str>) -> ProcessorResult<Vec<ComparisonRequest>> {
        Ok(self.requests.list_requests(requester)?)
    }
}

impl std::fmt::Debug for ComparisonService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComparisonService")
            .field("generator", &self.generator)
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}

fn validate_submission(submission: &SubmitRequest) -> ProcessorResult<()> {
    if submission.repository_path.as_os_str().is_empty() {
        return Err(ProcessorError::Validation(
            "repositoryPath must not be empty".to_string(),
        ));
    }
    for (field, branch) in [
        ("fromBranch", &submission.from_branch),
        ("intoBranch", &submission.into_branch),
    ] {
        validate_branch_name(branch)
            .map_err(|e| ProcessorError::Validation(format!("{field}: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use diffhub_diff::{DiffConfig, InMemoryRepository};
    use diffhub_notify::NotificationFanout;
    use diffhub_store::{InMemoryRequestStore, InMemoryResultStore};

    use crate::config::ProcessorConfig;
    use crate::processor::ComparisonProcessor;

    fn service() -> (Arc<InMemoryRepository>, Arc<InMemoryRequestStore>, ComparisonService) {
        let repo = Arc::new(InMemoryRepository::new());
        let requests = Arc::new(InMemoryRequestStore::new());
        let results = Arc::new(InMemoryResultStore::new());
        let generator = DiffGenerator::new(repo.clone(), DiffConfig::default());
        let handle = ComparisonProcessor::new(
            requests.clone(),
            results.clone(),
            generator.clone(),
            Arc::new(NotificationFanout::default()),
            ProcessorConfig::default(),
        )
        .start();
        let service = ComparisonService::new(requests.clone(), results, generator, Arc::new(handle));
        (repo, requests, service)
    }

    fn submission(into: &str) -> SubmitRequest {
        SubmitRequest {
            repository_path: "/repo".into(),
            from_branch: "main".into(),
            into_branch: into.into(),
            requester_id: Some("alice".into()),
        }
    }

    async fn wait_terminal(service: &ComparisonService, id: &RequestId) -> ComparisonView {
        for _ in 0..200 {
            let view = service.get_result(id).unwrap();
            if view.status.is_terminal() {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("request {id} did not finish");
    }

    #[tokio::test]
    async fn submit_then_poll_completed() {
        let (repo, _requests, service) = service();
        let path = Path::new("/repo");
        repo.write_branch(path, "main", [("file.txt", "a\n")]);
        repo.write_branch(path, "feature/x", [("file.txt", "a\nb\n")]);

        let response = service.submit(submission("feature/x")).await.unwrap();
        assert_eq!(response.status, ComparisonStatus::Pending);

        let view = wait_terminal(&service, &response.request_id).await;
        assert_eq!(view.status, ComparisonStatus::Completed);
        assert_eq!(view.total_additions, Some(1));
        assert_eq!(view.total_modifications, Some(1));
        assert_eq!(view.file_diffs.as_ref().map(Vec::len), Some(1));
        assert!(view.completed_at.is_some());
        assert!(view.error_message.is_none());
    }

    #[tokio::test]
    async fn failed_request_has_no_diff_fields() {
        let (repo, _requests, service) = service();
        repo.write_branch(Path::new("/repo"), "main", [("a", "1")]);

        let response = service.submit(submission("ghost")).await.unwrap();
        let view = wait_terminal(&service, &response.request_id).await;
        assert_eq!(view.status, ComparisonStatus::Failed);
        assert!(view.error_message.is_some());
        assert!(view.file_diffs.is_none());
        assert!(view.total_additions.is_none());

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("fileDiffs").is_none());
        assert_eq!(json["fromBranch"], "main");
    }

    #[tokio::test]
    async fn invalid_submission_never_stored() {
        let (_repo, requests, service) = service();
        let err = service.submit(submission("")).await.unwrap_err();
        assert!(err.is_validation());

        let mut bad_path = submission("dev");
        bad_path.repository_path = PathBuf::new();
        assert!(service.submit(bad_path).await.unwrap_err().is_validation());

        assert!(requests.is_empty());
        assert_eq!(service.processor().queue_len(), 0);
    }

    #[tokio::test]
    async fn submit_after_shutdown_leaves_nothing_behind() {
        let (_repo, requests, service) = service();
        service.processor().shutdown().await;

        let err = service.submit(submission("dev")).await.unwrap_err();
        assert!(matches!(err, ProcessorError::ShuttingDown));
        assert!(requests.is_empty());
        assert!(service.list_requests(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_request_not_found() {
        let (_repo, _requests, service) = service();
        let err = service.get_result(&RequestId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn lists_branches_and_requests() {
        let (repo, _requests, service) = service();
        let path = Path::new("/repo");
        repo.write_branch(path, "main", [("a", "1")]);
        repo.write_branch(path, "dev", [("a", "2")]);

        assert_eq!(service.list_branches(path).await.unwrap(), vec!["dev", "main"]);

        let first = service.submit(submission("dev")).await.unwrap();
        let second = service.submit(submission("dev")).await.unwrap();
        let mine: Vec<RequestId> = service
            .list_requests(Some("alice"))
            .unwrap()
            .iter()
            .map(|r| r.request_id)
            .collect();
        assert_eq!(mine.len(), 2);
        assert!(mine.contains(&first.request_id) && mine.contains(&second.request_id));
        assert!(service.list_requests(Some("bob")).unwrap().is_empty());
    }
}
