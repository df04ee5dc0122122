//! Branch-to-branch comparison.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use diffhub_ignore::{IgnoreMatcher, MemoryIgnoreSource};
use diffhub_types::{ChangeType, DiffResult, FileDiff, RequestId};

use crate::config::DiffConfig;
use crate::error::{DiffError, Result};
use crate::line_diff::{decode_text, diff_lines, whole_file};
use crate::names::validate_branch_name;
use crate::repository::RepositoryAccess;
use crate::tree_diff::{diff_trees, PathChange};

/// Produces a [`DiffResult`] for two branches of a repository.
///
/// Stateless apart from its backend and configuration; one generator can
/// serve any number of concurrent comparisons.
#[derive(Clone)]
pub struct DiffGenerator {
    repo: Arc<dyn RepositoryAccess>,
    config: DiffConfig,
}

impl DiffGenerator {
    pub fn new(repo: Arc<dyn RepositoryAccess>, config: DiffConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn RepositoryAccess> {
        &self.repo
    }

    /// Local branches of the repository at `repo_path`.
    pub async fn list_branches(&self, repo_path: &Path) -> Result<Vec<String>> {
        self.repo.check_repository(repo_path).await?;
        self.repo.list_branches(repo_path).await
    }

    /// Compare `from_branch` (old side) with `into_branch` (new side).
    ///
    /// Ignored paths are dropped using the ignore files of `repo_path`.
    /// Files whose content is identical on both sides are not reported.
    #[instrument(skip(self), fields(repo = %repo_path.display()))]
    pub async fn generate_diff(
        &self,
        request_id: RequestId,
        repo_path: &Path,
        from_branch: &str,
        into_branch: &str,
    ) -> Result<DiffResult> {
        validate_branch_name(from_branch)?;
        validate_branch_name(into_branch)?;
        self.repo.check_repository(repo_path).await?;

        let branches = self.repo.list_branches(repo_path).await?;
        for branch in [from_branch, into_branch] {
            if !branches.iter().any(|b| b == branch) {
                return Err(DiffError::BranchNotFound {
                    branch: branch.to_string(),
                    repository: repo_path.display().to_string(),
                });
            }
        }

        let (from_tree, into_tree) = tokio::try_join!(
            self.repo.list_tree(repo_path, from_branch),
            self.repo.list_tree(repo_path, into_branch),
        )?;
        let changes = diff_trees(&from_tree, &into_tree);
        debug!(candidates = changes.len(), "tree diff complete");

        let changes = self.drop_ignored(repo_path, changes).await?;

        let mut file_diffs = Vec::with_capacity(changes.len());
        for change in &changes {
            if let Some(file_diff) = self.file_diff(repo_path, change).await? {
                file_diffs.push(file_diff);
            }
        }

        let result = DiffResult::new(request_id, file_diffs);
        info!(
            %request_id,
            files = result.files_changed(),
            additions = result.total_additions,
            deletions = result.total_deletions,
            "diff generated"
        );
        Ok(result)
    }

    /// Read the ignore files of every directory above a changed path, then
    /// filter the changes through them.
    async fn drop_ignored(&self, repo_path: &Path, changes: Vec<PathChange>) -> Result<Vec<PathChange>> {
        if changes.is_empty() {
            return Ok(changes);
        }

        let mut dirs = BTreeSet::from([String::new()]);
        for change in &changes {
            let path = change.path();
            dirs.extend(path.match_indices('/').map(|(i, _)| path[..i].to_string()));
        }

        let mut source = MemoryIgnoreSource::new();
        for dir in &dirs {
            if let Some(content) = self
                .repo
                .read_ignore_file(repo_path, dir, &self.config.ignore_file_name)
                .await?
            {
                source.insert(dir, content);
            }
        }
        if source.is_empty() {
            return Ok(changes);
        }

        let mut matcher = IgnoreMatcher::new(source);
        let mut kept = Vec::with_capacity(changes.len());
        for change in changes {
            if matcher.is_ignored(change.path())? {
                debug!(path = change.path(), "ignored");
            } else {
                kept.push(change);
            }
        }
        Ok(kept)
    }

    async fn file_diff(&self, repo_path: &Path, change: &PathChange) -> Result<Option<FileDiff>> {
        let file_diff = match change {
            PathChange::Added { path, new_id } => {
                let new = self.repo.read_blob(repo_path, new_id).await?;
                match decode_text(&new) {
                    Some(text) => FileDiff::new(path.as_str(), ChangeType::Added, whole_file(text, true)),
                    None => FileDiff::binary(path.as_str(), ChangeType::Added),
                }
            }
            PathChange::Deleted { path, old_id } => {
                let old = self.repo.read_blob(repo_path, old_id).await?;
                match decode_text(&old) {
                    Some(text) => {
                        FileDiff::new(path.as_str(), ChangeType::Deleted, whole_file(text, false))
                    }
                    None => FileDiff::binary(path.as_str(), ChangeType::Deleted),
                }
            }
            PathChange::Modified { path, old_id, new_id } => {
                let (old, new) = tokio::try_join!(
                    self.repo.read_blob(repo_path, old_id),
                    self.repo.read_blob(repo_path, new_id),
                )?;
                if old == new {
                    return Ok(None);
                }
                match (decode_text(&old), decode_text(&new)) {
                    (Some(old), Some(new)) => {
                        let lines =
                            diff_lines(old, new, self.config.context_lines, self.config.algorithm);
                        if lines.is_empty() {
                            return Ok(None);
                        }
                        FileDiff::new(path.as_str(), ChangeType::Modified, lines)
                    }
                    _ => FileDiff::binary(path.as_str(), ChangeType::Modified),
                }
            }
        };
        Ok(Some(file_diff))
    }
}

impl std::fmt::Debug for DiffGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
