//! Backend-neutral access to branches and file content.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use async_trait::async_trait;

use crate::error::{DiffError, Result};

/// Files reachable from a branch tip: repository-relative path to blob id.
pub type TreeListing = BTreeMap<String, String>;

/// Read access to a version-controlled repository.
///
/// Implementations must be safe to share between worker tasks.
#[async_trait]
pub trait RepositoryAccess: Send + Sync {
    /// Fail with [`DiffError::InvalidInput`] unless `repo` is a repository.
    /// A backend that cannot run at all reports [`DiffError::GitExecution`].
    async fn check_repository(&self, repo: &Path) -> Result<()>;

    /// Local branch names, sorted.
    async fn list_branches(&self, repo: &Path) -> Result<Vec<String>>;

    /// Every file reachable from the tip of `branch`.
    async fn list_tree(&self, repo: &Path, branch: &str) -> Result<TreeListing>;

    /// Raw content of a blob named in a [`TreeListing`].
    async fn read_blob(&self, repo: &Path, blob_id: &str) -> Result<Vec<u8>>;

    /// Content of the ignore file named `file_name` in directory `dir`
    /// (repository-relative, `""` for the root), or `None` if absent.
    ///
    /// The default reads the working tree on disk.
    async fn read_ignore_file(
        &self,
        repo: &Path,
        dir: &str,
        file_name: &str,
    ) -> Result<Option<String>> {
        let path = repo.join(dir).join(file_name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DiffError::Ignore(diffhub_ignore::IgnoreError::Read {
                path,
                source,
            })),
        }
    }
}
