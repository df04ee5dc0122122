use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{DiffError, Result};
use crate::repository::{RepositoryAccess, TreeListing};

#[derive(Default)]
struct RepoState {
    branches: BTreeMap<String, TreeListing>,
    blobs: HashMap<String, Vec<u8>>,
    ignore_files: HashMap<(String, String), String>,
}

/// In-memory repository backend.
///
/// Intended for tests and embedding. Blobs are content-addressed by their
/// BLAKE3 digest, so identical content on two branches shares an id and is
/// skipped by the tree diff.
pub struct InMemoryRepository {
    repos: RwLock<HashMap<PathBuf, RepoState>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            repos: RwLock::new(HashMap::new()),
        }
    }

    /// Register an empty repository at `path`.
    pub fn create_repository(&self, path: impl Into<PathBuf>) {
        self.repos
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.into())
            .or_default();
    }

    /// Point `branch` at a tree holding exactly `files`, creating the
    /// repository if needed.
    pub fn write_branch<P, C>(&self, repo: &Path, branch: &str, files: impl IntoIterator<Item = (P, C)>)
    where
        P: Into<String>,
        C: AsRef<[u8]>,
    {
        let mut repos = self.repos.write().unwrap_or_else(PoisonError::into_inner);
        let state = repos.entry(repo.to_path_buf()).or_default();

        let mut tree = TreeListing::new();
        for (path, content) in files {
            let content = content.as_ref();
            let id = blake3::hash(content).to_hex().to_string();
            state.blobs.entry(id.clone()).or_insert_with(|| content.to_vec());
            tree.insert(path.into(), id);
        }
        state.branches.insert(branch.to_string(), tree);
    }

    /// Set the ignore file `file_name` of directory `dir`.
    pub fn set_ignore_file(&self, repo: &Path, dir: &str, file_name: &str, content: impl Into<String>) {
        let mut repos = self.repos.write().unwrap_or_else(PoisonError::into_inner);
        repos
            .entry(repo.to_path_buf())
            .or_default()
            .ignore_files
            .insert((dir.to_string(), file_name.to_string()), content.into());
    }

    fn with_repo<T>(&self, repo: &Path, f: impl FnOnce(&RepoState) -> Result<T>) -> Result<T> {
        let repos = self.repos.read().unwrap_or_else(PoisonError::into_inner);
        match repos.get(repo) {
            Some(state) => f(state),
            None => Err(not_a_repository(repo)),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.repos.read().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("InMemoryRepository")
            .field("repository_count", &count)
            .finish()
    }
}

#[async_trait]
impl RepositoryAccess for InMemoryRepository {
    async fn check_repository(&self, repo: &Path) -> Result<()> {
        self.with_repo(repo, |_| Ok(()))
    }

    async fn list_branches(&self, repo: &Path) -> Result<Vec<String>> {
        self.with_repo(repo, |state| Ok(state.branches.keys().cloned().collect()))
    }

    async fn list_tree(&self, repo: &Path, branch: &str) -> Result<TreeListing> {
        self.with_repo(repo, |state| {
            state
                .branches
                .get(branch)
                .cloned()
                .ok_or_else(|| DiffError::BranchNotFound {
                    branch: branch.to_string(),
                    repository: repo.display().to_string(),
                })
        })
    }

    async fn read_blob(&self, repo: &Path, blob_id: &str) -> Result<Vec<u8>> {
        self.with_repo(repo, |state| {
            state
                .blobs
                .get(blob_id)
                .cloned()
                .ok_or_else(|| DiffError::ObjectNotFound(blob_id.to_string()))
        })
    }

    async fn read_ignore_file(
        &self,
        repo: &Path,
        dir: &str,
        file_name: &str,
    ) -> Result<Option<String>> {
        self.with_repo(repo, |state| {
            Ok(state
                .ignore_files
                .get(&(dir.to_string(), file_name.to_string()))
                .cloned())
        })
    }
}

fn not_a_repository(repo: &Path) -> DiffError {
    DiffError::InvalidInput(format!("not a repository: {}", repo.display()))
}
