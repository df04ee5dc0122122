//! Repository backend that shells out to the `git` binary.
//!
//! Every call runs `git -C <repo> ...` as a child process with a null stdin.
//! Children are killed when the awaiting future is dropped, so cancelling a
//! comparison also stops its git processes.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{DiffError, Result};
use crate::repository::{RepositoryAccess, TreeListing};

/// Drives a local `git` executable.
#[derive(Clone, Debug)]
pub struct GitCliRepository {
    git_binary: PathBuf,
}

impl GitCliRepository {
    /// Use `git` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary("git")
    }

    pub fn with_binary(git_binary: impl Into<PathBuf>) -> Self {
        Self {
            git_binary: git_binary.into(),
        }
    }

    pub fn git_binary(&self) -> &Path {
        &self.git_binary
    }

    /// Run git in `repo` and return its stdout. A non-zero exit becomes
    /// [`DiffError::GitExecution`] carrying stderr.
    async fn run(&self, repo: &Path, args: &[&str]) -> Result<Vec<u8>> {
        let command = args.join(" ");
        trace!(repo = %repo.display(), %command, "running git");

        let output = Command::new(&self.git_binary)
            .arg("-C")
            .arg(repo)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DiffError::GitExecution {
                command: command.clone(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(%command, status = ?output.status.code(), %stderr, "git command failed");
            return Err(DiffError::GitExecution { command, stderr });
        }
        Ok(output.stdout)
    }
}

impl Default for GitCliRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepositoryAccess for GitCliRepository {
    async fn check_repository(&self, repo: &Path) -> Result<()> {
        let is_dir = tokio::fs::metadata(repo)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(DiffError::InvalidInput(format!(
                "repository path does not exist: {}",
                repo.display()
            )));
        }
        match self.run(repo, &["rev-parse", "--git-dir"]).await {
            Ok(_) => Ok(()),
            Err(DiffError::GitExecution { stderr, .. }) if stderr.contains("not a git repository") => {
                Err(DiffError::InvalidInput(format!(
                    "not a git repository: {}",
                    repo.display()
                )))
            }
            Err(e) => Err(e),
        }
    }

    async fn list_branches(&self, repo: &Path) -> Result<Vec<String>> {
        let stdout = self
            .run(repo, &["for-each-ref", "--format=%(refname:short)", "refs/heads/"])
            .await?;
        let mut branches: Vec<String> = String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        branches.sort();
        Ok(branches)
    }

    async fn list_tree(&self, repo: &Path, branch: &str) -> Result<TreeListing> {
        let refname = format!("refs/heads/{branch}");
        let stdout = self
            .run(repo, &["ls-tree", "-r", "-z", "--full-tree", &refname])
            .await?;
        Ok(parse_ls_tree(&stdout))
    }

    async fn read_blob(&self, repo: &Path, blob_id: &str) -> Result<Vec<u8>> {
        self.run(repo, &["cat-file", "blob", blob_id]).await
    }
}

/// Parse `git ls-tree -r -z` output, keeping regular blobs only.
///
/// Each record is `<mode> SP <type> SP <id> TAB <path>` terminated by NUL.
fn parse_ls_tree(stdout: &[u8]) -> TreeListing {
    let mut listing = TreeListing::new();
    for record in stdout.split(|b| *b == 0).filter(|r| !r.is_empty()) {
        let record = String::from_utf8_lossy(record);
        let Some((meta, path)) = record.split_once('\t') else {
            continue;
        };
        let mut fields = meta.split(' ');
        let (Some(_mode), Some(kind), Some(id)) = (fields.next(), fields.next(), fields.next()) else {
            continue;
        };
        if kind == "blob" {
            listing.insert(path.to_string(), id.to_string());
        }
    }
    listing
}
