//! Git repository operations

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use git2::Repository;
use tracing::{info, instrument};

use liftoff_core::error::GitError;

/// Result type for git operations
pub type Result<T> = std::result::Result<T, GitError>;

/// Git repository wrapper.
///
/// `git2::Repository` is not `Sync`, so access goes through a mutex to let
/// the publish pipeline share one handle across tasks.
pub struct GitRepo {
    repo: Mutex<Repository>,
    path: PathBuf,
}

impl GitRepo {
    /// Open a repository at the given path
    #[instrument(fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                GitError::NotARepository(path.to_path_buf())
            } else {
                GitError::OpenFailed(e.to_string())
            }
        })?;

        let path = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf());

        Ok(Self {
            repo: Mutex::new(repo),
            path,
        })
    }

    /// Discover and open a repository by searching parent directories
    #[instrument(fields(start_path = %start_path.display()))]
    pub fn discover(start_path: &Path) -> Result<Self> {
        info!(start_path = %start_path.display(), "discovering git repository");
        let repo = Repository::discover(start_path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                GitError::NotARepository(start_path.to_path_buf())
            } else {
                GitError::OpenFailed(e.to_string())
            }
        })?;

        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self {
            repo: Mutex::new(repo),
            path,
        })
    }

    /// Working directory of the repository
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Repository> {
        self.repo.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check if the repository is bare
    pub fn is_bare(&self) -> bool {
        self.lock().is_bare()
    }

    /// Full hash of the HEAD commit
    pub fn head_sha(&self) -> Result<String> {
        let repo = self.lock();
        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                return Err(GitError::NoCommits)
            }
            Err(e) => return Err(e.into()),
        };
        let commit = head.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    /// Express `path` relative to the working directory
    pub(crate) fn relative_path(&self, path: &Path) -> Result<PathBuf> {
        if path.is_relative() {
            return Ok(path.to_path_buf());
        }
        if let Ok(rel) = path.strip_prefix(&self.path) {
            return Ok(rel.to_path_buf());
        }

        // Symlinked temp dirs (e.g. /var -> /private/var) need canonical forms
        let canonical_root = self.path.canonicalize().ok();
        let canonical_path = path
            .canonicalize()
            .ok()
            .or_else(|| {
                let parent = path.parent()?.canonicalize().ok()?;
                Some(parent.join(path.file_name()?))
            });
        match (canonical_root, canonical_path) {
            (Some(root), Some(full)) => full
                .strip_prefix(&root)
                .map(Path::to_path_buf)
                .map_err(|_| GitError::OutsideWorkdir(path.to_path_buf())),
            _ => Err(GitError::OutsideWorkdir(path.to_path_buf())),
        }
    }
}
