//! Version-control collaborator

use std::path::{Path, PathBuf};

use crate::error::Result;

/// The version-control operations a publish run needs
pub trait VersionControl: Send + Sync {
    /// Tracked paths (relative to the repository root) that differ from the last commit
    fn uncommitted_changes(&self) -> Result<Vec<String>>;

    /// Full hash of the current commit
    fn head_sha(&self) -> Result<String>;

    /// Restore `paths` to their committed content
    fn checkout(&self, paths: &[PathBuf]) -> Result<()>;

    /// Repository working directory
    fn workdir(&self) -> &Path;
}
