//! Version-control collaborator backed by git

use std::path::{Path, PathBuf};

use liftoff_core::error::Result;
use liftoff_core::VersionControl;

use crate::repository::GitRepo;

impl VersionControl for GitRepo {
    fn uncommitted_changes(&self) -> Result<Vec<String>> {
        Ok(GitRepo::uncommitted_changes(self)?)
    }

    fn head_sha(&self) -> Result<String> {
        Ok(GitRepo::head_sha(self)?)
    }

    fn checkout(&self, paths: &[PathBuf]) -> Result<()> {
        Ok(self.checkout_paths(paths)?)
    }

    fn workdir(&self) -> &Path {
        self.path()
    }
}
