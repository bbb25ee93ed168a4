//! Restoring committed file content

use std::path::PathBuf;

use git2::build::CheckoutBuilder;
use tracing::{info, instrument};

use liftoff_core::error::GitError;

use crate::repository::{GitRepo, Result};

impl GitRepo {
    /// Overwrite `paths` with their content at HEAD
    #[instrument(skip(self), fields(count = paths.len()))]
    pub fn checkout_paths(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let relative = paths
            .iter()
            .map(|p| self.relative_path(p))
            .collect::<Result<Vec<_>>>()?;

        let mut builder = CheckoutBuilder::new();
        builder.force();
        for path in &relative {
            builder.path(path.as_path());
        }

        let repo = self.lock();
        repo.checkout_head(Some(&mut builder))
            .map_err(|e| GitError::CheckoutFailed {
                paths: relative
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                reason: e.message().to_string(),
            })?;

        info!(count = relative.len(), "restored committed files");
        Ok(())
    }
}
