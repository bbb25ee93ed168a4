//! Working-tree reset

use std::path::PathBuf;

use tracing::{info, warn};

use crate::pipeline::Collaborators;
use crate::state::RunState;

/// Restore the committed manifests of every package to publish and of the root.
///
/// Never fails; problems are reported as warnings.
pub fn reset_working_tree(state: &RunState, deps: &Collaborators) {
    let Some(vcs) = &deps.vcs else {
        deps.warn("No version control available, rewritten manifests were not restored");
        return;
    };

    let mut paths: Vec<PathBuf> = state
        .to_publish()
        .map(|node| node.manifest.path().to_path_buf())
        .collect();
    paths.push(state.project.manifest.path().to_path_buf());

    match vcs.checkout(&paths) {
        Ok(()) => info!(files = paths.len(), "reset working tree"),
        Err(e) => {
            warn!(error = %e, "failed to reset working tree");
            deps.warn(format!("Unable to reset working tree changes: {}", e));
        }
    }
}
