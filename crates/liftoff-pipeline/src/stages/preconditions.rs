//! Checks that run before anything is mutated

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::{debug, info};

use liftoff_adapters::{is_default_registry, DEFAULT_REGISTRY};
use liftoff_core::error::{PipelineError, Result};

use crate::pipeline::Collaborators;
use crate::state::RunState;

/// Verify the registry identity and write access on every package to publish.
///
/// Skipped for third-party registries. A missing identity only fails the run
/// when `require_identity` is set.
pub async fn verify_access(state: &RunState, deps: &Collaborators) -> Result<()> {
    let registry = state.config.registry.as_deref();
    if !is_default_registry(registry) {
        deps.warn("Skipping all user and access validation due to third-party registry");
        return Ok(());
    }

    let Some(user) = deps.registry.whoami().await? else {
        if state.config.require_identity {
            return Err(PipelineError::IdentityUnavailable {
                registry: registry.unwrap_or(DEFAULT_REGISTRY).to_string(),
            }
            .into());
        }
        deps.warn("Unable to determine the registry user, skipping access validation");
        return Ok(());
    };

    debug!(user = %user, "resolved registry identity");

    let Some(permissions) = deps.registry.access_list(&user).await? else {
        deps.warn("Registry does not support listing package access, skipping access validation");
        return Ok(());
    };

    for name in state.plan.names() {
        if let Some(level) = permissions.get(name) {
            if !level.can_publish() {
                return Err(PipelineError::AccessDenied {
                    package: name.to_string(),
                }
                .into());
            }
        }
    }

    info!(user = %user, "verified write access");
    Ok(())
}

/// Fail when tracked files differ from the last commit.
///
/// Temporary licenses created by this run are not counted.
pub fn verify_working_tree(state: &RunState, deps: &Collaborators) -> Result<()> {
    let Some(vcs) = &deps.vcs else {
        deps.warn("No version control available, skipping working tree check");
        return Ok(());
    };

    let workdir = vcs.workdir();
    let created: BTreeSet<PathBuf> = state
        .temp_licenses
        .iter()
        .filter_map(|path| path.strip_prefix(workdir).ok())
        .map(|path| path.to_path_buf())
        .collect();

    let dirty: Vec<String> = vcs
        .uncommitted_changes()?
        .into_iter()
        .filter(|path| !created.contains(&PathBuf::from(path)))
        .collect();

    if !dirty.is_empty() {
        return Err(PipelineError::WorkingTreeDirty { files: dirty }.into());
    }

    debug!("working tree is clean");
    Ok(())
}
