//! In-memory manifest rewrites and their serialization

use std::collections::BTreeMap;

use tracing::{debug, warn};

use liftoff_core::error::Result;
use liftoff_core::monorepo::SpecKind;

use crate::pipeline::Collaborators;
use crate::state::RunState;

/// Set canary versions and pin in-set sibling specifiers to them.
///
/// Directory links and non-registry specifiers are left alone, as are
/// dependencies on packages outside the publish set.
pub fn canary_rewrite(state: &mut RunState) -> Result<()> {
    let prefix = state.config.save_prefix();
    let versions: BTreeMap<String, String> = state
        .to_publish()
        .map(|node| (node.name.clone(), node.version.clone()))
        .collect();

    for name in state.publish_names() {
        let node = state.node_mut(&name)?;
        let version = node.version.clone();
        node.manifest.set_version(&version);

        let rewrites: Vec<(String, String)> = node
            .local_dependencies
            .iter()
            .filter(|(_, dep)| !matches!(dep.spec.kind, SpecKind::Directory | SpecKind::Other))
            .filter_map(|(dep, _)| {
                versions
                    .get(dep)
                    .map(|v| (dep.clone(), format!("{}{}", prefix, v)))
            })
            .collect();

        for (dep, spec) in rewrites {
            debug!(package = %name, dependency = %dep, spec = %spec, "canary rewrite");
            node.rewrite_dependency(&dep, spec);
        }
    }

    Ok(())
}

/// Replace directory links with the linked sibling's version
pub fn resolve_local_links(state: &mut RunState) -> Result<()> {
    let prefix = state.config.save_prefix();

    for name in state.publish_names() {
        let links: Vec<(String, String)> = state
            .node(&name)?
            .local_dependencies
            .iter()
            .filter(|(_, dep)| dep.spec.kind == SpecKind::Directory)
            .filter_map(|(dep, _)| {
                state
                    .graph
                    .get(dep)
                    .map(|sibling| (dep.clone(), format!("{}{}", prefix, sibling.version)))
            })
            .collect();

        let node = state.node_mut(&name)?;
        for (dep, spec) in links {
            debug!(package = %name, dependency = %dep, spec = %spec, "resolved local link");
            node.rewrite_dependency(&dep, spec);
        }
    }

    Ok(())
}

/// Record the commit in every manifest to publish; failure only warns
pub fn annotate_git_head(state: &mut RunState, deps: &Collaborators) {
    let sha = match (&state.config.git_head, &deps.vcs) {
        (Some(sha), _) => sha.clone(),
        (None, Some(vcs)) => match vcs.head_sha() {
            Ok(sha) => sha,
            Err(e) => {
                warn!(error = %e, "failed to read HEAD");
                deps.warn("Unable to set temporary gitHead property, it will be missing from registry metadata");
                return;
            }
        },
        (None, None) => {
            deps.warn("Unable to set temporary gitHead property, it will be missing from registry metadata");
            return;
        }
    };

    for name in state.publish_names() {
        if let Some(node) = state.graph.get_mut(&name) {
            node.manifest.set("gitHead", sha.as_str());
        }
    }
    debug!(git_head = %sha, "annotated manifests");
}

/// Write every manifest to publish back to disk
pub fn serialize_manifests(state: &RunState) -> Result<()> {
    for node in state.to_publish() {
        node.manifest.save()?;
    }
    Ok(())
}
