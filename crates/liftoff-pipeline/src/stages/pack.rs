//! Pack stage

use std::sync::Arc;

use tracing::{debug, info};

use liftoff_adapters::PackRequest;
use liftoff_core::config::PublishConfig;
use liftoff_core::error::Result;
use liftoff_core::hooks::LifecycleStage;
use liftoff_core::monorepo::PackageNode;

use crate::pipeline::Collaborators;
use crate::reporter::PublishEvent;
use crate::scheduler::{job, settle_batch};
use crate::state::RunState;
use crate::stages::license::remove_temp_licenses;

const STAGE: &str = "pack";

/// Pack every batch in order, then drop the temporary licenses.
///
/// Temporary licenses are removed whether or not packing succeeded.
pub async fn pack(state: &mut RunState, deps: &Collaborators) -> Result<()> {
    let result = pack_batches(state, deps).await;
    remove_temp_licenses(state, deps);
    result?;

    if state.runs_root_lifecycle() {
        deps.lifecycle
            .run(&state.project.manifest, LifecycleStage::Postpack)
            .await?;
    }
    Ok(())
}

async fn pack_batches(state: &mut RunState, deps: &Collaborators) -> Result<()> {
    if state.runs_root_lifecycle() {
        for stage in LifecycleStage::before_pack() {
            deps.lifecycle.run(&state.project.manifest, *stage).await?;
        }
    } else {
        debug!(
            rooted_leaf = state.rooted_leaf,
            "skipping root lifecycle before pack"
        );
    }

    let limit = state.config.effective_pack_concurrency();
    let batches = state.plan.batches.clone();

    for (index, batch) in batches.into_iter().enumerate() {
        deps.reporter.report(&PublishEvent::BatchStarted {
            stage: STAGE,
            batch: index,
            packages: batch.clone(),
        });

        let mut jobs = Vec::with_capacity(batch.len());
        for name in batch {
            let node = state.node(&name)?.clone();
            jobs.push((
                name,
                job(pack_one(node, state.config.clone(), deps.clone())),
            ));
        }

        for (_, node) in settle_batch(STAGE, jobs, limit, &deps.reporter).await? {
            state.graph.replace(node);
        }
    }

    info!(packages = state.plan.package_count(), "packed");
    Ok(())
}

async fn pack_one(
    mut node: PackageNode,
    config: Arc<PublishConfig>,
    deps: Collaborators,
) -> Result<PackageNode> {
    if config.require_scripts {
        if let Some(script) = deps.scripts.locate(&node.location, "prepublish") {
            script.run(&node.location).await?;
        }
    }

    let request = PackRequest {
        package: node.name.clone(),
        source: node.pack_dir(config.contents.as_deref()),
        destination: node.location.clone(),
    };
    let artifact = deps.packer.pack(&request).await?;
    debug!(package = %node.name, tarball = %artifact.tarball.display(), "packed");

    node.set_packed(artifact)?;
    node.manifest.refresh()?;
    Ok(node)
}
