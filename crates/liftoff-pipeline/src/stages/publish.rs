//! Publish stage

use std::sync::Arc;

use tracing::info;

use liftoff_adapters::PublishRequest;
use liftoff_core::config::PublishConfig;
use liftoff_core::error::{PipelineError, Result};
use liftoff_core::hooks::LifecycleStage;
use liftoff_core::monorepo::PackageNode;
use liftoff_core::types::PublishedPackage;

use crate::pipeline::Collaborators;
use crate::reporter::PublishEvent;
use crate::scheduler::{job, settle_batch};
use crate::state::RunState;

const STAGE: &str = "publish";

/// Upload every batch in order, then run the root publish lifecycle
pub async fn publish(state: &mut RunState, deps: &Collaborators) -> Result<()> {
    let limit = state.config.effective_concurrency();
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
            let tag = state.tags.publish_tag(&state.config, &node);
            jobs.push((
                name,
                job(publish_one(node, tag, state.config.clone(), deps.clone())),
            ));
        }

        for (_, published) in settle_batch(STAGE, jobs, limit, &deps.reporter).await? {
            state.published.push(published);
        }
    }

    if state.runs_root_lifecycle() {
        for stage in LifecycleStage::after_publish() {
            deps.lifecycle.run(&state.project.manifest, *stage).await?;
        }
    }

    info!(packages = state.published.len(), "published");
    Ok(())
}

async fn publish_one(
    node: PackageNode,
    tag: String,
    config: Arc<PublishConfig>,
    deps: Collaborators,
) -> Result<PublishedPackage> {
    let artifact = node
        .packed()
        .ok_or_else(|| PipelineError::NotPacked(node.name.clone()))?;

    let request = PublishRequest {
        name: node.name.clone(),
        version: node.version.clone(),
        tarball: artifact.tarball.clone(),
        tag: tag.clone(),
        location: node.location.clone(),
    };
    deps.registry.publish(&request).await?;
    info!(package = %node.name, version = %node.version, tag = %tag, "published");

    if config.require_scripts {
        if let Some(script) = deps.scripts.locate(&node.location, "postpublish") {
            script.run(&node.location).await?;
        }
    }

    Ok(PublishedPackage {
        name: node.name,
        version: node.version,
        tag,
    })
}
