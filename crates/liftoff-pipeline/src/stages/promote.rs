//! Two-phase tag promotion

use tracing::{debug, info};

use liftoff_core::error::Result;

use crate::pipeline::Collaborators;
use crate::scheduler::{job, settle_batch};
use crate::state::RunState;
use crate::tags::{final_tag, TEMP_TAG};

const STAGE: &str = "promote";

/// Move every published package from the temporary tag to its real tag.
///
/// Per package the temporary tag is removed before the real one is added.
pub async fn promote_tags(state: &mut RunState, deps: &Collaborators) -> Result<()> {
    let mut jobs = Vec::with_capacity(state.published.len());

    for published in &state.published {
        let tag = final_tag(&state.config, state.node(&published.name)?);
        let registry = deps.registry.clone();
        let name = published.name.clone();
        let version = published.version.clone();

        jobs.push((
            published.name.clone(),
            job(async move {
                registry.remove_tag(&name, TEMP_TAG).await?;
                registry.add_tag(&name, &version, &tag).await?;
                debug!(package = %name, tag = %tag, "promoted");
                Ok(tag)
            }),
        ));
    }

    let limit = state.config.effective_concurrency();
    for (name, tag) in settle_batch(STAGE, jobs, limit, &deps.reporter).await? {
        if let Some(published) = state.published.iter_mut().find(|p| p.name == name) {
            published.tag = tag;
        }
    }

    info!(packages = state.published.len(), "promoted dist-tags");
    Ok(())
}
