//! Stage descriptors and the driver loop

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument};

use liftoff_adapters::{Packer, RegistryClient};
use liftoff_core::config::PublishConfig;
use liftoff_core::error::Result;
use liftoff_core::hooks::{
    ConventionalScripts, LifecycleContext, LifecycleRunner, ScriptLifecycleRunner, ScriptLocator,
};
use liftoff_core::monorepo::{PackageGraph, Project};
use liftoff_core::types::PublishReport;
use liftoff_core::vcs::VersionControl;

use crate::reporter::{PublishEvent, PublishReporter, TracingReporter};
use crate::stages;
use crate::state::RunState;

/// External collaborators a run talks to
#[derive(Clone)]
pub struct Collaborators {
    /// Registry access
    pub registry: Arc<dyn RegistryClient>,
    /// Produces pack artifacts
    pub packer: Arc<dyn Packer>,
    /// Version control; `None` skips the working-tree check and reset
    pub vcs: Option<Arc<dyn VersionControl>>,
    /// Runs manifest lifecycle scripts
    pub lifecycle: Arc<dyn LifecycleRunner>,
    /// Finds optional per-package scripts
    pub scripts: Arc<dyn ScriptLocator>,
    /// Receives progress events
    pub reporter: Arc<dyn PublishReporter>,
}

impl Collaborators {
    /// Collaborators with the default script runner, script lookup and tracing reporter
    pub fn new(registry: Arc<dyn RegistryClient>, packer: Arc<dyn Packer>) -> Self {
        Self {
            registry,
            packer,
            vcs: None,
            lifecycle: Arc::new(ScriptLifecycleRunner::new()),
            scripts: Arc::new(ConventionalScripts),
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Use a version-control collaborator
    pub fn with_vcs(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    /// Use a lifecycle runner
    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn LifecycleRunner>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Use a script locator
    pub fn with_scripts(mut self, scripts: Arc<dyn ScriptLocator>) -> Self {
        self.scripts = scripts;
        self
    }

    /// Use a reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn PublishReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Report a non-fatal condition
    pub fn warn(&self, message: impl Into<String>) {
        self.reporter.report(&PublishEvent::Warning {
            message: message.into(),
        });
    }
}

/// One step of the pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageKind {
    /// Registry identity and write access
    VerifyAccess,
    /// Find unlicensed packages and copy the root license into them
    PrepareLicenses,
    /// Refuse to run on uncommitted tracked changes
    VerifyWorkingTree,
    /// Pin in-set sibling specifiers to the canary versions
    CanaryRewrite,
    /// Replace `file:` style links with sibling versions
    ResolveLocalLinks,
    /// Record the commit in every manifest
    AnnotateGitHead,
    /// Write rewritten manifests to disk
    SerializeManifests,
    /// Produce pack artifacts, batch by batch
    Pack,
    /// Upload pack artifacts, batch by batch
    Publish,
    /// Restore committed manifests
    ResetWorkingTree,
    /// Move packages from the temporary tag to their real tag
    PromoteTags,
}

impl StageKind {
    /// Every stage in execution order
    pub const ALL: [StageKind; 11] = [
        StageKind::VerifyAccess,
        StageKind::PrepareLicenses,
        StageKind::VerifyWorkingTree,
        StageKind::CanaryRewrite,
        StageKind::ResolveLocalLinks,
        StageKind::AnnotateGitHead,
        StageKind::SerializeManifests,
        StageKind::Pack,
        StageKind::Publish,
        StageKind::ResetWorkingTree,
        StageKind::PromoteTags,
    ];

    /// Stage name used in events and errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::VerifyAccess => "verify-access",
            Self::PrepareLicenses => "prepare-licenses",
            Self::VerifyWorkingTree => "verify-working-tree",
            Self::CanaryRewrite => "canary-rewrite",
            Self::ResolveLocalLinks => "resolve-local-links",
            Self::AnnotateGitHead => "annotate-git-head",
            Self::SerializeManifests => "serialize-manifests",
            Self::Pack => "pack",
            Self::Publish => "publish",
            Self::ResetWorkingTree => "reset-working-tree",
            Self::PromoteTags => "promote-tags",
        }
    }

    /// Whether the stage is part of a run with `config`
    pub fn applies(&self, config: &PublishConfig) -> bool {
        match self {
            Self::VerifyAccess => config.verify_access,
            Self::CanaryRewrite => config.canary,
            Self::ResetWorkingTree => config.git_reset,
            Self::PromoteTags => config.temp_tag,
            _ => true,
        }
    }

    /// Whether a failure here leaves rewritten manifests on disk
    fn leaves_manifests_dirty(&self) -> bool {
        *self >= Self::SerializeManifests && *self < Self::ResetWorkingTree
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Drives a publish run through its stages
pub struct Pipeline {
    collaborators: Collaborators,
}

impl Pipeline {
    /// Create a pipeline
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Stages a run with `config` executes, in order
    pub fn stages(config: &PublishConfig) -> Vec<StageKind> {
        StageKind::ALL
            .into_iter()
            .filter(|stage| stage.applies(config))
            .collect()
    }

    /// Publish `publish_set` from `graph`.
    ///
    /// On failure temporary licenses are removed and, with `git_reset`,
    /// rewritten manifests are restored before the error is returned.
    #[instrument(skip_all, fields(packages = publish_set.len()))]
    pub async fn run(
        &self,
        project: Project,
        graph: PackageGraph,
        publish_set: &[String],
        config: PublishConfig,
        context: LifecycleContext,
    ) -> Result<PublishReport> {
        let started = Instant::now();
        let mut state = RunState::new(project, graph, publish_set, config, context)?;

        if state.plan.is_empty() {
            self.collaborators.warn("No changed packages to publish");
            return Ok(state.report());
        }

        let stages = Self::stages(&state.config);
        info!(
            packages = state.plan.package_count(),
            batches = state.plan.batches.len(),
            stages = stages.len(),
            "starting publish run"
        );

        for stage in &stages {
            self.collaborators
                .reporter
                .report(&PublishEvent::StageStarted { stage: stage.name() });
            debug!(stage = %stage, "running stage");

            if let Err(e) = self.run_stage(*stage, &mut state).await {
                error!(stage = %stage, error = %e, "stage failed");
                self.recover(*stage, &stages, &mut state);
                return Err(e);
            }
        }

        let report = state.report();
        self.collaborators.reporter.report(&PublishEvent::Completed {
            published: report.count(),
            duration: started.elapsed(),
        });
        Ok(report)
    }

    async fn run_stage(&self, stage: StageKind, state: &mut RunState) -> Result<()> {
        let deps = &self.collaborators;
        match stage {
            StageKind::VerifyAccess => stages::preconditions::verify_access(state, deps).await,
            StageKind::PrepareLicenses => stages::license::prepare_licenses(state, deps),
            StageKind::VerifyWorkingTree => stages::preconditions::verify_working_tree(state, deps),
            StageKind::CanaryRewrite => stages::rewrite::canary_rewrite(state),
            StageKind::ResolveLocalLinks => stages::rewrite::resolve_local_links(state),
            StageKind::AnnotateGitHead => {
                stages::rewrite::annotate_git_head(state, deps);
                Ok(())
            }
            StageKind::SerializeManifests => stages::rewrite::serialize_manifests(state),
            StageKind::Pack => stages::pack::pack(state, deps).await,
            StageKind::Publish => stages::publish::publish(state, deps).await,
            StageKind::ResetWorkingTree => {
                stages::rollback::reset_working_tree(state, deps);
                Ok(())
            }
            StageKind::PromoteTags => stages::promote::promote_tags(state, deps).await,
        }
    }

    /// Best-effort cleanup after `failed`; never escalates
    fn recover(&self, failed: StageKind, stages: &[StageKind], state: &mut RunState) {
        stages::license::remove_temp_licenses(state, &self.collaborators);

        if failed.leaves_manifests_dirty() && stages.contains(&StageKind::ResetWorkingTree) {
            info!("restoring manifests after failed {}", failed);
            stages::rollback::reset_working_tree(state, &self.collaborators);
        }
    }
}
