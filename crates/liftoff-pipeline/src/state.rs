//! In-memory state of one publish run

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use liftoff_core::config::PublishConfig;
use liftoff_core::error::{PipelineError, Result};
use liftoff_core::hooks::LifecycleContext;
use liftoff_core::monorepo::{batch_packages, BatchPlan, PackageGraph, PackageNode, Project};
use liftoff_core::types::{PublishReport, PublishedPackage};

use crate::tags::TagStrategy;

/// Everything a run accumulates between stages
#[derive(Debug)]
pub struct RunState {
    /// Repository root
    pub project: Project,
    /// Package graph; stages replace nodes they mutate
    pub graph: PackageGraph,
    /// Configuration shared by every stage and task
    pub config: Arc<PublishConfig>,
    /// Lifecycle the run was started from
    pub context: LifecycleContext,
    /// Dependency-ordered batches of the publish set
    pub plan: BatchPlan,
    /// How uploads are tagged
    pub tags: TagStrategy,
    /// Whether the root package is one of the graph's packages
    pub rooted_leaf: bool,
    /// Packages that received a temporary license
    pub licensed: Vec<String>,
    /// Temporary license files still on disk
    pub temp_licenses: Vec<PathBuf>,
    /// Packages published so far
    pub published: Vec<PublishedPackage>,
}

impl RunState {
    /// Resolve the publish set into batches.
    ///
    /// Cycles fail the run with `reject_cycles`; otherwise they are logged and
    /// the degraded order is kept.
    pub fn new(
        project: Project,
        graph: PackageGraph,
        publish_set: &[String],
        config: PublishConfig,
        context: LifecycleContext,
    ) -> Result<Self> {
        let plan = batch_packages(&graph, publish_set, config.graph_type, config.sort)?;

        if plan.has_cycles() {
            if config.reject_cycles {
                plan.ensure_acyclic()?;
            }
            warn!(
                "Dependency cycles detected, you should fix these!\n{}",
                plan.cycle_descriptions().join("\n")
            );
        }

        let rooted_leaf = project.is_rooted_leaf(&graph);
        debug!(
            packages = plan.package_count(),
            batches = plan.batches.len(),
            rooted_leaf,
            "resolved publish plan"
        );

        Ok(Self {
            project,
            graph,
            tags: TagStrategy::from_config(&config),
            config: Arc::new(config),
            context,
            plan,
            rooted_leaf,
            licensed: Vec::new(),
            temp_licenses: Vec::new(),
            published: Vec::new(),
        })
    }

    /// Names to publish, in batch order
    pub fn publish_names(&self) -> Vec<String> {
        self.plan.names().map(str::to_string).collect()
    }

    /// Whether `name` is part of the publish set
    pub fn is_publishing(&self, name: &str) -> bool {
        self.plan.names().any(|n| n == name)
    }

    /// A graph node that must exist
    pub fn node(&self, name: &str) -> Result<&PackageNode> {
        self.graph
            .get(name)
            .ok_or_else(|| PipelineError::UnknownPackage(name.to_string()).into())
    }

    /// A graph node that must exist, mutably
    pub fn node_mut(&mut self, name: &str) -> Result<&mut PackageNode> {
        self.graph
            .get_mut(name)
            .ok_or_else(|| PipelineError::UnknownPackage(name.to_string()).into())
    }

    /// Nodes to publish, in batch order
    pub fn to_publish(&self) -> impl Iterator<Item = &PackageNode> {
        self.plan.names().filter_map(|name| self.graph.get(name))
    }

    /// Whether root lifecycle scripts run in this run
    pub fn runs_root_lifecycle(&self) -> bool {
        !self.rooted_leaf && !self.context.skips_root_lifecycle()
    }

    /// Success value of the run
    pub fn report(&self) -> PublishReport {
        PublishReport {
            published: self.published.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftoff_core::error::LiftoffError;
    use liftoff_core::monorepo::Manifest;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &std::path::Path, value: serde_json::Value) -> Manifest {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join("package.json");
        std::fs::write(&path, value.to_string()).unwrap();
        Manifest::load(&path).unwrap()
    }

    fn cyclic_fixture(temp: &TempDir) -> (Project, PackageGraph) {
        write(temp.path(), json!({"name": "root", "private": true}));
        let a = write(
            &temp.path().join("packages/a"),
            json!({"name": "a", "version": "1.0.0", "dependencies": {"b": "^1.0.0"}}),
        );
        let b = write(
            &temp.path().join("packages/b"),
            json!({"name": "b", "version": "1.0.0", "dependencies": {"a": "^1.0.0"}}),
        );
        let project = Project::load(temp.path()).unwrap();
        (project, PackageGraph::build(vec![a, b]).unwrap())
    }

    #[test]
    fn test_cycles_are_tolerated_by_default() {
        let temp = TempDir::new().unwrap();
        let (project, graph) = cyclic_fixture(&temp);
        let set = vec!["a".to_string(), "b".to_string()];

        let state = RunState::new(
            project,
            graph,
            &set,
            PublishConfig::default(),
            LifecycleContext::new(),
        )
        .unwrap();
        assert!(state.plan.has_cycles());
        assert_eq!(state.publish_names().len(), 2);
        assert!(!state.rooted_leaf);
    }

    #[test]
    fn test_reject_cycles() {
        let temp = TempDir::new().unwrap();
        let (project, graph) = cyclic_fixture(&temp);
        let set = vec!["a".to_string(), "b".to_string()];
        let config = PublishConfig {
            reject_cycles: true,
            ..Default::default()
        };

        let err = RunState::new(project, graph, &set, config, LifecycleContext::new()).unwrap_err();
        assert!(matches!(
            err,
            LiftoffError::Pipeline(PipelineError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_root_lifecycle_skipped_inside_publish_lifecycle() {
        let temp = TempDir::new().unwrap();
        let (project, graph) = cyclic_fixture(&temp);

        let state = RunState::new(
            project,
            graph,
            &[],
            PublishConfig::default(),
            LifecycleContext::inside("publish"),
        )
        .unwrap();
        assert!(!state.runs_root_lifecycle());
        assert!(state.plan.is_empty());
    }
}
