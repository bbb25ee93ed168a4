//! CLI commands

mod init;
mod plan;
mod publish;

pub use init::InitCommand;
pub use plan::PlanCommand;
pub use publish::PublishCommand;

use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use liftoff_core::config::{load_config_or_default, validate_publish, Config, GraphType, PublishConfig};
use liftoff_core::monorepo::{PackageDiscovery, PackageGraph, Project};

/// Flags overlaying the `[publish]` section of the configuration
#[derive(Debug, Clone, Default, Args)]
pub struct PublishOptions {
    /// Pin in-set sibling dependencies to the versions being published
    #[arg(long)]
    pub canary: bool,

    /// Dist-tag to publish under
    #[arg(long, value_name = "TAG")]
    pub dist_tag: Option<String>,

    /// Publish under a temporary tag and promote once every package is up
    #[arg(long)]
    pub temp_tag: bool,

    /// Leave rewritten manifests on disk after the run
    #[arg(long)]
    pub no_git_reset: bool,

    /// Skip registry identity and access checks
    #[arg(long)]
    pub no_verify_access: bool,

    /// Fail when the registry identity cannot be determined
    #[arg(long)]
    pub require_identity: bool,

    /// Run scripts/prepublish and scripts/postpublish of each package
    #[arg(long)]
    pub require_scripts: bool,

    /// Subdirectory of each package to pack
    #[arg(long, value_name = "DIR")]
    pub contents: Option<PathBuf>,

    /// Maximum concurrent publish operations
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Maximum concurrent pack operations
    #[arg(long, value_name = "N")]
    pub pack_concurrency: Option<usize>,

    /// Write exact sibling versions instead of caret ranges
    #[arg(long)]
    pub exact: bool,

    /// Registry URL
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// Commit hash recorded as gitHead instead of HEAD
    #[arg(long, value_name = "SHA")]
    pub git_head: Option<String>,

    /// Publish everything as one batch, ignoring dependency order
    #[arg(long)]
    pub no_sort: bool,

    /// Fail when packages depend on each other in a cycle
    #[arg(long)]
    pub reject_cycles: bool,

    /// Edges that order publishing: runtime or all
    #[arg(long, value_name = "TYPE")]
    pub graph_type: Option<GraphType>,
}

impl PublishOptions {
    /// Apply the flags on top of `config` and validate the result
    pub fn apply(&self, config: &PublishConfig) -> liftoff_core::Result<PublishConfig> {
        let mut config = config.clone();

        config.canary |= self.canary;
        config.temp_tag |= self.temp_tag;
        config.require_identity |= self.require_identity;
        config.require_scripts |= self.require_scripts;
        config.exact |= self.exact;
        config.reject_cycles |= self.reject_cycles;
        if self.no_git_reset {
            config.git_reset = false;
        }
        if self.no_verify_access {
            config.verify_access = false;
        }
        if self.no_sort {
            config.sort = false;
        }
        if let Some(tag) = &self.dist_tag {
            config.dist_tag = Some(tag.clone());
        }
        if let Some(contents) = &self.contents {
            config.contents = Some(contents.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(pack_concurrency) = self.pack_concurrency {
            config.pack_concurrency = Some(pack_concurrency);
        }
        if let Some(registry) = &self.registry {
            config.registry = Some(registry.clone());
        }
        if let Some(sha) = &self.git_head {
            config.git_head = Some(sha.clone());
        }
        if let Some(graph_type) = self.graph_type {
            config.graph_type = graph_type;
        }

        validate_publish(&config)?;
        Ok(config)
    }
}

/// The monorepo a command operates on
pub struct Workspace {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub project: Project,
    pub graph: PackageGraph,
}

impl Workspace {
    /// Load configuration, root project and package graph from the current directory
    pub fn load() -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let (config, config_path) = load_config_or_default(&cwd)?;
        let root = config_path
            .as_ref()
            .and_then(|path| path.parent())
            .map(PathBuf::from)
            .unwrap_or(cwd);

        let project = Project::load(&root)?;
        let graph = PackageDiscovery::new(&root, config.packages.clone()).discover()?;
        debug!(root = %root.display(), packages = graph.len(), "loaded workspace");

        Ok(Self {
            config,
            config_path,
            project,
            graph,
        })
    }
}
