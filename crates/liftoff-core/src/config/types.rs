//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dist-tag used when none is configured
pub const DEFAULT_DIST_TAG: &str = "latest";

/// Main configuration for liftoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version of the config schema
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Glob patterns (relative to the root) locating package directories
    pub packages: Vec<String>,

    /// Publishing configuration
    pub publish: PublishConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: None,
            packages: vec!["packages/*".to_string()],
            publish: PublishConfig::default(),
        }
    }
}

/// Which dependency edges constrain publish order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    /// Every edge except devDependencies
    #[default]
    Runtime,
    /// Every edge, devDependencies included
    All,
}

impl std::fmt::Display for GraphType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Runtime => write!(f, "runtime"),
            Self::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for GraphType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "runtime" | "dependencies" => Ok(Self::Runtime),
            "all" => Ok(Self::All),
            _ => Err(format!("Unknown graph type: {}", s)),
        }
    }
}

/// Immutable settings for one publish run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Rewrite in-set sibling ranges to the (canary) versions being published
    pub canary: bool,

    /// Dist-tag to publish under
    pub dist_tag: Option<String>,

    /// Publish under a temporary tag, then promote once everything is up
    pub temp_tag: bool,

    /// Check out committed manifests after publishing
    pub git_reset: bool,

    /// Verify registry write access before publishing
    pub verify_access: bool,

    /// Fail instead of skipping access checks when no identity resolves
    pub require_identity: bool,

    /// Run `scripts/prepublish` and `scripts/postpublish` in each package
    pub require_scripts: bool,

    /// Subdirectory of each package to pack instead of its root
    pub contents: Option<PathBuf>,

    /// Maximum concurrent publish and tag operations
    pub concurrency: usize,

    /// Maximum concurrent pack operations
    pub pack_concurrency: Option<usize>,

    /// Pin sibling versions exactly instead of with a caret
    pub exact: bool,

    /// Registry URL (defaults to the public npm registry)
    pub registry: Option<String>,

    /// Explicit gitHead value instead of the current commit
    pub git_head: Option<String>,

    /// Publish in dependency-ordered batches
    pub sort: bool,

    /// Fail on dependency cycles instead of warning
    pub reject_cycles: bool,

    /// Which edges constrain batch order
    pub graph_type: GraphType,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            canary: false,
            dist_tag: None,
            temp_tag: false,
            git_reset: true,
            verify_access: true,
            require_identity: false,
            require_scripts: false,
            contents: None,
            concurrency: default_concurrency(),
            pack_concurrency: None,
            exact: false,
            registry: None,
            git_head: None,
            sort: true,
            reject_cycles: false,
            graph_type: GraphType::default(),
        }
    }
}

impl PublishConfig {
    /// Version prefix written in front of rewritten sibling versions
    pub fn save_prefix(&self) -> &'static str {
        if self.exact {
            ""
        } else {
            "^"
        }
    }

    /// Effective pack concurrency, never above the publish cap
    pub fn effective_pack_concurrency(&self) -> usize {
        self.pack_concurrency
            .unwrap_or(DEFAULT_PACK_CONCURRENCY)
            .min(self.concurrency)
            .max(1)
    }

    /// Effective publish concurrency
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Default cap for concurrent pack operations
pub const DEFAULT_PACK_CONCURRENCY: usize = 2;

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
