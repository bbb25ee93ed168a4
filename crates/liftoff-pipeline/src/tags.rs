//! Dist-tag resolution

use liftoff_core::config::{PublishConfig, DEFAULT_DIST_TAG};
use liftoff_core::monorepo::PackageNode;

/// Tag every package is published under during two-phase tagging
pub const TEMP_TAG: &str = "lerna-temp";

/// Real dist-tag for one package.
///
/// An explicit tag other than the default wins over the package's
/// `publishConfig.tag`; otherwise the package override applies, then the
/// explicit tag, then `latest`.
pub fn resolve_tag(explicit: Option<&str>, package_override: Option<&str>) -> String {
    match (explicit, package_override) {
        (Some(tag), _) if tag != DEFAULT_DIST_TAG => tag.to_string(),
        (_, Some(tag)) => tag.to_string(),
        (Some(tag), None) => tag.to_string(),
        (None, None) => DEFAULT_DIST_TAG.to_string(),
    }
}

/// How packages are tagged at publish time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStrategy {
    /// Publish straight under the resolved tag
    Direct,
    /// Publish under [`TEMP_TAG`] and promote once everything is up
    TwoPhase,
}

impl TagStrategy {
    /// Strategy selected by the configuration
    pub fn from_config(config: &PublishConfig) -> Self {
        if config.temp_tag {
            Self::TwoPhase
        } else {
            Self::Direct
        }
    }

    /// Tag used when uploading `node`
    pub fn publish_tag(&self, config: &PublishConfig, node: &PackageNode) -> String {
        match self {
            Self::TwoPhase => TEMP_TAG.to_string(),
            Self::Direct => final_tag(config, node),
        }
    }
}

/// Tag `node` is reachable under once the run completes
pub fn final_tag(config: &PublishConfig, node: &PackageNode) -> String {
    resolve_tag(
        config.dist_tag.as_deref(),
        node.manifest.publish_config_tag(),
    )
}
