//! Package discovery in monorepos

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glob::glob;
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::graph::PackageGraph;
use super::manifest::{Manifest, MANIFEST_FILE};

/// Package discovery driven by glob patterns relative to the project root
pub struct PackageDiscovery {
    root: PathBuf,
    patterns: Vec<String>,
}

impl PackageDiscovery {
    /// Create a new package discovery instance
    pub fn new(root: impl Into<PathBuf>, patterns: Vec<String>) -> Self {
        Self {
            root: root.into(),
            patterns,
        }
    }

    /// Find the manifests of every package matched by the patterns
    pub fn manifests(&self) -> Result<Vec<Manifest>> {
        debug!(
            root = %self.root.display(),
            patterns = self.patterns.len(),
            "discovering packages"
        );
        let mut seen: BTreeSet<PathBuf> = BTreeSet::new();

        for pattern in &self.patterns {
            let full_pattern = if pattern == "." {
                self.root.to_string_lossy().to_string()
            } else {
                self.root.join(pattern).to_string_lossy().to_string()
            };

            let entries = glob(&full_pattern).map_err(|e| ConfigError::InvalidValue {
                field: "packages".to_string(),
                message: e.to_string(),
            })?;

            for entry in entries {
                let path = entry.map_err(|e| ConfigError::InvalidValue {
                    field: "packages".to_string(),
                    message: e.to_string(),
                })?;

                if is_vendored(&path) {
                    continue;
                }

                let manifest_path = if path.is_dir() {
                    path.join(MANIFEST_FILE)
                } else if path.file_name().is_some_and(|f| f == MANIFEST_FILE) {
                    path.clone()
                } else {
                    continue;
                };

                if manifest_path.exists() {
                    seen.insert(manifest_path);
                }
            }
        }

        let manifests = seen
            .iter()
            .map(|path| Manifest::load(path))
            .collect::<Result<Vec<_>>>()?;

        info!(count = manifests.len(), "discovered packages");
        Ok(manifests)
    }

    /// Discover packages and build their graph
    pub fn discover(&self) -> Result<PackageGraph> {
        PackageGraph::build(self.manifests()?)
    }
}

fn is_vendored(path: &Path) -> bool {
    path.components()
        .any(|c| c.as_os_str() == "node_modules")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monorepo::graph::SpecKind;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_npm_packages() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "package.json",
            r#"{"name": "my-monorepo", "private": true}"#,
        );
        write(
            temp.path(),
            "packages/core/package.json",
            r#"{"name": "@my/core", "version": "1.0.0"}"#,
        );
        write(
            temp.path(),
            "packages/utils/package.json",
            r#"{
                "name": "@my/utils",
                "version": "1.0.0",
                "dependencies": {
                    "@my/core": "file:../core"
                }
            }"#,
        );
        write(temp.path(), "packages/notes/README.md", "not a package");

        let discovery = PackageDiscovery::new(temp.path(), vec!["packages/*".to_string()]);
        let graph = discovery.discover().unwrap();

        assert_eq!(graph.len(), 2);
        let utils = graph.get("@my/utils").unwrap();
        assert_eq!(utils.location, temp.path().join("packages/utils"));
        assert_eq!(
            utils.local_dependencies["@my/core"].spec.kind,
            SpecKind::Directory
        );
    }

    #[test]
    fn test_overlapping_patterns_are_deduplicated() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "packages/a/package.json",
            r#"{"name": "a", "version": "1.0.0"}"#,
        );

        let discovery = PackageDiscovery::new(
            temp.path(),
            vec!["packages/*".to_string(), "packages/a".to_string()],
        );
        assert_eq!(discovery.manifests().unwrap().len(), 1);
    }

    #[test]
    fn test_node_modules_ignored() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "packages/a/package.json",
            r#"{"name": "a", "version": "1.0.0"}"#,
        );
        write(
            temp.path(),
            "packages/a/node_modules/dep/package.json",
            r#"{"name": "dep", "version": "1.0.0"}"#,
        );

        let discovery = PackageDiscovery::new(temp.path(), vec!["packages/**".to_string()]);
        let graph = discovery.discover().unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.contains("a"));
    }
}
