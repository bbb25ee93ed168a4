//! Package graph for monorepo packages

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use semver::{Version, VersionReq};
use tracing::debug;

use crate::config::GraphType;
use crate::error::{ManifestError, PipelineError, Result};
use crate::types::PackedArtifact;

use super::manifest::{DependencyEdge, Manifest};

/// How a local dependency specifier refers to its sibling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecKind {
    /// A version or range satisfied by the sibling's version
    Version,
    /// A filesystem reference (`file:`, `link:`, relative path)
    Directory,
    /// Anything else that still names the sibling (e.g. `workspace:`)
    Other,
}

/// A dependency specifier as written in a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    /// Raw specifier
    pub raw: String,
    /// Classification of the specifier
    pub kind: SpecKind,
}

impl DependencySpec {
    /// Classify `raw` against the version of the sibling it may point at.
    ///
    /// Returns `None` when the specifier does not resolve to the sibling,
    /// e.g. a range the sibling's version does not satisfy.
    pub fn classify(raw: &str, sibling_version: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let kind = if is_directory_spec(trimmed) {
            SpecKind::Directory
        } else if trimmed.starts_with("workspace:") {
            SpecKind::Other
        } else {
            let version = Version::parse(sibling_version).ok()?;
            let req = parse_range(trimmed)?;
            if !req.matches(&version) {
                return None;
            }
            SpecKind::Version
        };

        Some(Self {
            raw: raw.to_string(),
            kind,
        })
    }
}

fn is_directory_spec(spec: &str) -> bool {
    spec.starts_with("file:")
        || spec.starts_with("link:")
        || spec.starts_with("./")
        || spec.starts_with("../")
        || spec.starts_with('/')
        || spec.starts_with("~/")
}

/// Parse an npm-style range, which separates comparators with spaces
fn parse_range(spec: &str) -> Option<VersionReq> {
    if spec.is_empty() {
        return Some(VersionReq::STAR);
    }
    VersionReq::parse(spec).ok().or_else(|| {
        let joined = spec.split_whitespace().collect::<Vec<_>>().join(", ");
        VersionReq::parse(&joined).ok()
    })
}

/// A dependency on another package of the same graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDependency {
    /// The specifier as currently written
    pub spec: DependencySpec,
    /// Manifest collection declaring the dependency
    pub edge: DependencyEdge,
}

impl GraphType {
    /// Whether an edge of this collection constrains publish order
    pub fn includes(&self, edge: DependencyEdge) -> bool {
        match self {
            GraphType::Runtime => edge != DependencyEdge::DevDependencies,
            GraphType::All => true,
        }
    }
}

/// One publishable unit
#[derive(Debug, Clone)]
pub struct PackageNode {
    /// Package name
    pub name: String,
    /// Version to publish
    pub version: String,
    /// Package directory
    pub location: PathBuf,
    /// Private packages are never published
    pub private: bool,
    /// Backing `package.json`
    pub manifest: Manifest,
    /// Dependencies on other packages of the graph, keyed by name
    pub local_dependencies: BTreeMap<String, LocalDependency>,
    packed: Option<PackedArtifact>,
}

impl PackageNode {
    /// Create a node from a manifest; name and version are required
    pub fn from_manifest(manifest: Manifest) -> Result<Self> {
        let name = manifest
            .name()
            .ok_or_else(|| ManifestError::MissingField {
                path: manifest.path().to_path_buf(),
                field: "name".to_string(),
            })?
            .to_string();
        let version = manifest
            .version()
            .ok_or_else(|| ManifestError::MissingField {
                path: manifest.path().to_path_buf(),
                field: "version".to_string(),
            })?
            .to_string();

        Ok(Self {
            name,
            version,
            location: manifest.dir().to_path_buf(),
            private: manifest.private(),
            manifest,
            local_dependencies: BTreeMap::new(),
            packed: None,
        })
    }

    /// Directory that gets packed: the package root or its `contents` subdirectory
    pub fn pack_dir(&self, contents: Option<&Path>) -> PathBuf {
        match contents {
            Some(sub) => self.location.join(sub),
            None => self.location.clone(),
        }
    }

    /// Names of local dependencies whose edge is included by `filter`
    pub fn dependency_names(&self, filter: GraphType) -> impl Iterator<Item = &str> {
        self.local_dependencies
            .iter()
            .filter(move |(_, dep)| filter.includes(dep.edge))
            .map(|(name, _)| name.as_str())
    }

    /// Pack artifact, once packed
    pub fn packed(&self) -> Option<&PackedArtifact> {
        self.packed.as_ref()
    }

    /// Record the pack artifact; a package is packed at most once per run
    pub fn set_packed(&mut self, artifact: PackedArtifact) -> Result<()> {
        if self.packed.is_some() {
            return Err(PipelineError::AlreadyPacked(self.name.clone()).into());
        }
        self.packed = Some(artifact);
        Ok(())
    }

    /// Rewrite a local dependency specifier in both the node and its manifest
    pub fn rewrite_dependency(&mut self, name: &str, spec: String) {
        self.manifest.set_dependency(name, &spec);
        if let Some(dep) = self.local_dependencies.get_mut(name) {
            dep.spec.raw = spec;
            dep.spec.kind = SpecKind::Version;
        }
    }
}

/// Package graph, nodes keyed by name
#[derive(Debug, Clone, Default)]
pub struct PackageGraph {
    nodes: BTreeMap<String, PackageNode>,
}

impl PackageGraph {
    /// Build a graph from package manifests, resolving local dependencies
    pub fn build(manifests: Vec<Manifest>) -> Result<Self> {
        let mut nodes: BTreeMap<String, PackageNode> = BTreeMap::new();

        for manifest in manifests {
            let node = PackageNode::from_manifest(manifest)?;
            if let Some(existing) = nodes.get(&node.name) {
                return Err(ManifestError::DuplicateName {
                    name: node.name.clone(),
                    first: existing.location.clone(),
                    second: node.location.clone(),
                }
                .into());
            }
            nodes.insert(node.name.clone(), node);
        }

        let versions: BTreeMap<String, String> = nodes
            .iter()
            .map(|(name, node)| (name.clone(), node.version.clone()))
            .collect();

        for node in nodes.values_mut() {
            for edge in DependencyEdge::LOOKUP_ORDER {
                for (dep_name, raw) in node.manifest.dependencies(edge) {
                    if dep_name == node.name || node.local_dependencies.contains_key(&dep_name) {
                        continue;
                    }
                    let Some(sibling_version) = versions.get(&dep_name) else {
                        continue;
                    };
                    match DependencySpec::classify(&raw, sibling_version) {
                        Some(spec) => {
                            node.local_dependencies
                                .insert(dep_name, LocalDependency { spec, edge });
                        }
                        None => debug!(
                            package = %node.name,
                            dependency = %dep_name,
                            spec = %raw,
                            "specifier does not resolve to the local package"
                        ),
                    }
                }
            }
        }

        debug!(count = nodes.len(), "built package graph");
        Ok(Self { nodes })
    }

    /// Build a graph from already-constructed nodes
    pub fn from_nodes(nodes: impl IntoIterator<Item = PackageNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.name.clone(), n)).collect(),
        }
    }

    /// Get a package node
    pub fn get(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.get(name)
    }

    /// Get a mutable package node
    pub fn get_mut(&mut self, name: &str) -> Option<&mut PackageNode> {
        self.nodes.get_mut(name)
    }

    /// Whether the graph contains `name`
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// All nodes, ordered by name
    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.nodes.values()
    }

    /// All nodes, mutably
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut PackageNode> {
        self.nodes.values_mut()
    }

    /// Number of packages
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Replace a node, e.g. with the copy a worker task mutated
    pub fn replace(&mut self, node: PackageNode) {
        self.nodes.insert(node.name.clone(), node);
    }

    /// Names of the non-private packages
    pub fn publishable_names(&self) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| !n.private)
            .map(|n| n.name.clone())
            .collect()
    }
}
