//! Repository root: root manifest and license

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::error::Result;

use super::graph::PackageGraph;
use super::manifest::Manifest;

/// The repository being published from
#[derive(Debug, Clone)]
pub struct Project {
    /// Repository root directory
    pub root: PathBuf,
    /// Root `package.json`
    pub manifest: Manifest,
    /// Root license file, if any
    pub license_path: Option<PathBuf>,
}

impl Project {
    /// Load the project rooted at `root`
    pub fn load(root: &Path) -> Result<Self> {
        let manifest = Manifest::load_dir(root)?;
        let license_path = find_license(root)?;
        debug!(
            root = %root.display(),
            license = ?license_path,
            "loaded project"
        );
        Ok(Self {
            root: root.to_path_buf(),
            manifest,
            license_path,
        })
    }

    /// Whether the root package is itself one of the graph's packages
    pub fn is_rooted_leaf(&self, graph: &PackageGraph) -> bool {
        graph.nodes().any(|node| same_dir(&node.location, &self.root))
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// First license file (`LICENSE`, `LICENCE`, optionally with an extension) in `dir`
pub fn find_license(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let pattern = Regex::new(r"(?i)^licen[sc]e(\.[a-z0-9]+)?$")
        .map_err(|e| crate::error::LiftoffError::other(e.to_string()))?;

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| pattern.is_match(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .collect();

    candidates.sort();
    Ok(candidates.into_iter().next())
}
