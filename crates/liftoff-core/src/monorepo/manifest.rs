//! Order-preserving `package.json` document

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ManifestError, Result};

/// Manifest file name
pub const MANIFEST_FILE: &str = "package.json";

/// Kinds of dependency collections, in rewrite-lookup order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyEdge {
    /// `dependencies`
    Dependencies,
    /// `optionalDependencies`
    OptionalDependencies,
    /// `devDependencies`
    DevDependencies,
    /// `peerDependencies`
    PeerDependencies,
}

impl DependencyEdge {
    /// Collections searched when rewriting a dependency
    pub const LOOKUP_ORDER: [DependencyEdge; 4] = [
        DependencyEdge::Dependencies,
        DependencyEdge::OptionalDependencies,
        DependencyEdge::DevDependencies,
        DependencyEdge::PeerDependencies,
    ];

    /// Manifest key of this collection
    pub fn key(&self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::OptionalDependencies => "optionalDependencies",
            Self::DevDependencies => "devDependencies",
            Self::PeerDependencies => "peerDependencies",
        }
    }
}

impl std::fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A parsed package manifest.
///
/// Keys keep their on-disk order so that writing the document back only
/// changes the values the pipeline touched.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    path: PathBuf,
    doc: Map<String, Value>,
}

impl Manifest {
    /// Build a manifest from an in-memory document
    pub fn new(path: impl Into<PathBuf>, doc: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            doc,
        }
    }

    /// Load a manifest from disk
    pub fn load(path: &Path) -> Result<Self> {
        let doc = read_document(path)?;
        Ok(Self::new(path, doc))
    }

    /// Load `package.json` from a package directory
    pub fn load_dir(dir: &Path) -> Result<Self> {
        Self::load(&dir.join(MANIFEST_FILE))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// Raw document
    pub fn doc(&self) -> &Map<String, Value> {
        &self.doc
    }

    /// Get a top-level value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }

    /// Set a top-level value, keeping its position when it already exists
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.doc.insert(key.to_string(), value.into());
    }

    /// Remove a top-level value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.doc.remove(key)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.doc.get(key).and_then(Value::as_str)
    }

    /// Package name
    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    /// Package version
    pub fn version(&self) -> Option<&str> {
        self.get_str("version")
    }

    /// Set the package version
    pub fn set_version(&mut self, version: &str) {
        self.set("version", version);
    }

    /// Whether the package is marked private
    pub fn private(&self) -> bool {
        self.doc
            .get("private")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// `scripts` entries
    pub fn scripts(&self) -> BTreeMap<String, String> {
        self.doc
            .get("scripts")
            .and_then(Value::as_object)
            .map(|scripts| {
                scripts
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A single script command
    pub fn script(&self, name: &str) -> Option<&str> {
        self.doc
            .get("scripts")
            .and_then(Value::as_object)
            .and_then(|s| s.get(name))
            .and_then(Value::as_str)
    }

    /// `publishConfig.tag`, if set
    pub fn publish_config_tag(&self) -> Option<&str> {
        self.doc
            .get("publishConfig")
            .and_then(Value::as_object)
            .and_then(|c| c.get("tag"))
            .and_then(Value::as_str)
    }

    /// Entries of one dependency collection
    pub fn dependencies(&self, edge: DependencyEdge) -> Vec<(String, String)> {
        self.doc
            .get(edge.key())
            .and_then(Value::as_object)
            .map(|deps| {
                deps.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First collection (in [`DependencyEdge::LOOKUP_ORDER`]) declaring `name`
    pub fn dependency_collection(&self, name: &str) -> Option<DependencyEdge> {
        DependencyEdge::LOOKUP_ORDER.into_iter().find(|edge| {
            self.doc
                .get(edge.key())
                .and_then(Value::as_object)
                .is_some_and(|deps| deps.contains_key(name))
        })
    }

    /// Rewrite the specifier of `name` in the first collection declaring it.
    ///
    /// Returns the collection that was updated, or `None` when no collection
    /// declares the dependency.
    pub fn set_dependency(&mut self, name: &str, spec: &str) -> Option<DependencyEdge> {
        let edge = self.dependency_collection(name)?;
        if let Some(deps) = self.doc.get_mut(edge.key()).and_then(Value::as_object_mut) {
            deps.insert(name.to_string(), Value::String(spec.to_string()));
        }
        Some(edge)
    }

    /// Render the document as written to disk: two-space indent plus a trailing newline
    pub fn to_json_string(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.doc)?;
        out.push('\n');
        Ok(out)
    }

    /// Write the document back to its file
    pub fn save(&self) -> Result<()> {
        let content = self.to_json_string()?;
        std::fs::write(&self.path, content).map_err(|e| ManifestError::WriteError {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        debug!(path = %self.path.display(), "wrote manifest");
        Ok(())
    }

    /// Re-read the document from disk, replacing in-memory state
    pub fn refresh(&mut self) -> Result<()> {
        self.doc = read_document(&self.path)?;
        Ok(())
    }
}

fn read_document(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Err(ManifestError::NotFound(path.to_path_buf()).into());
    }

    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content).map_err(|e| ManifestError::ParseError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    match value {
        Value::Object(doc) => Ok(doc),
        _ => Err(ManifestError::NotAnObject(path.to_path_buf()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn manifest(value: Value) -> Manifest {
        match value {
            Value::Object(doc) => Manifest::new("package.json", doc),
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_accessors() {
        let m = manifest(json!({
            "name": "@scope/pkg",
            "version": "1.2.3",
            "private": true,
            "scripts": { "prepack": "tsc" },
            "publishConfig": { "tag": "next" }
        }));

        assert_eq!(m.name(), Some("@scope/pkg"));
        assert_eq!(m.version(), Some("1.2.3"));
        assert!(m.private());
        assert_eq!(m.script("prepack"), Some("tsc"));
        assert_eq!(m.scripts().len(), 1);
        assert_eq!(m.publish_config_tag(), Some("next"));
    }

    #[test]
    fn test_set_dependency_uses_first_declaring_collection() {
        let mut m = manifest(json!({
            "name": "b",
            "devDependencies": { "a": "^1.0.0" },
            "optionalDependencies": { "a": "^1.0.0" },
            "peerDependencies": { "a": "^1.0.0" }
        }));

        let edge = m.set_dependency("a", "^2.0.0");
        assert_eq!(edge, Some(DependencyEdge::OptionalDependencies));
        assert_eq!(
            m.dependencies(DependencyEdge::OptionalDependencies),
            vec![("a".to_string(), "^2.0.0".to_string())]
        );
        assert_eq!(
            m.dependencies(DependencyEdge::DevDependencies),
            vec![("a".to_string(), "^1.0.0".to_string())]
        );
        assert_eq!(m.set_dependency("missing", "1.0.0"), None);
    }

    #[test]
    fn test_save_preserves_key_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("package.json");
        std::fs::write(
            &path,
            "{\"version\": \"1.0.0\", \"name\": \"z\", \"main\": \"index.js\"}",
        )
        .unwrap();

        let mut m = Manifest::load(&path).unwrap();
        m.set_version("2.0.0");
        m.set("gitHead", "abc123");
        m.save().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "{\n  \"version\": \"2.0.0\",\n  \"name\": \"z\",\n  \"main\": \"index.js\",\n  \"gitHead\": \"abc123\"\n}\n"
        );
    }

    #[test]
    fn test_refresh_rereads_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("package.json");
        std::fs::write(&path, "{\"name\": \"a\", \"version\": \"1.0.0\"}").unwrap();

        let mut m = Manifest::load(&path).unwrap();
        std::fs::write(&path, "{\"name\": \"a\", \"version\": \"1.0.1\"}").unwrap();
        m.refresh().unwrap();
        assert_eq!(m.version(), Some("1.0.1"));
    }

    #[test]
    fn test_load_errors() {
        let temp = TempDir::new().unwrap();
        assert!(Manifest::load_dir(temp.path()).is_err());

        let path = temp.path().join("package.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(Manifest::load(&path).is_err());
    }
}
