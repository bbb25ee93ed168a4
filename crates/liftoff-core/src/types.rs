//! Core types for liftoff

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Artifact produced by packing one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedArtifact {
    /// Absolute path of the tarball
    pub tarball: PathBuf,
    /// Tarball file name
    pub filename: String,
    /// Subresource integrity string, when the packer reports one
    pub integrity: Option<String>,
    /// SHA-1 of the tarball, when the packer reports one
    pub shasum: Option<String>,
    /// Tarball size in bytes
    pub size: Option<u64>,
}

/// A package that made it to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPackage {
    /// Package name
    pub name: String,
    /// Published version
    pub version: String,
    /// Dist-tag the version is reachable under when the run ends
    pub tag: String,
}

/// Result of a successful publish run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    /// Published packages, in publish order
    pub published: Vec<PublishedPackage>,
}

impl PublishReport {
    /// Number of published packages
    pub fn count(&self) -> usize {
        self.published.len()
    }

    /// Whether nothing was published
    pub fn is_empty(&self) -> bool {
        self.published.is_empty()
    }
}
