//! Packing and registry collaborator traits

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use liftoff_core::error::Result;
use liftoff_core::types::PackedArtifact;

/// What to pack and where the tarball goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRequest {
    /// Package name, for error reporting
    pub package: String,
    /// Directory to pack (package root or its contents subdirectory)
    pub source: PathBuf,
    /// Directory receiving the tarball
    pub destination: PathBuf,
}

/// Produces pack artifacts
#[async_trait]
pub trait Packer: Send + Sync {
    /// Pack `request.source` into a tarball in `request.destination`
    async fn pack(&self, request: &PackRequest) -> Result<PackedArtifact>;
}

/// One publish upload, with its per-package tag already resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Package name
    pub name: String,
    /// Version being published
    pub version: String,
    /// Tarball to upload
    pub tarball: PathBuf,
    /// Dist-tag to publish under
    pub tag: String,
    /// Package directory
    pub location: PathBuf,
}

/// Permission a user holds on a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    /// May install only
    #[serde(rename = "read-only")]
    ReadOnly,
    /// May publish
    #[serde(rename = "read-write")]
    ReadWrite,
}

impl AccessLevel {
    /// Whether this level allows publishing
    pub fn can_publish(&self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// Registry operations used during a publish run
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Authenticated user name, `None` when no identity resolves
    async fn whoami(&self) -> Result<Option<String>>;

    /// Packages `user` holds permissions on; `None` when the registry cannot list them
    async fn access_list(&self, user: &str) -> Result<Option<BTreeMap<String, AccessLevel>>>;

    /// Upload a pack artifact
    async fn publish(&self, request: &PublishRequest) -> Result<()>;

    /// Point `tag` at `name@version`
    async fn add_tag(&self, name: &str, version: &str, tag: &str) -> Result<()>;

    /// Remove `tag` from `name`
    async fn remove_tag(&self, name: &str, tag: &str) -> Result<()>;

    /// Whether `name@version` already exists on the registry
    async fn is_published(&self, name: &str, version: &str) -> Result<bool>;
}
