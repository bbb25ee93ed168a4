//! Monorepo support for multi-package repositories
//!
//! - Package discovery with glob patterns
//! - Order-preserving manifest documents
//! - Package graph with local dependency resolution
//! - Dependency-ordered batching

pub mod batch;
pub mod discovery;
pub mod graph;
pub mod manifest;
pub mod project;

pub use batch::{batch_packages, BatchPlan};
pub use discovery::PackageDiscovery;
pub use graph::{DependencySpec, LocalDependency, PackageGraph, PackageNode, SpecKind};
pub use manifest::{DependencyEdge, Manifest, MANIFEST_FILE};
pub use project::{find_license, Project};
