//! liftoff core - shared building blocks for publishing monorepo packages
//!
//! This crate provides the error taxonomy, configuration, manifest and
//! package graph types, dependency-ordered batching, lifecycle hooks and the
//! version-control collaborator trait used by the publish pipeline.

pub mod config;
pub mod error;
pub mod hooks;
pub mod monorepo;
pub mod types;
pub mod vcs;

pub use config::{Config, GraphType, PublishConfig};
pub use error::{LiftoffError, Result};
pub use hooks::{
    ConventionalScripts, LifecycleContext, LifecycleRunner, LifecycleStage, ScriptHandle,
    ScriptLifecycleRunner, ScriptLocator,
};
pub use monorepo::{
    batch_packages, BatchPlan, DependencyEdge, Manifest, PackageDiscovery, PackageGraph,
    PackageNode, Project,
};
pub use types::{PackedArtifact, PublishReport, PublishedPackage};
pub use vcs::VersionControl;
