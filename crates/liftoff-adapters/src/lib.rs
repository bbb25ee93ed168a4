//! liftoff adapters - packing and registry access
//!
//! This crate defines the [`Packer`] and [`RegistryClient`] collaborator
//! traits consumed by the publish pipeline, plus an implementation of both
//! that drives the `npm` command line.

pub mod npm;
pub mod registry;
pub mod traits;

pub use npm::NpmCli;
pub use registry::{is_default_registry, DEFAULT_REGISTRY};
pub use traits::{AccessLevel, PackRequest, Packer, PublishRequest, RegistryClient};
