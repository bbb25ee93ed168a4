//! liftoff git - git operations for publish runs
//!
//! This crate provides the git2-backed implementation of the version-control
//! collaborator: working-tree status, the current commit, and restoring
//! committed files.

mod checkout;
mod repository;
mod status;
mod vcs;

pub use repository::{GitRepo, Result};
