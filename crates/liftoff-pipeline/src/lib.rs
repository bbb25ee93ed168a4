//! liftoff pipeline - batched topological publishing
//!
//! This crate drives a publish run: precondition checks, manifest rewrites,
//! dependency-ordered batches of pack and publish work on a bounded pool of
//! tokio tasks, two-phase dist-tag promotion, and cleanup of everything the
//! run touched locally.

pub mod pipeline;
pub mod reporter;
pub mod scheduler;
pub mod stages;
pub mod state;
pub mod tags;

pub use pipeline::{Collaborators, Pipeline, StageKind};
pub use reporter::{
    CollectingReporter, FanoutReporter, PublishEvent, PublishReporter, TracingReporter,
};
pub use scheduler::{settle_batch, PackageJob};
pub use state::RunState;
pub use tags::{final_tag, resolve_tag, TagStrategy, TEMP_TAG};
