//! Stage bodies, one module per concern

pub mod license;
pub mod pack;
pub mod preconditions;
pub mod promote;
pub mod publish;
pub mod rewrite;
pub mod rollback;
