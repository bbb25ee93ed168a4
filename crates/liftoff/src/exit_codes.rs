//! Exit codes for the CLI

use liftoff_core::error::{LiftoffError, PipelineError};

/// General error
pub const ERROR: u8 = 1;

/// Configuration error
pub const CONFIG_ERROR: u8 = 2;

/// Git error
pub const GIT_ERROR: u8 = 3;

/// Registry, packing or lifecycle script error
pub const PUBLISH_ERROR: u8 = 4;

/// A precondition refused the run before anything was mutated
pub const PRECONDITION_ERROR: u8 = 5;

/// Exit code for a failed command
pub fn for_error(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<LiftoffError>() {
        Some(e) => for_liftoff_error(e),
        None => ERROR,
    }
}

fn for_liftoff_error(err: &LiftoffError) -> u8 {
    match err {
        LiftoffError::Config(_) => CONFIG_ERROR,
        LiftoffError::Git(_) => GIT_ERROR,
        LiftoffError::Registry(_) | LiftoffError::Hook(_) => PUBLISH_ERROR,
        LiftoffError::Pipeline(PipelineError::PackageFailed { source, .. }) => {
            for_liftoff_error(source)
        }
        LiftoffError::Pipeline(
            PipelineError::WorkingTreeDirty { .. }
            | PipelineError::CycleDetected { .. }
            | PipelineError::AccessDenied { .. }
            | PipelineError::IdentityUnavailable { .. },
        ) => PRECONDITION_ERROR,
        LiftoffError::Pipeline(PipelineError::TaskAborted { .. }) => PUBLISH_ERROR,
        _ => ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftoff_core::error::{ConfigError, RegistryError};

    #[test]
    fn test_codes_follow_the_error_domain() {
        let config: anyhow::Error = LiftoffError::from(ConfigError::InvalidValue {
            field: "publish.concurrency".to_string(),
            message: "must be at least 1".to_string(),
        })
        .into();
        assert_eq!(for_error(&config), CONFIG_ERROR);

        let dirty: anyhow::Error = LiftoffError::from(PipelineError::WorkingTreeDirty {
            files: vec!["a".to_string()],
        })
        .into();
        assert_eq!(for_error(&dirty), PRECONDITION_ERROR);

        assert_eq!(for_error(&anyhow::anyhow!("plain")), ERROR);
    }

    #[test]
    fn test_package_failure_uses_the_cause() {
        let err: anyhow::Error = LiftoffError::from(RegistryError::PackFailed {
            package: "b".to_string(),
            reason: "boom".to_string(),
        })
        .in_package("pack", "b")
        .into();
        assert_eq!(for_error(&err), PUBLISH_ERROR);
    }
}
