//! Error types for liftoff

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using LiftoffError
pub type Result<T> = std::result::Result<T, LiftoffError>;

/// Main error type for liftoff operations
#[derive(Debug, Error)]
pub enum LiftoffError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Git-related errors
    #[error(transparent)]
    Git(#[from] GitError),

    /// Manifest-related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Registry and packing errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Lifecycle hook errors
    #[error(transparent)]
    Hook(#[from] HookError),

    /// Pipeline errors
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Git-related errors
#[derive(Debug, Error)]
pub enum GitError {
    /// Not a git repository
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    /// Failed to open repository
    #[error("Failed to open repository: {0}")]
    OpenFailed(String),

    /// No commits found
    #[error("No commits found in repository")]
    NoCommits,

    /// Path lies outside the repository working directory
    #[error("Path {0} is outside the repository working directory")]
    OutsideWorkdir(PathBuf),

    /// Checkout of committed files failed
    #[error("Failed to check out {paths}: {reason}")]
    CheckoutFailed { paths: String, reason: String },

    /// Git2 library error
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),
}

/// Manifest-related errors
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Package manifest not found
    #[error("Package manifest not found at {0}")]
    NotFound(PathBuf),

    /// Failed to parse manifest
    #[error("Failed to parse manifest {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    /// Manifest is not a JSON object
    #[error("Manifest {0} is not a JSON object")]
    NotAnObject(PathBuf),

    /// Required field missing
    #[error("Manifest {path} is missing required field '{field}'")]
    MissingField { path: PathBuf, field: String },

    /// Failed to write manifest
    #[error("Failed to write manifest {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    /// Two packages share a name
    #[error("Package name '{name}' is used by both {first} and {second}")]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Registry and packing errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Registry rejected our credentials
    #[error("Authentication error against {registry}: {reason}")]
    AuthenticationFailed { registry: String, reason: String },

    /// Packing failed
    #[error("Failed to pack {package}: {reason}")]
    PackFailed { package: String, reason: String },

    /// Publish failed
    #[error("Failed to publish {package}: {reason}")]
    PublishFailed { package: String, reason: String },

    /// Dist-tag mutation failed
    #[error("Failed to {action} dist-tag '{tag}' on {spec}: {reason}")]
    DistTagFailed {
        action: &'static str,
        spec: String,
        tag: String,
        reason: String,
    },

    /// Command execution failed
    #[error("Command failed: {command} - {reason}")]
    CommandFailed { command: String, reason: String },

    /// Unexpected tool output
    #[error("Unexpected output from {command}: {reason}")]
    UnexpectedOutput { command: String, reason: String },
}

/// Lifecycle hook errors
#[derive(Debug, Error)]
pub enum HookError {
    /// Hook execution failed
    #[error("Lifecycle '{stage}' failed in {package}: {message}")]
    ExecutionFailed {
        stage: String,
        package: String,
        message: String,
    },

    /// Script execution failed
    #[error("Script {path} failed: {message}")]
    ScriptFailed { path: PathBuf, message: String },
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Tracked files changed since the last commit
    #[error(
        "Working tree has uncommitted changes, please commit or remove the following changes before continuing:\n{}",
        files.join("\n")
    )]
    WorkingTreeDirty { files: Vec<String> },

    /// Dependency cycles among packages being published
    #[error("Dependency cycles detected, you should fix these!\n{}", cycles.join("\n"))]
    CycleDetected { cycles: Vec<String> },

    /// Missing write permission on a package
    #[error("You do not have write permission required to publish \"{package}\"")]
    AccessDenied { package: String },

    /// Access verification demanded an identity that could not be resolved
    #[error("Unable to determine the registry user for {registry}; access cannot be verified")]
    IdentityUnavailable { registry: String },

    /// A package was packed twice in one run
    #[error("Package {0} was already packed in this run")]
    AlreadyPacked(String),

    /// A package has no pack artifact at publish time
    #[error("Package {0} has no pack artifact")]
    NotPacked(String),

    /// A package referenced by the publish set is missing from the graph
    #[error("Package {0} is not part of the package graph")]
    UnknownPackage(String),

    /// A stage failed for one package
    #[error("{stage} failed for {package}: {source}")]
    PackageFailed {
        stage: &'static str,
        package: String,
        #[source]
        source: Box<LiftoffError>,
    },

    /// A worker task panicked or was cancelled
    #[error("{stage} task for {package} did not complete: {reason}")]
    TaskAborted {
        stage: &'static str,
        package: String,
        reason: String,
    },
}

impl LiftoffError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Wrap this error as the failure of `stage` for `package`
    pub fn in_package(self, stage: &'static str, package: impl Into<String>) -> Self {
        PipelineError::PackageFailed {
            stage,
            package: package.into(),
            source: Box::new(self),
        }
        .into()
    }
}
