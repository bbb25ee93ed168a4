//! Lifecycle hooks and convention-located package scripts
//!
//! Two kinds of user code run during a publish:
//! - manifest lifecycle scripts (`scripts.prepack` and friends), run through a
//!   [`LifecycleRunner`]
//! - optional per-package scripts found by convention at
//!   `<package>/scripts/<name>`, looked up through a [`ScriptLocator`]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{HookError, Result};
use crate::monorepo::Manifest;

/// Manifest lifecycle stages the pipeline triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleStage {
    /// `prepare`
    Prepare,
    /// `prepublishOnly`
    PrepublishOnly,
    /// `prepack`
    Prepack,
    /// `postpack`
    Postpack,
    /// `publish`
    Publish,
    /// `postpublish`
    Postpublish,
}

impl LifecycleStage {
    /// Script name in the manifest
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::PrepublishOnly => "prepublishOnly",
            Self::Prepack => "prepack",
            Self::Postpack => "postpack",
            Self::Publish => "publish",
            Self::Postpublish => "postpublish",
        }
    }

    /// Root stages run once before packing
    pub fn before_pack() -> &'static [LifecycleStage] {
        &[Self::Prepare, Self::PrepublishOnly, Self::Prepack]
    }

    /// Root stages run once after every package is published
    pub fn after_publish() -> &'static [LifecycleStage] {
        &[Self::Publish, Self::Postpublish]
    }
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where this run was started from, lifecycle-wise.
///
/// A publish started by the root `prepublish`/`publish`/`postpublish` script
/// must not trigger those root scripts again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleContext {
    /// Lifecycle event that spawned this run, if any
    pub active_event: Option<String>,
}

impl LifecycleContext {
    /// A run that was not started from a lifecycle script
    pub fn new() -> Self {
        Self::default()
    }

    /// A run started from inside `event`
    pub fn inside(event: impl Into<String>) -> Self {
        Self {
            active_event: Some(event.into()),
        }
    }

    /// Whether root lifecycle scripts must be skipped to avoid recursion
    pub fn skips_root_lifecycle(&self) -> bool {
        matches!(
            self.active_event.as_deref(),
            Some("prepublish" | "publish" | "postpublish")
        )
    }
}

/// Runs manifest lifecycle scripts
#[async_trait]
pub trait LifecycleRunner: Send + Sync {
    /// Run `stage` for the package described by `manifest`; a missing script is a no-op
    async fn run(&self, manifest: &Manifest, stage: LifecycleStage) -> Result<()>;
}

/// Lifecycle runner executing `scripts` entries through the shell
#[derive(Debug, Clone, Default)]
pub struct ScriptLifecycleRunner {
    env: HashMap<String, String>,
}

impl ScriptLifecycleRunner {
    /// Create a new runner
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable passed to every script
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[async_trait]
impl LifecycleRunner for ScriptLifecycleRunner {
    async fn run(&self, manifest: &Manifest, stage: LifecycleStage) -> Result<()> {
        let package = manifest.name().unwrap_or("<root>").to_string();
        let Some(script) = manifest.script(stage.as_str()) else {
            debug!(package = %package, stage = %stage, "no lifecycle script");
            return Ok(());
        };

        info!(package = %package, stage = %stage, script, "running lifecycle script");

        let (shell, shell_arg) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let dir = manifest.dir();
        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg)
            .arg(script)
            .current_dir(dir)
            .env("npm_lifecycle_event", stage.as_str())
            .env("npm_package_name", &package)
            .env("npm_package_version", manifest.version().unwrap_or_default())
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(path) = path_with_bin(dir) {
            cmd.env("PATH", path);
        }

        let output = cmd.output().await.map_err(|e| HookError::ExecutionFailed {
            stage: stage.as_str().to_string(),
            package: package.clone(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(HookError::ExecutionFailed {
                stage: stage.as_str().to_string(),
                package,
                message: failure_message(output.status.code(), &output.stderr),
            }
            .into());
        }

        Ok(())
    }
}

/// `PATH` with the package's `node_modules/.bin` in front
fn path_with_bin(dir: &Path) -> Option<std::ffi::OsString> {
    let bin = dir.join("node_modules").join(".bin");
    let current = std::env::var_os("PATH").unwrap_or_default();
    let paths = std::iter::once(bin).chain(std::env::split_paths(&current));
    std::env::join_paths(paths).ok()
}

fn failure_message(code: Option<i32>, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    match (code, stderr.is_empty()) {
        (Some(code), true) => format!("exited with code {}", code),
        (Some(code), false) => format!("exited with code {}: {}", code, stderr),
        (None, true) => "terminated by signal".to_string(),
        (None, false) => format!("terminated by signal: {}", stderr),
    }
}

/// A script located by convention, ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHandle {
    /// Script file
    pub path: PathBuf,
    /// Interpreter, or `None` to execute the file directly
    pub interpreter: Option<&'static str>,
}

impl ScriptHandle {
    /// Run the script with `cwd` as working directory
    pub async fn run(&self, cwd: &Path) -> Result<()> {
        debug!(script = %self.path.display(), "running package script");

        let mut cmd = match self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&self.path);
                cmd
            }
            None => Command::new(&self.path),
        };

        let output = cmd
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| HookError::ScriptFailed {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(HookError::ScriptFailed {
                path: self.path.clone(),
                message: failure_message(output.status.code(), &output.stderr),
            }
            .into());
        }

        Ok(())
    }
}

/// Optional script lookup; absence is not an error
pub trait ScriptLocator: Send + Sync {
    /// Find script `name` for the package in `package_dir`
    fn locate(&self, package_dir: &Path, name: &str) -> Option<ScriptHandle>;
}

/// Looks for `scripts/<name>.js`, `scripts/<name>.sh`, then `scripts/<name>`
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionalScripts;

impl ScriptLocator for ConventionalScripts {
    fn locate(&self, package_dir: &Path, name: &str) -> Option<ScriptHandle> {
        let dir = package_dir.join("scripts");
        let candidates: [(String, Option<&'static str>); 3] = [
            (format!("{}.js", name), Some("node")),
            (format!("{}.sh", name), Some("sh")),
            (name.to_string(), None),
        ];

        candidates.into_iter().find_map(|(file, interpreter)| {
            let path = dir.join(file);
            path.is_file().then_some(ScriptHandle { path, interpreter })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn manifest_in(dir: &Path, value: serde_json::Value) -> Manifest {
        let path = dir.join("package.json");
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
        Manifest::load(&path).unwrap()
    }

    #[test]
    fn test_context_detects_publish_lifecycles() {
        assert!(!LifecycleContext::new().skips_root_lifecycle());
        assert!(LifecycleContext::inside("prepublish").skips_root_lifecycle());
        assert!(LifecycleContext::inside("publish").skips_root_lifecycle());
        assert!(LifecycleContext::inside("postpublish").skips_root_lifecycle());
        assert!(!LifecycleContext::inside("prepublishOnly").skips_root_lifecycle());
        assert!(!LifecycleContext::inside("test").skips_root_lifecycle());
    }

    #[test]
    fn test_conventional_lookup_order() {
        let temp = TempDir::new().unwrap();
        let scripts = temp.path().join("scripts");
        std::fs::create_dir_all(&scripts).unwrap();

        assert_eq!(ConventionalScripts.locate(temp.path(), "prepublish"), None);

        std::fs::write(scripts.join("prepublish"), "").unwrap();
        std::fs::write(scripts.join("prepublish.sh"), "").unwrap();
        let handle = ConventionalScripts.locate(temp.path(), "prepublish").unwrap();
        assert_eq!(handle.interpreter, Some("sh"));

        std::fs::write(scripts.join("prepublish.js"), "").unwrap();
        let handle = ConventionalScripts.locate(temp.path(), "prepublish").unwrap();
        assert_eq!(handle.interpreter, Some("node"));
        assert_eq!(handle.path, scripts.join("prepublish.js"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_lifecycle_runner_runs_script() {
        let temp = TempDir::new().unwrap();
        let manifest = manifest_in(
            temp.path(),
            json!({
                "name": "pkg",
                "version": "1.0.0",
                "scripts": { "prepack": "echo $npm_lifecycle_event > marker" }
            }),
        );

        ScriptLifecycleRunner::new()
            .run(&manifest, LifecycleStage::Prepack)
            .await
            .unwrap();

        let marker = std::fs::read_to_string(temp.path().join("marker")).unwrap();
        assert_eq!(marker.trim(), "prepack");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_lifecycle_runner_missing_script_is_noop() {
        let temp = TempDir::new().unwrap();
        let manifest = manifest_in(temp.path(), json!({"name": "pkg", "version": "1.0.0"}));

        ScriptLifecycleRunner::new()
            .run(&manifest, LifecycleStage::Postpublish)
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_lifecycle_runner_failure() {
        let temp = TempDir::new().unwrap();
        let manifest = manifest_in(
            temp.path(),
            json!({"name": "pkg", "version": "1.0.0", "scripts": {"prepare": "echo nope >&2; exit 3"}}),
        );

        let err = ScriptLifecycleRunner::new()
            .run(&manifest, LifecycleStage::Prepare)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("prepare"));
        assert!(msg.contains("exited with code 3: nope"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_handle_runs_in_cwd() {
        let temp = TempDir::new().unwrap();
        let scripts = temp.path().join("scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::write(scripts.join("postpublish.sh"), "touch published\n").unwrap();

        let handle = ConventionalScripts
            .locate(temp.path(), "postpublish")
            .unwrap();
        handle.run(temp.path()).await.unwrap();
        assert!(temp.path().join("published").exists());
    }
}
