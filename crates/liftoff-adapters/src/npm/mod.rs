//! npm command-line adapter

mod command;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use liftoff_core::error::{RegistryError, Result};
use liftoff_core::types::PackedArtifact;

use crate::traits::{AccessLevel, PackRequest, Packer, PublishRequest, RegistryClient};
use command::CommandOutput;

/// Packer and registry client backed by the `npm` executable
#[derive(Debug, Clone)]
pub struct NpmCli {
    program: PathBuf,
    registry: Option<String>,
}

impl NpmCli {
    /// Use the npm executable at `program`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            registry: None,
        }
    }

    /// Find `npm` on `PATH`
    pub fn locate() -> Result<Self> {
        let program = which::which("npm").map_err(|e| RegistryError::CommandFailed {
            command: "npm".to_string(),
            reason: format!("npm executable not found: {}", e),
        })?;
        debug!(program = %program.display(), "located npm");
        Ok(Self::new(program))
    }

    /// Talk to `registry` instead of the configured default
    pub fn with_registry(mut self, registry: Option<String>) -> Self {
        self.registry = registry;
        self
    }

    async fn npm(&self, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        let mut args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        if let Some(registry) = &self.registry {
            args.push("--registry".to_string());
            args.push(registry.clone());
        }
        command::run(&self.program, &args, cwd).await
    }

    fn registry_name(&self) -> String {
        self.registry
            .clone()
            .unwrap_or_else(|| crate::registry::DEFAULT_REGISTRY.to_string())
    }
}

/// One entry of `npm pack --json`
#[derive(Debug, Deserialize)]
struct PackEntry {
    filename: String,
    integrity: Option<String>,
    shasum: Option<String>,
    size: Option<u64>,
}

fn parse_pack_output(package: &str, stdout: &str, destination: &Path) -> Result<PackedArtifact> {
    let entries: Vec<PackEntry> =
        serde_json::from_str(stdout).map_err(|e| RegistryError::UnexpectedOutput {
            command: "npm pack".to_string(),
            reason: e.to_string(),
        })?;

    let entry = entries
        .into_iter()
        .next()
        .ok_or_else(|| RegistryError::PackFailed {
            package: package.to_string(),
            reason: "npm pack reported no tarball".to_string(),
        })?;

    Ok(PackedArtifact {
        tarball: destination.join(&entry.filename),
        filename: entry.filename,
        integrity: entry.integrity,
        shasum: entry.shasum,
        size: entry.size,
    })
}

fn parse_access_list(stdout: &str) -> Result<BTreeMap<String, AccessLevel>> {
    if stdout.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(stdout).map_err(|e| {
        RegistryError::UnexpectedOutput {
            command: "npm access list packages".to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[async_trait]
impl Packer for NpmCli {
    async fn pack(&self, request: &PackRequest) -> Result<PackedArtifact> {
        let source = request.source.to_string_lossy();
        let destination = request.destination.to_string_lossy();
        let output = command::run(
            &self.program,
            &[
                "pack".to_string(),
                source.to_string(),
                "--json".to_string(),
                "--pack-destination".to_string(),
                destination.to_string(),
            ],
            Some(&request.destination),
        )
        .await?;

        if !output.success {
            return Err(RegistryError::PackFailed {
                package: request.package.clone(),
                reason: output.failure_reason(),
            }
            .into());
        }

        let artifact = parse_pack_output(&request.package, &output.stdout, &request.destination)?;
        info!(package = %request.package, tarball = %artifact.filename, "packed");
        Ok(artifact)
    }
}

#[async_trait]
impl RegistryClient for NpmCli {
    async fn whoami(&self) -> Result<Option<String>> {
        let output = self.npm(&["whoami"], None).await?;
        if output.success {
            let user = output.stdout.trim();
            return Ok((!user.is_empty()).then(|| user.to_string()));
        }

        match output.error_code() {
            Some("E401") => Err(RegistryError::AuthenticationFailed {
                registry: self.registry_name(),
                reason: "Use `npm whoami` to troubleshoot.".to_string(),
            }
            .into()),
            code => {
                debug!(code = ?code, "no registry identity");
                Ok(None)
            }
        }
    }

    async fn access_list(&self, user: &str) -> Result<Option<BTreeMap<String, AccessLevel>>> {
        let output = self
            .npm(&["access", "list", "packages", user, "--json"], None)
            .await?;

        if output.success {
            return parse_access_list(&output.stdout).map(Some);
        }

        match output.error_code() {
            // Enterprise and third-party registries do not implement the listing
            Some("E500") | Some("E404") | Some("E405") => {
                warn!(
                    registry = %self.registry_name(),
                    "registry does not support listing package access"
                );
                Ok(None)
            }
            _ => Err(RegistryError::CommandFailed {
                command: output.command.clone(),
                reason: output.failure_reason(),
            }
            .into()),
        }
    }

    async fn publish(&self, request: &PublishRequest) -> Result<()> {
        let tarball = request.tarball.to_string_lossy().to_string();
        let output = self
            .npm(
                &["publish", tarball.as_str(), "--tag", request.tag.as_str()],
                Some(&request.location),
            )
            .await?;

        if !output.success {
            return Err(RegistryError::PublishFailed {
                package: format!("{}@{}", request.name, request.version),
                reason: output.failure_reason(),
            }
            .into());
        }

        info!(package = %request.name, version = %request.version, tag = %request.tag, "published");
        Ok(())
    }

    async fn add_tag(&self, name: &str, version: &str, tag: &str) -> Result<()> {
        let spec = format!("{}@{}", name, version);
        let output = self.npm(&["dist-tag", "add", spec.as_str(), tag], None).await?;
        if !output.success {
            return Err(RegistryError::DistTagFailed {
                action: "add",
                spec,
                tag: tag.to_string(),
                reason: output.failure_reason(),
            }
            .into());
        }
        Ok(())
    }

    async fn remove_tag(&self, name: &str, tag: &str) -> Result<()> {
        let output = self.npm(&["dist-tag", "rm", name, tag], None).await?;
        if !output.success {
            return Err(RegistryError::DistTagFailed {
                action: "remove",
                spec: name.to_string(),
                tag: tag.to_string(),
                reason: output.failure_reason(),
            }
            .into());
        }
        Ok(())
    }

    async fn is_published(&self, name: &str, version: &str) -> Result<bool> {
        let spec = format!("{}@{}", name, version);
        let output = self.npm(&["view", spec.as_str(), "version", "--json"], None).await?;

        if output.success {
            return Ok(!output.stdout.trim().is_empty());
        }

        match output.error_code() {
            Some("E404") => Ok(false),
            _ => Err(RegistryError::CommandFailed {
                command: output.command.clone(),
                reason: output.failure_reason(),
            }
            .into()),
        }
    }
}
