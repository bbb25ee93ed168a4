//! Fake collaborators and workspace fixtures shared by the pipeline tests

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use liftoff_adapters::{AccessLevel, PackRequest, Packer, PublishRequest, RegistryClient};
use liftoff_core::error::{RegistryError, Result};
use liftoff_core::hooks::{ConventionalScripts, LifecycleRunner, LifecycleStage};
use liftoff_core::monorepo::{find_license, Manifest, PackageDiscovery, PackageGraph, Project};
use liftoff_core::types::PackedArtifact;
use liftoff_core::vcs::VersionControl;
use liftoff_pipeline::{Collaborators, CollectingReporter};

/// Registry that records every call and tracks dist-tags in memory
#[derive(Default)]
pub struct FakeRegistry {
    pub user: Option<String>,
    pub access: Option<BTreeMap<String, AccessLevel>>,
    pub fail_publish: BTreeSet<String>,
    pub calls: Mutex<Vec<String>>,
    pub tags: Mutex<BTreeMap<String, BTreeSet<String>>>,
}

impl FakeRegistry {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Packages currently carrying `tag`
    pub fn tagged(&self, tag: &str) -> Vec<String> {
        self.tags
            .lock()
            .unwrap()
            .get(tag)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn whoami(&self) -> Result<Option<String>> {
        self.record("whoami".to_string());
        Ok(self.user.clone())
    }

    async fn access_list(&self, user: &str) -> Result<Option<BTreeMap<String, AccessLevel>>> {
        self.record(format!("access {}", user));
        Ok(self.access.clone())
    }

    async fn publish(&self, request: &PublishRequest) -> Result<()> {
        self.record(format!(
            "publish {}@{} --tag {}",
            request.name, request.version, request.tag
        ));
        if self.fail_publish.contains(&request.name) {
            return Err(RegistryError::PublishFailed {
                package: request.name.clone(),
                reason: "E500".to_string(),
            }
            .into());
        }
        self.tags
            .lock()
            .unwrap()
            .entry(request.tag.clone())
            .or_default()
            .insert(request.name.clone());
        Ok(())
    }

    async fn add_tag(&self, name: &str, version: &str, tag: &str) -> Result<()> {
        self.record(format!("dist-tag add {}@{} {}", name, version, tag));
        self.tags
            .lock()
            .unwrap()
            .entry(tag.to_string())
            .or_default()
            .insert(name.to_string());
        Ok(())
    }

    async fn remove_tag(&self, name: &str, tag: &str) -> Result<()> {
        self.record(format!("dist-tag rm {} {}", name, tag));
        if let Some(names) = self.tags.lock().unwrap().get_mut(tag) {
            names.remove(name);
        }
        Ok(())
    }

    async fn is_published(&self, _name: &str, _version: &str) -> Result<bool> {
        Ok(false)
    }
}

/// What a package looked like on disk when it was packed
#[derive(Debug, Clone)]
pub struct PackSnapshot {
    pub name: String,
    pub manifest: Value,
    pub had_license: bool,
}

/// Packer that snapshots the pack directory instead of building a tarball
#[derive(Default)]
pub struct FakePacker {
    pub fail: BTreeSet<String>,
    snapshots: Mutex<Vec<PackSnapshot>>,
}

impl FakePacker {
    pub fn failing(names: &[&str]) -> Self {
        Self {
            fail: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn snapshots(&self) -> Vec<PackSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn snapshot(&self, name: &str) -> PackSnapshot {
        self.snapshots()
            .into_iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("{} was not packed", name))
    }
}

#[async_trait]
impl Packer for FakePacker {
    async fn pack(&self, request: &PackRequest) -> Result<PackedArtifact> {
        if self.fail.contains(&request.package) {
            return Err(RegistryError::PackFailed {
                package: request.package.clone(),
                reason: "prepack exploded".to_string(),
            }
            .into());
        }

        let manifest = Manifest::load_dir(&request.source)?;
        let version = manifest.version().unwrap_or_default().to_string();
        let filename = format!("{}-{}.tgz", request.package, version);
        let tarball = request.destination.join(&filename);
        std::fs::write(&tarball, b"")?;

        self.snapshots.lock().unwrap().push(PackSnapshot {
            name: request.package.clone(),
            manifest: Value::Object(manifest.doc().clone()),
            had_license: find_license(&request.source)?.is_some(),
        });

        Ok(PackedArtifact {
            tarball,
            filename,
            integrity: None,
            shasum: None,
            size: Some(0),
        })
    }
}

/// Lifecycle runner recording `package:stage`
#[derive(Default)]
pub struct RecordingLifecycle {
    runs: Mutex<Vec<String>>,
}

impl RecordingLifecycle {
    pub fn runs(&self) -> Vec<String> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl LifecycleRunner for RecordingLifecycle {
    async fn run(&self, manifest: &Manifest, stage: LifecycleStage) -> Result<()> {
        let name = manifest.name().unwrap_or("<root>");
        self.runs.lock().unwrap().push(format!("{}:{}", name, stage));
        Ok(())
    }
}

/// Version control with canned answers
pub struct FakeVcs {
    pub workdir: PathBuf,
    pub dirty: Vec<String>,
    pub head: Option<String>,
    checkouts: Mutex<Vec<Vec<PathBuf>>>,
}

impl FakeVcs {
    pub fn clean(workdir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
            dirty: Vec::new(),
            head: Some("0123456789abcdef".to_string()),
            checkouts: Mutex::new(Vec::new()),
        }
    }

    pub fn dirty(workdir: &Path, files: &[&str]) -> Self {
        Self {
            dirty: files.iter().map(|f| f.to_string()).collect(),
            ..Self::clean(workdir)
        }
    }

    pub fn without_head(workdir: &Path) -> Self {
        Self {
            head: None,
            ..Self::clean(workdir)
        }
    }

    pub fn checkouts(&self) -> Vec<Vec<PathBuf>> {
        self.checkouts.lock().unwrap().clone()
    }
}

impl VersionControl for FakeVcs {
    fn uncommitted_changes(&self) -> Result<Vec<String>> {
        Ok(self.dirty.clone())
    }

    fn head_sha(&self) -> Result<String> {
        self.head
            .clone()
            .ok_or_else(|| liftoff_core::error::GitError::NoCommits.into())
    }

    fn checkout(&self, paths: &[PathBuf]) -> Result<()> {
        self.checkouts.lock().unwrap().push(paths.to_vec());
        Ok(())
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }
}

/// Every fake wired into one set of collaborators
pub struct Harness {
    pub registry: Arc<FakeRegistry>,
    pub packer: Arc<FakePacker>,
    pub vcs: Arc<FakeVcs>,
    pub lifecycle: Arc<RecordingLifecycle>,
    pub reporter: Arc<CollectingReporter>,
}

impl Harness {
    pub fn new(workspace: &Workspace) -> Self {
        Self::with(workspace, FakeRegistry::default(), FakePacker::default())
    }

    pub fn with(workspace: &Workspace, registry: FakeRegistry, packer: FakePacker) -> Self {
        Self {
            registry: Arc::new(registry),
            packer: Arc::new(packer),
            vcs: Arc::new(FakeVcs::clean(workspace.root())),
            lifecycle: Arc::new(RecordingLifecycle::default()),
            reporter: Arc::new(CollectingReporter::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(self.registry.clone(), self.packer.clone())
            .with_vcs(self.vcs.clone())
            .with_lifecycle(self.lifecycle.clone())
            .with_scripts(Arc::new(ConventionalScripts))
            .with_reporter(self.reporter.clone())
    }
}

/// A monorepo in a temporary directory
pub struct Workspace {
    temp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        write_json(
            &temp.path().join("package.json"),
            &serde_json::json!({"name": "root", "private": true}),
        );
        Self { temp }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn with_root_license(self) -> Self {
        std::fs::write(self.root().join("LICENSE"), "MIT\n").unwrap();
        self
    }

    /// Add `packages/<dir>/package.json`
    pub fn package(self, dir: &str, manifest: Value) -> Self {
        let location = self.root().join("packages").join(dir);
        std::fs::create_dir_all(&location).unwrap();
        write_json(&location.join("package.json"), &manifest);
        self
    }

    pub fn package_dir(&self, dir: &str) -> PathBuf {
        self.root().join("packages").join(dir)
    }

    pub fn load(&self) -> (Project, PackageGraph) {
        let project = Project::load(self.root()).unwrap();
        let graph = PackageDiscovery::new(self.root(), vec!["packages/*".to_string()])
            .discover()
            .unwrap();
        (project, graph)
    }

    pub fn read_manifest(&self, dir: &str) -> Value {
        let content = std::fs::read_to_string(self.package_dir(dir).join("package.json")).unwrap();
        serde_json::from_str(&content).unwrap()
    }
}

fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
