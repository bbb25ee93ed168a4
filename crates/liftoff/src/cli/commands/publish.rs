//! Publish command

use std::sync::Arc;

use clap::Args;
use console::style;
use dialoguer::Confirm;
use tracing::{debug, info, warn};

use liftoff_adapters::{NpmCli, RegistryClient};
use liftoff_core::hooks::LifecycleContext;
use liftoff_core::monorepo::PackageGraph;
use liftoff_git::GitRepo;
use liftoff_pipeline::{Collaborators, Pipeline, PublishReporter, TracingReporter};

use super::{PublishOptions, Workspace};
use crate::cli::output::{self, ProgressReporter};
use crate::cli::{Cli, OutputFormat};

/// Publish every package whose version is not yet on the registry
#[derive(Debug, Args)]
pub struct PublishCommand {
    #[command(flatten)]
    pub options: PublishOptions,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl PublishCommand {
    /// Execute the publish command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(yes = self.yes, "executing publish command");
        let workspace = Workspace::load()?;
        let config = self.options.apply(&workspace.config.publish)?;

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(cli, workspace, config))
    }

    async fn run(
        &self,
        cli: &Cli,
        workspace: Workspace,
        config: liftoff_core::config::PublishConfig,
    ) -> anyhow::Result<()> {
        let npm = Arc::new(NpmCli::locate()?.with_registry(config.registry.clone()));
        let selected = unpublished(&workspace.graph, npm.as_ref()).await?;

        if selected.is_empty() {
            if !cli.quiet {
                output::info("No changed packages to publish");
            }
            return Ok(());
        }

        if cli.format == OutputFormat::Text && !cli.quiet {
            println!("{}", output::header("Found packages to publish:"));
            for name in &selected {
                if let Some(node) = workspace.graph.get(name) {
                    println!(
                        " - {} => {}",
                        name,
                        output::version_style().apply_to(&node.version)
                    );
                }
            }
            println!();
        }

        if !self.confirmed()? {
            println!("{}", style("Aborted.").yellow());
            return Ok(());
        }

        let context = match std::env::var("npm_lifecycle_event") {
            Ok(event) => LifecycleContext::inside(event),
            Err(_) => LifecycleContext::new(),
        };

        let mut collaborators = Collaborators::new(npm.clone(), npm);
        match GitRepo::discover(&workspace.project.root) {
            Ok(repo) => collaborators = collaborators.with_vcs(Arc::new(repo)),
            Err(e) => warn!(error = %e, "no git repository, working tree checks disabled"),
        }

        let progress = (cli.format == OutputFormat::Text && !cli.quiet).then(|| {
            let per_package = if config.temp_tag { 3 } else { 2 };
            Arc::new(ProgressReporter::new((selected.len() * per_package) as u64))
        });
        let reporter: Arc<dyn PublishReporter> = match &progress {
            Some(progress) => progress.clone(),
            None => Arc::new(TracingReporter),
        };
        collaborators = collaborators.with_reporter(reporter);

        let result = Pipeline::new(collaborators)
            .run(
                workspace.project,
                workspace.graph,
                &selected,
                config,
                context,
            )
            .await;

        if let Some(progress) = &progress {
            progress.clear();
        }
        let report = result?;

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    output::success("Successfully published:");
                    for package in &report.published {
                        println!(
                            " - {}@{} {}",
                            package.name,
                            output::version_style().apply_to(&package.version),
                            output::tag_style().apply_to(format!("({})", package.tag))
                        );
                    }
                }
            }
        }

        Ok(())
    }

    fn confirmed(&self) -> anyhow::Result<bool> {
        if self.yes {
            return Ok(true);
        }
        if !console::user_attended() {
            anyhow::bail!("Refusing to publish without confirmation in a non-interactive session; pass --yes");
        }

        Ok(Confirm::new()
            .with_prompt("Are you sure you want to publish these packages?")
            .default(false)
            .interact()?)
    }
}

/// Publishable packages whose manifest version is not on the registry yet
pub(crate) async fn unpublished(
    graph: &PackageGraph,
    registry: &dyn RegistryClient,
) -> anyhow::Result<Vec<String>> {
    let mut selected = Vec::new();

    for node in graph.nodes().filter(|node| !node.private) {
        if registry.is_published(&node.name, &node.version).await? {
            debug!(package = %node.name, version = %node.version, "already published");
        } else {
            selected.push(node.name.clone());
        }
    }

    Ok(selected)
}
