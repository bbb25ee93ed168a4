//! Plan command

use clap::Args;
use console::style;
use tracing::info;

use liftoff_adapters::NpmCli;
use liftoff_core::monorepo::batch_packages;
use liftoff_pipeline::Pipeline;

use super::publish::unpublished;
use super::{PublishOptions, Workspace};
use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Show the stages and batches a publish would run
#[derive(Debug, Args)]
pub struct PlanCommand {
    #[command(flatten)]
    pub options: PublishOptions,

    /// Only plan packages whose version is not on the registry yet
    #[arg(long)]
    pub unpublished: bool,
}

impl PlanCommand {
    /// Execute the plan command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(unpublished = self.unpublished, "executing plan command");
        let workspace = Workspace::load()?;
        let config = self.options.apply(&workspace.config.publish)?;

        let selected = if self.unpublished {
            let npm = NpmCli::locate()?.with_registry(config.registry.clone());
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(unpublished(&workspace.graph, &npm))?
        } else {
            workspace.graph.publishable_names()
        };

        let plan = batch_packages(&workspace.graph, &selected, config.graph_type, config.sort)?;
        if config.reject_cycles {
            plan.ensure_acyclic()?;
        }
        let stages = Pipeline::stages(&config);

        match cli.format {
            OutputFormat::Json => {
                let config_path = workspace
                    .config_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().to_string());
                let output = serde_json::json!({
                    "config_path": config_path,
                    "stages": stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
                    "batches": &plan.batches,
                    "cycles": plan.cycle_descriptions(),
                    "concurrency": config.effective_concurrency(),
                    "pack_concurrency": config.effective_pack_concurrency(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if plan.is_empty() {
                    output::info("No packages to publish");
                    return Ok(());
                }

                println!("{}", output::header("Stages"));
                for (index, stage) in stages.iter().enumerate() {
                    println!("  {:>2}. {}", index + 1, stage);
                }
                println!();

                println!(
                    "{} {}",
                    output::header("Batches"),
                    style(format!(
                        "(pack {} / publish {} at a time)",
                        config.effective_pack_concurrency(),
                        config.effective_concurrency()
                    ))
                    .dim()
                );
                for (index, batch) in plan.batches.iter().enumerate() {
                    let names: Vec<String> = batch
                        .iter()
                        .map(|name| match workspace.graph.get(name) {
                            Some(node) => format!(
                                "{}@{}",
                                name,
                                output::version_style().apply_to(&node.version)
                            ),
                            None => name.clone(),
                        })
                        .collect();
                    println!("  {:>2}. {}", index + 1, names.join(", "));
                }

                for cycle in plan.cycle_descriptions() {
                    output::warning(&format!("Dependency cycle: {}", cycle));
                }
            }
        }

        Ok(())
    }
}
