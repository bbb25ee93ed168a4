//! Progress bar driven by pipeline events

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use liftoff_pipeline::{PublishEvent, PublishReporter};

/// Renders publish progress on the terminal
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// A bar with one step per package and per-package stage
    pub fn new(steps: u64) -> Self {
        let bar = ProgressBar::new(steps);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }

    /// Remove the bar, e.g. after a failed run
    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl PublishReporter for ProgressReporter {
    fn report(&self, event: &PublishEvent) {
        match event {
            PublishEvent::StageStarted { stage } => {
                self.bar.set_message(stage.to_string());
            }
            PublishEvent::PackageStarted { stage, package } => {
                self.bar.set_message(format!("{} {}", stage, package));
                self.bar.tick();
            }
            PublishEvent::PackageCompleted { .. } => {
                self.bar.inc(1);
            }
            PublishEvent::PackageFailed {
                stage,
                package,
                error,
            } => {
                self.bar.println(format!(
                    "{} {} {}: {}",
                    style("✗").red().bold(),
                    stage,
                    style(package).bold(),
                    error
                ));
            }
            PublishEvent::Warning { message } => {
                self.bar
                    .println(format!("{} {}", style("!").yellow().bold(), message));
            }
            PublishEvent::Completed { .. } => {
                self.bar.finish_and_clear();
            }
            PublishEvent::BatchStarted { .. } => {}
        }
    }
}
