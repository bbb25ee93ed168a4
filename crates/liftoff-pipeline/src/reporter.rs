//! Publish progress reporting

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

/// Events emitted while a publish run progresses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PublishEvent {
    /// A stage is starting
    StageStarted { stage: &'static str },
    /// A batch of a per-package stage is starting
    BatchStarted {
        stage: &'static str,
        batch: usize,
        packages: Vec<String>,
    },
    /// Work on one package started
    PackageStarted { stage: &'static str, package: String },
    /// Work on one package completed
    PackageCompleted { stage: &'static str, package: String },
    /// Work on one package failed
    PackageFailed {
        stage: &'static str,
        package: String,
        error: String,
    },
    /// A non-fatal condition the user should know about
    Warning { message: String },
    /// The run finished successfully
    Completed { published: usize, duration: Duration },
}

/// Trait for reporting publish progress
pub trait PublishReporter: Send + Sync {
    /// Handle a publish event
    fn report(&self, event: &PublishEvent);
}

/// Simple reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl PublishReporter for TracingReporter {
    fn report(&self, event: &PublishEvent) {
        match event {
            PublishEvent::StageStarted { stage } => {
                tracing::info!(stage, "stage started");
            }
            PublishEvent::BatchStarted {
                stage,
                batch,
                packages,
            } => {
                tracing::info!(stage, batch, count = packages.len(), "batch started");
            }
            PublishEvent::PackageStarted { stage, package } => {
                tracing::debug!(stage, package = %package, "started");
            }
            PublishEvent::PackageCompleted { stage, package } => {
                tracing::info!(stage, package = %package, "completed");
            }
            PublishEvent::PackageFailed {
                stage,
                package,
                error,
            } => {
                tracing::error!(stage, package = %package, error = %error, "failed");
            }
            PublishEvent::Warning { message } => {
                tracing::warn!("{}", message);
            }
            PublishEvent::Completed {
                published,
                duration,
            } => {
                tracing::info!(
                    "Successfully published {} package(s) in {:.1}s",
                    published,
                    duration.as_secs_f64()
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<PublishEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<PublishEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Messages of the collected warnings
    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PublishEvent::Warning { message } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl PublishReporter for CollectingReporter {
    fn report(&self, event: &PublishEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Forwards every event to several reporters
#[derive(Default)]
pub struct FanoutReporter {
    reporters: Vec<Arc<dyn PublishReporter>>,
}

impl FanoutReporter {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reporter
    pub fn with(mut self, reporter: Arc<dyn PublishReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }
}

impl PublishReporter for FanoutReporter {
    fn report(&self, event: &PublishEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}
