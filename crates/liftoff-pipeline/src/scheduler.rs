//! Bounded concurrent execution of one batch

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use liftoff_core::error::{LiftoffError, PipelineError, Result};

use crate::reporter::{PublishEvent, PublishReporter};

/// Work for one package, owning everything it touches
pub type PackageJob<T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'static>>;

/// Box a future as a [`PackageJob`]
pub fn job<T, F>(future: F) -> PackageJob<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
{
    Box::pin(future)
}

/// Run every job of a batch with at most `limit` in flight.
///
/// All jobs run to completion even when one fails; the first failure in
/// batch order is returned, wrapped with the stage and package name. On
/// success results come back in batch order.
pub async fn settle_batch<T: Send + 'static>(
    stage: &'static str,
    jobs: Vec<(String, PackageJob<T>)>,
    limit: usize,
    reporter: &Arc<dyn PublishReporter>,
) -> Result<Vec<(String, T)>> {
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut handles = Vec::with_capacity(jobs.len());

    debug!(stage, jobs = jobs.len(), limit, "settling batch");

    for (package, work) in jobs {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| PipelineError::TaskAborted {
                stage,
                package: package.clone(),
                reason: e.to_string(),
            })?;
        let reporter = reporter.clone();
        let name = package.clone();

        let handle = tokio::spawn(async move {
            reporter.report(&PublishEvent::PackageStarted {
                stage,
                package: name.clone(),
            });

            let result = work.await;
            drop(permit);

            match &result {
                Ok(_) => reporter.report(&PublishEvent::PackageCompleted {
                    stage,
                    package: name,
                }),
                Err(e) => reporter.report(&PublishEvent::PackageFailed {
                    stage,
                    package: name,
                    error: e.to_string(),
                }),
            }

            result
        });

        handles.push((package, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    let mut first_error: Option<LiftoffError> = None;

    for (package, handle) in handles {
        let outcome = match handle.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.in_package(stage, package.clone())),
            Err(join_error) => Err(PipelineError::TaskAborted {
                stage,
                package: package.clone(),
                reason: join_error.to_string(),
            }
            .into()),
        };

        match outcome {
            Ok(value) => results.push((package, value)),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::CollectingReporter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn reporter() -> (Arc<CollectingReporter>, Arc<dyn PublishReporter>) {
        let collecting = Arc::new(CollectingReporter::default());
        let shared: Arc<dyn PublishReporter> = collecting.clone();
        (collecting, shared)
    }

    #[tokio::test]
    async fn test_results_in_batch_order() {
        let (_, reporter) = reporter();
        let jobs = vec![
            ("a".to_string(), job(async { Ok(1) })),
            ("b".to_string(), job(async { Ok(2) })),
        ];

        let results = settle_batch("pack", jobs, 2, &reporter).await.unwrap();
        assert_eq!(results, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let (_, reporter) = reporter();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs = (0..6)
            .map(|i| {
                let running = running.clone();
                let peak = peak.clone();
                (
                    format!("pkg-{}", i),
                    job(async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }),
                )
            })
            .collect();

        settle_batch("publish", jobs, 2, &reporter).await.unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_siblings_finish_after_failure() {
        let (collecting, reporter) = reporter();
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();

        let jobs = vec![
            (
                "a".to_string(),
                job(async { Err::<(), _>(LiftoffError::other("boom")) }),
            ),
            (
                "b".to_string(),
                job(async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            ),
        ];

        let err = settle_batch("pack", jobs, 2, &reporter).await.unwrap_err();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(matches!(
            err,
            LiftoffError::Pipeline(PipelineError::PackageFailed { stage: "pack", ref package, .. })
                if package == "a"
        ));
        assert!(collecting.events().iter().any(|e| matches!(
            e,
            PublishEvent::PackageFailed { package, .. } if package == "a"
        )));
    }

    #[tokio::test]
    async fn test_panic_is_reported_as_aborted_task() {
        let (_, reporter) = reporter();
        let jobs: Vec<(String, PackageJob<()>)> = vec![(
            "a".to_string(),
            job(async {
                let crash = true;
                if crash {
                    panic!("worker died");
                }
                Ok(())
            }),
        )];

        let err = settle_batch("publish", jobs, 1, &reporter)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LiftoffError::Pipeline(PipelineError::TaskAborted { stage: "publish", .. })
        ));
    }
}
