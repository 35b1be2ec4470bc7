//! Background job scheduler.
//!
//! Registers the recurring reprocess sweep that re-queues every review still
//! missing its analysis labels.

use std::sync::Arc;

use revdb_analysis::AnalysisService;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// The returned handle must be kept alive for as long as sweeps should run.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// `cron` is not a valid six-field expression, or the scheduler fails to
/// start.
pub async fn build_scheduler(
    service: Arc<AnalysisService>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_reprocess_job(&scheduler, service, cron).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the reprocess sweep on `cron`.
///
/// Overlapping sweeps are harmless: reviews that already have a live job are
/// coalesced by the queue.
async fn register_reprocess_job(
    scheduler: &JobScheduler,
    service: Arc<AnalysisService>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let service = Arc::clone(&service);

        Box::pin(async move {
            tracing::info!("scheduler: starting reprocess sweep");
            match service.reprocess_all().await {
                Ok(summary) => tracing::info!(
                    scanned = summary.scanned,
                    submitted = summary.submitted,
                    already_queued = summary.already_queued,
                    "scheduler: reprocess sweep queued"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: reprocess sweep failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
