//! Background job scheduler.
//!
//! Registers the recurring pipeline batch at `pipeline_cron` (six-field cron,
//! seconds first).

use std::sync::Arc;

use sqlx::PgPool;
use tdwatch_core::AppConfig;
use tdwatch_scoring::{build_pipeline, ProcessingOptions};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

pub(crate) const SCHEDULER_TRIGGER: &str = "scheduler";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is rejected, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_pipeline_job(&scheduler, pool, config).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

pub(crate) fn scheduled_options(config: &AppConfig) -> ProcessingOptions {
    ProcessingOptions {
        batch_size: config.pipeline_batch_size,
        top_percentile: config.pipeline_top_percentile,
        min_importance_score: config.pipeline_min_importance,
        dry_run: false,
        trigger_source: SCHEDULER_TRIGGER.to_string(),
    }
}

async fn register_pipeline_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);
    // Held for the whole batch so a slow run is never overlapped by the next tick.
    let running = Arc::new(Mutex::new(()));
    let cron = config.pipeline_cron.clone();

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let running = Arc::clone(&running);

        Box::pin(async move {
            let Ok(_guard) = running.try_lock() else {
                tracing::warn!("scheduler: previous pipeline batch still running; skipping tick");
                return;
            };
            tracing::info!("scheduler: starting pipeline batch");
            run_pipeline_job(&pool, &config).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: pipeline batch registered");
    Ok(())
}

async fn run_pipeline_job(pool: &PgPool, config: &AppConfig) {
    let pipeline = match build_pipeline(config, pool.clone()) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to build pipeline");
            return;
        }
    };

    match pipeline
        .process_unprocessed_articles(&scheduled_options(config))
        .await
    {
        Ok(stats) => tracing::info!(
            fetched = stats.fetched,
            canonical = stats.canonical_processed,
            duplicates = stats.duplicates,
            rating_changes = stats.rating_changes,
            commit_failures = stats.commit_failures,
            "scheduler: pipeline batch complete"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: pipeline batch failed"),
    }
}
