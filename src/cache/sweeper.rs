//! Scheduled removal of expired entries from the embedded backend.
//!
//! Expired records are dropped lazily when they are read, so keys that are
//! never touched again would otherwise stay on disk. The sweeper runs
//! [`EmbeddedCache::purge_expired`] on a cron schedule and flushes afterwards.
//! Redis expires keys itself and never needs one.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::cache::{Cache, CacheError};
use crate::cache::embedded::EmbeddedCache;

/// Cron-driven expiry sweeper for one [`EmbeddedCache`].
pub struct ExpirySweeper {
    scheduler: Arc<Mutex<JobScheduler>>,
    cache: EmbeddedCache,
    schedule: String,
}

impl ExpirySweeper {
    /// Create a sweeper and register its job. The schedule uses the six-field
    /// cron syntax with seconds, e.g. `"0 0 0 * * *"` for daily at midnight.
    pub async fn new(cache: EmbeddedCache, schedule: &str) -> Result<Self, CacheError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| CacheError::storage("create sweeper", e))?;

        let job_cache = cache.clone();
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let cache = job_cache.clone();
            Box::pin(async move {
                // Failures stay inside the job so the schedule keeps running.
                if let Err(e) = Self::sweep(&cache).await {
                    tracing::error!(prefix = %cache.prefix(), error = %e, "Expiry sweep failed");
                }
            })
        })
        .map_err(|e| {
            CacheError::Configuration(format!("Invalid sweep schedule '{schedule}': {e}"))
        })?;

        scheduler
            .add(job)
            .await
            .map_err(|e| CacheError::storage("schedule sweeper", e))?;

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            cache,
            schedule: schedule.to_string(),
        })
    }

    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    /// Start running the job in the background.
    pub async fn start(&self) -> Result<(), CacheError> {
        self.scheduler
            .lock()
            .await
            .start()
            .await
            .map_err(|e| CacheError::storage("start sweeper", e))?;

        tracing::info!(
            prefix = %self.cache.prefix(),
            schedule = %self.schedule,
            "Expiry sweeper started"
        );
        Ok(())
    }

    /// Stop the scheduler. A sweep already in progress runs to completion.
    pub async fn stop(&self) -> Result<(), CacheError> {
        self.scheduler
            .lock()
            .await
            .shutdown()
            .await
            .map_err(|e| CacheError::storage("stop sweeper", e))?;

        tracing::info!(prefix = %self.cache.prefix(), "Expiry sweeper stopped");
        Ok(())
    }

    /// Run one sweep immediately, returning the number of purged entries.
    pub async fn run_once(&self) -> Result<usize, CacheError> {
        Self::sweep(&self.cache).await
    }

    async fn sweep(cache: &EmbeddedCache) -> Result<usize, CacheError> {
        let purged = cache.purge_expired().await?;
        cache.flush().await?;
        tracing::info!(prefix = %cache.prefix(), purged, "Expiry sweep completed");
        Ok(purged)
    }
}
