//! Scheduled reconciliation of the forum index

use crate::search::error::{SearchError, SearchResult};
use crate::search::service::SearchService;
use std::sync::Arc;
use std::time::Instant;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info};
use uuid::Uuid;

/// Runs [`SearchService::reconcile`] on a cron schedule
pub struct Reconciler {
    scheduler: JobScheduler,
    job_id: Uuid,
}

impl Reconciler {
    /// Schedule reconciliation with a six-field cron expression (seconds first)
    pub async fn start(service: Arc<SearchService>, schedule: &str) -> SearchResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SearchError::InvalidConfiguration(format!("Scheduler startup: {}", e)))?;

        let job = Job::new_async(schedule, move |_uuid, _l| {
            let service = service.clone();
            Box::pin(async move {
                let start = Instant::now();
                match service.reconcile().await {
                    Ok(report) => info!(
                        indexed = report.indexed,
                        removed = report.removed,
                        duration_ms = start.elapsed().as_millis(),
                        "Scheduled reconciliation finished"
                    ),
                    Err(e) => error!(
                        error = %e,
                        duration_ms = start.elapsed().as_millis(),
                        "Scheduled reconciliation failed"
                    ),
                }
            })
        })
        .map_err(|e: JobSchedulerError| {
            SearchError::InvalidConfiguration(format!(
                "Invalid reconcile schedule '{}': {}",
                schedule, e
            ))
        })?;

        let job_id = scheduler
            .add(job)
            .await
            .map_err(|e| SearchError::InvalidConfiguration(e.to_string()))?;

        scheduler
            .start()
            .await
            .map_err(|e| SearchError::InvalidConfiguration(format!("Scheduler startup: {}", e)))?;

        info!(job_id = %job_id, schedule, "Reconciliation scheduled");
        Ok(Self { scheduler, job_id })
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Stop the schedule. A run in progress is not interrupted.
    pub async fn shutdown(mut self) -> SearchResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| SearchError::InvalidConfiguration(format!("Scheduler shutdown: {}", e)))?;
        info!(job_id = %self.job_id, "Reconciliation schedule stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::config::SearchConfig;
    use crate::state::create_in_memory_store;
    use tempfile::TempDir;

    fn service(temp_dir: &TempDir) -> Arc<SearchService> {
        let config = SearchConfig {
            index_path: temp_dir.path().to_path_buf(),
            writer_heap_size: 20_000_000,
            ..Default::default()
        };
        Arc::new(SearchService::with_store(config, create_in_memory_store()))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_schedule_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = Reconciler::start(service(&temp_dir), "every tuesday").await;
        assert!(matches!(result, Err(SearchError::InvalidConfiguration(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_and_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let reconciler = Reconciler::start(service(&temp_dir), "0 0 */6 * * *")
            .await
            .unwrap();
        assert!(!reconciler.job_id().is_nil());
        reconciler.shutdown().await.unwrap();
    }
}
