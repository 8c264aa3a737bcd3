use std::sync::Arc;

use hf_errors::{JobError, StorageError};
use hf_storage::{DuplicateScanner, StorageManager};
use hf_jobs::JobQueue;
use hf_types::{Job, JobItem, JobType};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::processor::IngestJobProcessor;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Job(#[from] JobError),
}

/// Facade tying [`StorageManager`] and [`JobQueue`] together (SPEC_FULL §A).
/// This is the seam an HTTP/CLI transport would be built against; neither
/// is part of this crate (spec §1).
pub struct IngestService {
    pub storage: Arc<StorageManager>,
    pub jobs: Arc<JobQueue>,
    pub duplicates: Arc<DuplicateScanner>,
    config: Config,
}

impl IngestService {
    /// Loads indexes from `config.root`, starts the worker pool, and
    /// restores any jobs left `queued`/`processing` from a prior run
    /// (SPEC_FULL §C) before returning.
    #[tracing::instrument(skip(config))]
    pub async fn new(config: Config) -> Result<Arc<Self>, ServiceError> {
        let storage = Arc::new(StorageManager::load(&config.root, config.tmp_dir_name.clone()).await?);
        let duplicates = Arc::new(DuplicateScanner::new(
            config.root.clone(),
            storage.metadata_index.clone(),
        ));

        let processor = Arc::new(IngestJobProcessor::new(storage.clone()));
        let jobs = JobQueue::new(
            config.root.join("jobs"),
            config.queue_capacity,
            config.worker_count,
            config.job_persist_interval,
            processor,
        );
        jobs.start().await;
        let restored = jobs.restore().await?;
        info!(restored, "ingest service ready");

        Ok(Arc::new(Self {
            storage,
            jobs,
            duplicates,
            config,
        }))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn enqueue_job(&self, job_type: JobType, items: Vec<JobItem>) -> Result<Uuid, ServiceError> {
        self.jobs.enqueue(job_type, items).await.map_err(ServiceError::from)
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Job, ServiceError> {
        self.jobs.get(id).await.map_err(ServiceError::from)
    }

    /// Signals workers to stop between items and waits for the pool to
    /// drain (spec §4.8 "Shutdown").
    pub async fn shutdown(&self) {
        self.jobs.shutdown().await;
    }
}
