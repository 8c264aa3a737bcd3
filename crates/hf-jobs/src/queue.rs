use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use hf_errors::JobError;
use hf_types::{Job, JobItem, JobResult, JobStatus, JobType};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::processor::JobProcessor;

/// Default items-per-persist (spec §4.8: "N=10"), used when a caller
/// doesn't override it via configuration.
pub const DEFAULT_PERSIST_EVERY: usize = 10;

/// Bounded async job queue with a fixed worker pool (spec §3, §4.8,
/// §5 "Scheduling model").
///
/// `jobs` holds every job this process knows about, queued through
/// terminal; workers read/write it under its own lock so `get`/`list`
/// never block on a worker mid-item.
pub struct JobQueue {
    persist_dir: PathBuf,
    jobs: RwLock<HashMap<Uuid, Job>>,
    sender: async_channel::Sender<Uuid>,
    receiver: async_channel::Receiver<Uuid>,
    processor: Arc<dyn JobProcessor>,
    worker_count: usize,
    persist_every: usize,
    stopping: AtomicBool,
    handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl JobQueue {
    pub fn new(
        persist_dir: impl AsRef<Path>,
        queue_capacity: usize,
        worker_count: usize,
        persist_every: usize,
        processor: Arc<dyn JobProcessor>,
    ) -> Arc<Self> {
        let (sender, receiver) = async_channel::bounded(queue_capacity.max(1));
        Arc::new(Self {
            persist_dir: persist_dir.as_ref().to_path_buf(),
            jobs: RwLock::new(HashMap::new()),
            sender,
            receiver,
            processor,
            worker_count: worker_count.max(1),
            persist_every: persist_every.max(1),
            stopping: AtomicBool::new(false),
            handles: tokio::sync::Mutex::new(Vec::new()),
        })
    }

    /// Spawns the worker pool. Idempotent only in the sense that calling it
    /// twice spawns two independent pools draining the same channel; callers
    /// should call it exactly once per queue instance.
    pub async fn start(self: &Arc<Self>) {
        let mut handles = self.handles.lock().await;
        for _ in 0..self.worker_count {
            let queue = Arc::clone(self);
            handles.push(tokio::spawn(async move { queue.worker_loop().await }));
        }
    }

    async fn worker_loop(self: Arc<Self>) {
        while let Ok(job_id) = self.receiver.recv().await {
            self.process_job(job_id).await;
        }
    }

    /// Assigns an id, stamps `created_at`/`queued`, persists, and pushes
    /// onto the channel (spec §4.8 "Enqueue"). Fails synchronously if the
    /// channel is at capacity; the job has already been persisted and can
    /// still be recovered by [`JobQueue::restore`] on the next startup.
    #[instrument(skip(self, items))]
    pub async fn enqueue(&self, job_type: JobType, items: Vec<JobItem>) -> Result<Uuid, JobError> {
        let job = Job::new(job_type, items);
        let id = job.id;

        self.persist(&job).await?;
        self.jobs.write().await.insert(id, job);

        self.sender
            .try_send(id)
            .map_err(|_| JobError::QueueFull)?;

        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Result<Job, JobError> {
        if let Some(job) = self.jobs.read().await.get(&id).cloned() {
            return Ok(job);
        }
        hf_fs::read_json::<Job>(self.job_path(id))
            .await?
            .ok_or(JobError::NotFound(id))
    }

    pub async fn list(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }

    /// Cooperative cancellation: workers observe this between items, never
    /// mid-item (spec §5 "Cancellation").
    pub async fn cancel(&self, id: Uuid) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
        if job.status.is_terminal() {
            return Err(JobError::AlreadyTerminal(id));
        }
        job.status = JobStatus::Cancelled;
        job.completed_at = Some(Utc::now());
        let snapshot = job.clone();
        drop(jobs);
        self.persist(&snapshot).await
    }

    /// Enumerates `<persist_dir>/*.json`; jobs left `queued` or `processing`
    /// from a prior run are reset to `queued` with `started_at` cleared and
    /// re-pushed onto the channel, best-effort if it is full (spec §4.8
    /// "Restore on startup"). Returns the number of jobs re-queued.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<usize, JobError> {
        tokio::fs::create_dir_all(&self.persist_dir)
            .await
            .map_err(|e| JobError::Io {
                job_id: Uuid::nil(),
                source: e,
            })?;

        let mut entries = tokio::fs::read_dir(&self.persist_dir)
            .await
            .map_err(|e| JobError::Io {
                job_id: Uuid::nil(),
                source: e,
            })?;

        let mut requeued = 0usize;
        let mut jobs = self.jobs.write().await;

        while let Some(entry) = entries.next_entry().await.map_err(|e| JobError::Io {
            job_id: Uuid::nil(),
            source: e,
        })? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(mut job) = hf_fs::read_json::<Job>(&path).await? else {
                continue;
            };

            if matches!(job.status, JobStatus::Queued | JobStatus::Processing) {
                job.status = JobStatus::Queued;
                job.started_at = None;
                self.persist(&job).await?;
                if self.sender.try_send(job.id).is_ok() {
                    requeued += 1;
                } else {
                    warn!(job_id = %job.id, "restore: queue full, job stays on disk for later Get");
                }
            }

            jobs.insert(job.id, job);
        }

        info!(count = requeued, "restored jobs from disk");
        Ok(requeued)
    }

    /// Signals workers to stop between items, waits for the pool to drain,
    /// then persists the in-flight map once more (spec §4.8 "Shutdown").
    pub async fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.receiver.close();

        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        let snapshot: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        for job in snapshot {
            if let Err(e) = self.persist(&job).await {
                warn!(job_id = %job.id, error = %e, "failed to persist job during shutdown");
            }
        }
    }

    #[instrument(skip(self, job_id))]
    async fn process_job(&self, job_id: Uuid) {
        let mut job = {
            let mut jobs = self.jobs.write().await;
            match jobs.get_mut(&job_id) {
                Some(job) => {
                    job.status = JobStatus::Processing;
                    job.started_at = Some(Utc::now());
                    job.clone()
                }
                None => return,
            }
        };

        if let Err(e) = self.persist(&job).await {
            warn!(job_id = %job_id, error = %e, "failed to persist job start");
        }

        let start = Instant::now();
        let mut succeeded = 0u64;
        let mut failed = 0u64;
        let item_count = job.items.len();

        for index in 0..item_count {
            let outcome = self
                .processor
                .process_item(job.job_type, &job.items[index])
                .await;
            match outcome {
                Ok(value) => {
                    job.items[index].result = Some(value);
                    job.items[index].error = None;
                    succeeded += 1;
                }
                Err(message) => {
                    job.items[index].error = Some(message);
                    job.items[index].result = None;
                    failed += 1;
                }
            }
            job.progress = (index + 1) as u64;

            if (index + 1) % self.persist_every == 0 {
                self.jobs.write().await.insert(job_id, job.clone());
                if let Err(e) = self.persist(&job).await {
                    warn!(job_id = %job_id, error = %e, "failed to persist job progress");
                }
            }

            if self.stopping.load(Ordering::SeqCst) {
                self.jobs.write().await.insert(job_id, job.clone());
                if let Err(e) = self.persist(&job).await {
                    warn!(job_id = %job_id, error = %e, "failed to persist job on shutdown mid-run");
                }
                return;
            }
        }

        let status = if failed == 0 {
            JobStatus::Completed
        } else if succeeded == 0 {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
        let message = if failed == 0 {
            format!("{succeeded} item(s) succeeded")
        } else if succeeded == 0 {
            format!("{failed} item(s) failed")
        } else {
            format!("partial success: {succeeded} succeeded, {failed} failed")
        };

        job.status = status;
        job.completed_at = Some(Utc::now());
        job.result = Some(JobResult {
            succeeded,
            failed,
            duration_ms: start.elapsed().as_millis() as u64,
            message,
        });

        self.jobs.write().await.insert(job_id, job.clone());
        if let Err(e) = self.persist(&job).await {
            warn!(job_id = %job_id, error = %e, "failed to persist terminal job state");
        }
        info!(job_id = %job_id, job_type = %job.job_type, status = %job.status, succeeded, failed, "job finished");
    }

    fn job_path(&self, id: Uuid) -> PathBuf {
        self.persist_dir.join(format!("{id}.json"))
    }

    async fn persist(&self, job: &Job) -> Result<(), JobError> {
        hf_fs::write_json_atomic(self.job_path(job.id), job)
            .await
            .map_err(JobError::from)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::time::{sleep, Duration};

    use super::*;
    use crate::processor::JobProcessor;

    /// Fails any item whose input carries `"fail": true`, otherwise echoes
    /// the input back as the result.
    struct EchoProcessor;

    #[async_trait]
    impl JobProcessor for EchoProcessor {
        async fn process_item(
            &self,
            _job_type: JobType,
            item: &JobItem,
        ) -> Result<serde_json::Value, String> {
            if item.input.get("fail").and_then(|v| v.as_bool()) == Some(true) {
                Err("item marked to fail".to_string())
            } else {
                Ok(item.input.clone())
            }
        }
    }

    async fn wait_for_terminal(queue: &Arc<JobQueue>, id: Uuid) -> Job {
        for _ in 0..200 {
            let job = queue.get(id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("job never reached a terminal state");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn all_items_succeed_completes_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let queue = JobQueue::new(dir.path(), 16, 2, DEFAULT_PERSIST_EVERY, Arc::new(EchoProcessor));
        queue.start().await;

        let items = vec![JobItem::new(json!({"n": 1})), JobItem::new(json!({"n": 2}))];
        let id = queue.enqueue(JobType::Json, items).await.unwrap();

        let job = wait_for_terminal(&queue, id).await;
        assert_eq!(job.status, JobStatus::Completed);
        let result = job.result.unwrap();
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 0);

        queue.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mixed_outcomes_complete_with_partial_success() {
        let dir = tempfile::tempdir().unwrap();
        let queue = JobQueue::new(dir.path(), 16, 1, DEFAULT_PERSIST_EVERY, Arc::new(EchoProcessor));
        queue.start().await;

        let items = vec![
            JobItem::new(json!({"n": 1})),
            JobItem::new(json!({"fail": true})),
        ];
        let id = queue.enqueue(JobType::Json, items).await.unwrap();

        let job = wait_for_terminal(&queue, id).await;
        assert_eq!(job.status, JobStatus::Completed);
        let result = job.result.unwrap();
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 1);
        assert!(result.message.contains("partial success"));

        queue.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restore_requeues_jobs_left_processing() {
        let dir = tempfile::tempdir().unwrap();

        let stuck = Job {
            status: JobStatus::Processing,
            started_at: Some(Utc::now()),
            ..Job::new(JobType::Json, vec![JobItem::new(json!({"n": 1}))])
        };
        hf_fs::write_json_atomic(dir.path().join(format!("{}.json", stuck.id)), &stuck)
            .await
            .unwrap();

        let queue = JobQueue::new(dir.path(), 16, 1, DEFAULT_PERSIST_EVERY, Arc::new(EchoProcessor));
        let requeued = queue.restore().await.unwrap();
        assert_eq!(requeued, 1);

        queue.start().await;
        let job = wait_for_terminal(&queue, stuck.id).await;
        assert_eq!(job.status, JobStatus::Completed);

        queue.shutdown().await;
    }
}
