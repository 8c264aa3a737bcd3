use async_trait::async_trait;
use hf_types::{JobItem, JobType};

/// Pluggable per-item work invoked by the [`crate::JobQueue`] worker loop
/// (spec §4.8: `ProcessItem(job, item)`).
///
/// A processor is shared across every worker, so implementations must be
/// `Send + Sync`; any state they need should be internally synchronized
/// (e.g. an `Arc<StorageManager>` captured at construction).
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process_item(
        &self,
        job_type: JobType,
        item: &JobItem,
    ) -> Result<serde_json::Value, String>;
}
