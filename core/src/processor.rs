use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hf_jobs::JobProcessor;
use hf_storage::StorageManager;
use hf_types::{JobItem, JobType};
use serde_json::json;

/// Default [`JobProcessor`] wiring the three job kinds spec.md names (§3:
/// "media|json|batch") onto [`StorageManager`] operations. `item.input`
/// carries an opaque descriptor per job type:
///
/// - `media`: `{"source_path": "...", "filename": "...", "subdirs": [...]}`
///   — reads `source_path` and calls [`StorageManager::store_media`].
/// - `json`: `{"engine": "...", "namespace": "...", "record": <any JSON>}`
///   — appends `record` to `json/<engine>/<namespace>/batch_<UTC
///   timestamp>.ndjson` (spec §6).
/// - `batch`: `{"op": "move", "hash": "...", "category": "..."}` — applies
///   one `StorageManager::move_file` per item.
pub struct IngestJobProcessor {
    storage: Arc<StorageManager>,
}

impl IngestJobProcessor {
    pub fn new(storage: Arc<StorageManager>) -> Self {
        Self { storage }
    }

    async fn process_media(&self, item: &JobItem) -> Result<serde_json::Value, String> {
        let source_path = item.input["source_path"]
            .as_str()
            .ok_or("media item missing source_path")?;
        let filename = item.input["filename"]
            .as_str()
            .ok_or("media item missing filename")?;
        let subdirs: Vec<String> = item.input["subdirs"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();

        let file = tokio::fs::File::open(source_path)
            .await
            .map_err(|e| format!("failed to open {source_path}: {e}"))?;

        let stored_path = self
            .storage
            .store_media(file, filename, &subdirs)
            .await
            .map_err(|e| e.to_string())?;

        Ok(json!({ "stored_path": stored_path }))
    }

    async fn process_json(&self, item: &JobItem) -> Result<serde_json::Value, String> {
        let engine = item.input["engine"].as_str().ok_or("json item missing engine")?;
        let namespace = item.input["namespace"]
            .as_str()
            .ok_or("json item missing namespace")?;
        let record = item.input.get("record").ok_or("json item missing record")?;

        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.fZ");
        let path = self
            .storage
            .root()
            .join("json")
            .join(engine)
            .join(namespace)
            .join(format!("batch_{timestamp}.ndjson"));

        hf_fs::append_ndjson(&path, record).await;

        Ok(json!({ "path": path.to_string_lossy() }))
    }

    async fn process_batch(&self, item: &JobItem) -> Result<serde_json::Value, String> {
        let op = item.input["op"].as_str().ok_or("batch item missing op")?;
        match op {
            "move" => {
                let hash = item.input["hash"].as_str().ok_or("batch move missing hash")?;
                let category = item.input["category"]
                    .as_str()
                    .ok_or("batch move missing category")?;
                let outcome = self
                    .storage
                    .move_file(hash, category, None)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(json!({ "hash": outcome.metadata.hash, "renamed": outcome.renamed }))
            }
            other => Err(format!("unsupported batch op: {other}")),
        }
    }
}

#[async_trait]
impl JobProcessor for IngestJobProcessor {
    async fn process_item(
        &self,
        job_type: JobType,
        item: &JobItem,
    ) -> Result<serde_json::Value, String> {
        match job_type {
            JobType::Media => self.process_media(item).await,
            JobType::Json => self.process_json(item).await,
            JobType::Batch => self.process_batch(item).await,
        }
    }
}
