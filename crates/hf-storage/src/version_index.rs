use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use hf_errors::StorageError;
use hf_types::{RetentionPolicy, VersionChain, VersionDiff, VersionMetadata};
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

/// Per-`file_id` ordered version history (spec §3, §4.7,
/// `metadata/versions.json`).
pub struct VersionIndex {
    path: PathBuf,
    chains: RwLock<HashMap<Uuid, VersionChain>>,
}

impl VersionIndex {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let chains_vec = hf_fs::read_json::<Vec<VersionChain>>(&path)
            .await?
            .unwrap_or_default();
        let chains = chains_vec.into_iter().map(|c| (c.file_id, c)).collect();
        Ok(Self {
            path,
            chains: RwLock::new(chains),
        })
    }

    #[instrument(skip(self))]
    pub async fn create_chain(&self, file_id: Uuid) -> Result<(), StorageError> {
        let snapshot = {
            let mut chains = self.chains.write().await;
            chains.entry(file_id).or_insert_with(|| VersionChain::new(file_id));
            values(&chains)
        };
        self.persist(&snapshot).await
    }

    /// Appends a new version and flips `is_current` to it, bumping
    /// `current_version` to `max(existing) + 1` (spec §4.7).
    #[instrument(skip(self))]
    pub async fn add_version(
        &self,
        file_id: Uuid,
        hash: String,
        size: u64,
        comment: Option<String>,
        uploader: Option<String>,
    ) -> Result<VersionMetadata, StorageError> {
        let (version, snapshot) = {
            let mut chains = self.chains.write().await;
            let chain = chains.entry(file_id).or_insert_with(|| VersionChain::new(file_id));

            for v in &mut chain.versions {
                v.is_current = false;
            }

            chain.current_version += 1;
            let version = VersionMetadata {
                file_id,
                version: chain.current_version,
                hash,
                size,
                comment,
                uploader,
                created_at: Utc::now(),
                is_current: true,
            };
            chain.versions.push(version.clone());
            (version, values(&chains))
        };
        self.persist(&snapshot).await?;
        Ok(version)
    }

    pub async fn get_version(
        &self,
        file_id: Uuid,
        version: u64,
    ) -> Result<VersionMetadata, StorageError> {
        self.chains
            .read()
            .await
            .get(&file_id)
            .and_then(|c| c.versions.iter().find(|v| v.version == version).cloned())
            .ok_or(StorageError::VersionNotFound(version, file_id.to_string()))
    }

    /// Newest-first (spec §4.7); the chain itself is stored append-order.
    pub async fn list_versions(&self, file_id: Uuid) -> Vec<VersionMetadata> {
        let mut versions = self
            .chains
            .read()
            .await
            .get(&file_id)
            .map(|c| c.versions.clone())
            .unwrap_or_default();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        versions
    }

    #[instrument(skip(self))]
    pub async fn revert_to(
        &self,
        file_id: Uuid,
        version: u64,
        new_comment: Option<String>,
    ) -> Result<VersionMetadata, StorageError> {
        let (reverted, snapshot) = {
            let mut chains = self.chains.write().await;
            let chain = chains
                .get_mut(&file_id)
                .ok_or(StorageError::VersionNotFound(version, file_id.to_string()))?;

            if !chain.versions.iter().any(|v| v.version == version) {
                return Err(StorageError::VersionNotFound(version, file_id.to_string()));
            }

            for v in &mut chain.versions {
                v.is_current = v.version == version;
                if v.version == version {
                    if let Some(comment) = &new_comment {
                        v.comment = Some(comment.clone());
                    }
                }
            }

            let reverted = chain
                .versions
                .iter()
                .find(|v| v.version == version)
                .cloned()
                .expect("version presence checked above");
            (reverted, values(&chains))
        };
        self.persist(&snapshot).await?;
        Ok(reverted)
    }

    /// Metadata-only comparison between two versions (spec §4.7 —
    /// content-level diff is a Non-goal).
    pub async fn diff(
        &self,
        file_id: Uuid,
        from_version: u64,
        to_version: u64,
    ) -> Result<VersionDiff, StorageError> {
        let from = self.get_version(file_id, from_version).await?;
        let to = self.get_version(file_id, to_version).await?;
        Ok(VersionDiff {
            from_version,
            to_version,
            old_hash: from.hash.clone(),
            new_hash: to.hash.clone(),
            hash_changed: from.hash != to.hash,
            size_delta: to.size as i64 - from.size as i64,
            old_comment: from.comment,
            new_comment: to.comment,
            old_uploader: from.uploader,
            new_uploader: to.uploader,
            time_delta_seconds: (to.created_at - from.created_at).num_seconds(),
        })
    }

    /// Prunes older versions, never dropping below `keep_minimum` (spec
    /// §3, §4.7). Returns the versions that were pruned.
    #[instrument(skip(self))]
    pub async fn apply_retention_policy(
        &self,
        file_id: Uuid,
        policy: RetentionPolicy,
        keep_minimum: u32,
    ) -> Result<Vec<VersionMetadata>, StorageError> {
        let keep_minimum = keep_minimum.max(1) as usize;

        let (pruned, snapshot) = {
            let mut chains = self.chains.write().await;
            let chain = chains
                .get_mut(&file_id)
                .ok_or(StorageError::VersionNotFound(0, file_id.to_string()))?;

            let mut sorted: Vec<VersionMetadata> = chain.versions.clone();
            sorted.sort_by(|a, b| b.version.cmp(&a.version));

            let keep_versions: std::collections::HashSet<u64> = match policy {
                RetentionPolicy::LastN(n) => {
                    let n = (n as usize).max(keep_minimum);
                    sorted.iter().take(n).map(|v| v.version).collect()
                }
                RetentionPolicy::WithinDays(days) => {
                    let cutoff = Utc::now() - chrono::Duration::days(days);
                    let mut keep: std::collections::HashSet<u64> = sorted
                        .iter()
                        .filter(|v| v.created_at >= cutoff)
                        .map(|v| v.version)
                        .collect();
                    if keep.len() < keep_minimum {
                        for v in sorted.iter().take(keep_minimum) {
                            keep.insert(v.version);
                        }
                    }
                    keep
                }
            };

            let pruned: Vec<VersionMetadata> = chain
                .versions
                .iter()
                .filter(|v| !keep_versions.contains(&v.version))
                .cloned()
                .collect();
            chain.versions.retain(|v| keep_versions.contains(&v.version));

            (pruned, values(&chains))
        };
        self.persist(&snapshot).await?;
        Ok(pruned)
    }

    async fn persist(&self, chains: &[VersionChain]) -> Result<(), StorageError> {
        hf_fs::write_json_atomic(&self.path, &chains).await
    }
}

fn values(map: &HashMap<Uuid, VersionChain>) -> Vec<VersionChain> {
    map.values().cloned().collect()
}
