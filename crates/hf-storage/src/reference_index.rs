use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use hf_errors::StorageError;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::instrument;

/// Durable `physical_path → set<hash>` relation (spec §4.6,
/// `metadata/references.json`). A relation, not ownership: hashes own their
/// `FileMetadata`; physical files are owned jointly by the set of hashes
/// referencing them.
pub struct ReferenceIndex {
    path: PathBuf,
    map: RwLock<HashMap<String, HashSet<String>>>,
}

#[derive(Serialize, Deserialize)]
struct OnDisk {
    path: String,
    hashes: Vec<String>,
}

impl ReferenceIndex {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = hf_fs::read_json::<Vec<OnDisk>>(&path).await?.unwrap_or_default();
        let map = entries
            .into_iter()
            .map(|e| (e.path, e.hashes.into_iter().collect()))
            .collect();
        Ok(Self {
            path,
            map: RwLock::new(map),
        })
    }

    #[instrument(skip(self))]
    pub async fn add_reference(
        &self,
        physical_path: &str,
        hash: &str,
    ) -> Result<u32, StorageError> {
        let (count, snapshot) = {
            let mut map = self.map.write().await;
            let set = map.entry(physical_path.to_string()).or_default();
            set.insert(hash.to_string());
            (set.len() as u32, to_on_disk(&map))
        };
        self.persist(&snapshot).await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    pub async fn remove_reference(
        &self,
        physical_path: &str,
        hash: &str,
    ) -> Result<u32, StorageError> {
        let (count, snapshot) = {
            let mut map = self.map.write().await;
            let remaining = if let Some(set) = map.get_mut(physical_path) {
                set.remove(hash);
                let remaining = set.len() as u32;
                if set.is_empty() {
                    map.remove(physical_path);
                }
                remaining
            } else {
                0
            };
            (remaining, to_on_disk(&map))
        };
        self.persist(&snapshot).await?;
        Ok(count)
    }

    pub async fn get_reference_count(&self, physical_path: &str) -> u32 {
        self.map
            .read()
            .await
            .get(physical_path)
            .map(|s| s.len() as u32)
            .unwrap_or(0)
    }

    pub async fn get_references(&self, physical_path: &str) -> HashSet<String> {
        self.map
            .read()
            .await
            .get(physical_path)
            .cloned()
            .unwrap_or_default()
    }

    async fn persist(&self, entries: &[OnDisk]) -> Result<(), StorageError> {
        hf_fs::write_json_atomic(&self.path, &entries).await
    }
}

fn to_on_disk(map: &HashMap<String, HashSet<String>>) -> Vec<OnDisk> {
    map.iter()
        .map(|(path, hashes)| OnDisk {
            path: path.clone(),
            hashes: hashes.iter().cloned().collect(),
        })
        .collect()
}
