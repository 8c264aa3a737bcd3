use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hf_errors::{StorageError, ValidationError};
use hf_types::{FileMetadata, PROTECTED_METADATA_FIELDS};
use tokio::sync::RwLock;
use tracing::instrument;

const MAX_METADATA_KEY_LEN: usize = 256;
const MAX_METADATA_VALUE_BYTES: usize = 32 * 1024;
const MAX_METADATA_TOTAL_BYTES: usize = 64 * 1024;
const MAX_METADATA_FIELDS: usize = 100;
const MAX_BATCH_SIZE: usize = 100;

/// How [`MetadataIndex::update_metadata`] combines caller-supplied fields
/// with the existing map (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    Replace,
    Merge,
    Remove,
}

/// A set of filter predicates ANDed together by [`MetadataIndex::search`]
/// (spec §4.4).
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub name: Option<String>,
    pub category: Option<String>,
    pub extension: Option<String>,
    pub file_type: Option<String>,
    pub uploaded_after: Option<DateTime<Utc>>,
    pub uploaded_before: Option<DateTime<Utc>>,
}

/// Holds the hash→`FileMetadata` mapping in memory; every mutation
/// persists the entire map to `metadata/files.json` (spec §4.4).
pub struct MetadataIndex {
    path: PathBuf,
    map: RwLock<HashMap<String, FileMetadata>>,
}

impl MetadataIndex {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = hf_fs::read_json::<Vec<FileMetadata>>(&path)
            .await?
            .unwrap_or_default();
        let map = entries.into_iter().map(|m| (m.hash.clone(), m)).collect();
        Ok(Self {
            path,
            map: RwLock::new(map),
        })
    }

    pub async fn find_by_hash(&self, hash: &str) -> Option<FileMetadata> {
        self.map.read().await.get(hash).cloned()
    }

    pub async fn find_by_path(&self, stored_path: &str) -> Option<FileMetadata> {
        self.map
            .read()
            .await
            .values()
            .find(|m| m.stored_path == stored_path)
            .cloned()
    }

    #[instrument(skip(self, metadata))]
    pub async fn add(&self, metadata: FileMetadata) -> Result<(), StorageError> {
        let snapshot = {
            let mut map = self.map.write().await;
            map.insert(metadata.hash.clone(), metadata);
            snapshot_values(&map)
        };
        self.persist(&snapshot).await
    }

    #[instrument(skip(self, metadata))]
    pub async fn update(&self, metadata: FileMetadata) -> Result<(), StorageError> {
        self.add(metadata).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, hash: &str) -> Result<Option<FileMetadata>, StorageError> {
        let (removed, snapshot) = {
            let mut map = self.map.write().await;
            let removed = map.remove(hash);
            (removed, snapshot_values(&map))
        };
        self.persist(&snapshot).await?;
        Ok(removed)
    }

    /// Applies `action` to `hash`'s metadata map (spec §4.4). Validates
    /// every caller-supplied key/value before mutating anything, so an
    /// invalid request never partially applies.
    #[instrument(skip(self, fields))]
    pub async fn update_metadata(
        &self,
        hash: &str,
        action: UpdateAction,
        fields: HashMap<String, String>,
        remove_fields: Vec<String>,
    ) -> Result<FileMetadata, StorageError> {
        if action != UpdateAction::Remove {
            validate_metadata_fields(&fields)?;
        }

        let mut map = self.map.write().await;
        let entry = map
            .get_mut(hash)
            .ok_or_else(|| StorageError::HashNotFound(hash.to_string()))?;

        match action {
            UpdateAction::Replace => {
                entry.metadata = fields;
            }
            UpdateAction::Merge => {
                entry.metadata.extend(fields);
            }
            UpdateAction::Remove => {
                for key in &remove_fields {
                    entry.metadata.remove(key);
                }
            }
        }

        validate_total_metadata_size(&entry.metadata)?;
        // Best-effort snapshot per spec §9 open question (b): reconstructed
        // here, under the same lock, never re-read from disk.
        let snapshot = entry.clone();
        let persisted = snapshot_values(&map);
        drop(map);
        self.persist(&persisted).await?;
        Ok(snapshot)
    }

    /// Applies a list of metadata updates under a single lock acquisition
    /// and a single persistence at the end (spec §4.4, §4.3.8). Per-item
    /// errors are returned positionally; one failure never aborts the rest.
    #[instrument(skip(self, updates))]
    pub async fn batch_update_metadata(
        &self,
        updates: Vec<(String, UpdateAction, HashMap<String, String>, Vec<String>)>,
    ) -> Result<Vec<Result<FileMetadata, StorageError>>, StorageError> {
        if updates.len() > MAX_BATCH_SIZE {
            return Err(ValidationError::BatchTooLarge(updates.len(), MAX_BATCH_SIZE).into());
        }

        let mut map = self.map.write().await;
        let mut results = Vec::with_capacity(updates.len());

        for (hash, action, fields, remove_fields) in updates {
            let outcome = apply_one_update(&mut map, &hash, action, fields, remove_fields);
            results.push(outcome);
        }

        let snapshot = snapshot_values(&map);
        drop(map);
        self.persist(&snapshot).await?;
        Ok(results)
    }

    /// AND-composed substring/prefix/date-range search over the index
    /// (spec §4.4).
    pub async fn search(&self, filters: &SearchFilters) -> Vec<FileMetadata> {
        self.map
            .read()
            .await
            .values()
            .filter(|m| matches_filters(m, filters))
            .cloned()
            .collect()
    }

    pub async fn all(&self) -> Vec<FileMetadata> {
        self.map.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.map.read().await.len()
    }

    async fn persist(&self, entries: &[FileMetadata]) -> Result<(), StorageError> {
        hf_fs::write_json_atomic(&self.path, &entries).await
    }
}

fn snapshot_values(map: &HashMap<String, FileMetadata>) -> Vec<FileMetadata> {
    map.values().cloned().collect()
}

fn apply_one_update(
    map: &mut HashMap<String, FileMetadata>,
    hash: &str,
    action: UpdateAction,
    fields: HashMap<String, String>,
    remove_fields: Vec<String>,
) -> Result<FileMetadata, StorageError> {
    if action != UpdateAction::Remove {
        validate_metadata_fields(&fields)?;
    }

    let entry = map
        .get_mut(hash)
        .ok_or_else(|| StorageError::HashNotFound(hash.to_string()))?;

    match action {
        UpdateAction::Replace => entry.metadata = fields,
        UpdateAction::Merge => entry.metadata.extend(fields),
        UpdateAction::Remove => {
            for key in &remove_fields {
                entry.metadata.remove(key);
            }
        }
    }

    validate_total_metadata_size(&entry.metadata)?;
    Ok(entry.clone())
}

fn validate_metadata_fields(fields: &HashMap<String, String>) -> Result<(), ValidationError> {
    if fields.len() > MAX_METADATA_FIELDS {
        return Err(ValidationError::MetadataTooManyFields);
    }
    for (key, value) in fields {
        if PROTECTED_METADATA_FIELDS.contains(&key.as_str()) {
            return Err(ValidationError::ProtectedMetadataField(key.clone()));
        }
        if key.len() > MAX_METADATA_KEY_LEN {
            return Err(ValidationError::MetadataKeyTooLong(key.clone()));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
        {
            return Err(ValidationError::InvalidMetadataKey(key.clone()));
        }
        if value.len() > MAX_METADATA_VALUE_BYTES {
            return Err(ValidationError::MetadataValueTooLarge(key.clone()));
        }
    }
    Ok(())
}

fn validate_total_metadata_size(metadata: &HashMap<String, String>) -> Result<(), ValidationError> {
    if metadata.len() > MAX_METADATA_FIELDS {
        return Err(ValidationError::MetadataTooManyFields);
    }
    let total: usize = metadata.iter().map(|(k, v)| k.len() + v.len()).sum();
    if total > MAX_METADATA_TOTAL_BYTES {
        return Err(ValidationError::MetadataTotalTooLarge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(hash: &str, name: &str, category: &str, mime_type: &str) -> FileMetadata {
        FileMetadata::new(
            hash.to_string(),
            name.to_string(),
            format!("storage/{category}/{name}"),
            category.to_string(),
            mime_type.to_string(),
            1024,
        )
    }

    async fn index_in_tempdir() -> (MetadataIndex, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = MetadataIndex::load(dir.path().join("files.json"))
            .await
            .expect("loads");
        (index, dir)
    }

    #[tokio::test]
    async fn merge_extends_without_discarding_existing_keys() {
        let (index, _dir) = index_in_tempdir().await;
        let mut meta = sample("h1", "a.txt", "documents/txt", "text/plain");
        meta.metadata.insert("author".to_string(), "alice".to_string());
        index.add(meta).await.unwrap();

        let mut fields = HashMap::new();
        fields.insert("project".to_string(), "holdfast".to_string());
        let updated = index
            .update_metadata("h1", UpdateAction::Merge, fields, vec![])
            .await
            .unwrap();

        assert_eq!(updated.metadata.get("author").unwrap(), "alice");
        assert_eq!(updated.metadata.get("project").unwrap(), "holdfast");
    }

    #[tokio::test]
    async fn merge_is_idempotent_for_the_same_input() {
        let (index, _dir) = index_in_tempdir().await;
        index
            .add(sample("h1", "a.txt", "documents/txt", "text/plain"))
            .await
            .unwrap();

        let mut fields = HashMap::new();
        fields.insert("project".to_string(), "holdfast".to_string());

        let first = index
            .update_metadata("h1", UpdateAction::Merge, fields.clone(), vec![])
            .await
            .unwrap();
        let second = index
            .update_metadata("h1", UpdateAction::Merge, fields, vec![])
            .await
            .unwrap();

        assert_eq!(first.metadata, second.metadata);
    }

    #[tokio::test]
    async fn replace_discards_prior_keys() {
        let (index, _dir) = index_in_tempdir().await;
        let mut meta = sample("h1", "a.txt", "documents/txt", "text/plain");
        meta.metadata.insert("stale".to_string(), "value".to_string());
        index.add(meta).await.unwrap();

        let mut fields = HashMap::new();
        fields.insert("fresh".to_string(), "value".to_string());
        let updated = index
            .update_metadata("h1", UpdateAction::Replace, fields, vec![])
            .await
            .unwrap();

        assert!(!updated.metadata.contains_key("stale"));
        assert_eq!(updated.metadata.get("fresh").unwrap(), "value");
    }

    #[tokio::test]
    async fn remove_deletes_only_the_named_keys() {
        let (index, _dir) = index_in_tempdir().await;
        let mut meta = sample("h1", "a.txt", "documents/txt", "text/plain");
        meta.metadata.insert("keep".to_string(), "1".to_string());
        meta.metadata.insert("drop".to_string(), "2".to_string());
        index.add(meta).await.unwrap();

        let updated = index
            .update_metadata(
                "h1",
                UpdateAction::Remove,
                HashMap::new(),
                vec!["drop".to_string()],
            )
            .await
            .unwrap();

        assert!(updated.metadata.contains_key("keep"));
        assert!(!updated.metadata.contains_key("drop"));
    }

    #[tokio::test]
    async fn update_metadata_rejects_a_protected_field() {
        let (index, _dir) = index_in_tempdir().await;
        index
            .add(sample("h1", "a.txt", "documents/txt", "text/plain"))
            .await
            .unwrap();

        let mut fields = HashMap::new();
        fields.insert("hash".to_string(), "evil".to_string());
        let err = index
            .update_metadata("h1", UpdateAction::Merge, fields, vec![])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::ProtectedMetadataField(_))
        ));
    }

    #[tokio::test]
    async fn batch_update_reports_per_item_failures_without_aborting() {
        let (index, _dir) = index_in_tempdir().await;
        index
            .add(sample("h1", "a.txt", "documents/txt", "text/plain"))
            .await
            .unwrap();

        let mut ok_fields = HashMap::new();
        ok_fields.insert("note".to_string(), "fine".to_string());

        let updates = vec![
            ("h1".to_string(), UpdateAction::Merge, ok_fields, vec![]),
            (
                "missing".to_string(),
                UpdateAction::Merge,
                HashMap::new(),
                vec![],
            ),
        ];

        let results = index.batch_update_metadata(updates).await.unwrap();
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(StorageError::HashNotFound(ref h)) if h == "missing"
        ));

        // the failed item must not have blocked the successful one from persisting
        let reloaded = index.find_by_hash("h1").await.unwrap();
        assert_eq!(reloaded.metadata.get("note").unwrap(), "fine");
    }

    #[tokio::test]
    async fn search_matches_are_anded_across_filters() {
        let (index, _dir) = index_in_tempdir().await;
        index
            .add(sample("h1", "vacation.jpg", "images/jpg", "image/jpeg"))
            .await
            .unwrap();
        index
            .add(sample("h2", "vacation.mp4", "videos/mp4", "video/mp4"))
            .await
            .unwrap();
        index
            .add(sample("h3", "report.jpg", "images/jpg", "image/jpeg"))
            .await
            .unwrap();

        let filters = SearchFilters {
            name: Some("vacation".to_string()),
            file_type: Some("image".to_string()),
            ..Default::default()
        };
        let results = index.search(&filters).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].hash, "h1");
    }

    #[tokio::test]
    async fn search_extension_filter_is_exact_and_case_insensitive() {
        let (index, _dir) = index_in_tempdir().await;
        index
            .add(sample("h1", "report.JPG", "images/jpg", "image/jpeg"))
            .await
            .unwrap();

        let filters = SearchFilters {
            extension: Some(".jpg".to_string()),
            ..Default::default()
        };
        let results = index.search(&filters).await;
        assert_eq!(results.len(), 1);
    }
}

fn matches_filters(meta: &FileMetadata, filters: &SearchFilters) -> bool {
    if let Some(name) = &filters.name {
        if !meta
            .original_name
            .to_lowercase()
            .contains(&name.to_lowercase())
        {
            return false;
        }
    }

    if let Some(category) = &filters.category {
        if !meta
            .category
            .to_lowercase()
            .contains(&category.to_lowercase())
        {
            return false;
        }
    }

    if let Some(extension) = &filters.extension {
        let wanted = extension.trim_start_matches('.').to_lowercase();
        let actual = meta
            .stored_path
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_lowercase();
        if actual != wanted {
            return false;
        }
    }

    if let Some(file_type) = &filters.file_type {
        let wanted = file_type.to_lowercase();
        let mime_matches = meta.mime_type.to_lowercase().starts_with(&wanted);
        let category_matches = meta.category.to_lowercase().starts_with(&wanted);
        let bare_token_matches = matches!(wanted.as_str(), "image" | "video" | "audio")
            && meta.mime_type.to_lowercase().starts_with(&format!("{wanted}/"));
        if !(mime_matches || category_matches || bare_token_matches) {
            return false;
        }
    }

    if let Some(after) = filters.uploaded_after {
        if meta.uploaded_at < after {
            return false;
        }
    }

    if let Some(before) = filters.uploaded_before {
        if meta.uploaded_at > before {
            return false;
        }
    }

    true
}
