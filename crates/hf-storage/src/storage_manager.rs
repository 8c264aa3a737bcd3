use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use hf_errors::{StorageError, ValidationError};
use hf_fs::FastWriter;
use hf_types::FileMetadata;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncRead;
use tokio::sync::Mutex;
use tracing::{info, instrument, trace, warn};
use uuid::Uuid;

use crate::metadata_index::MetadataIndex;
use crate::notes_index::NotesIndex;
use crate::reference_index::ReferenceIndex;
use crate::version_index::VersionIndex;

const MAX_BATCH_SIZE: usize = 100;

/// Outcome of [`StorageManager::move_file`] (spec §4.3.7): `renamed` is
/// true when the destination filename collided and a disambiguating
/// suffix was appended.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub metadata: FileMetadata,
    pub renamed: bool,
}

#[derive(Serialize)]
struct RenameAuditRecord<'a> {
    hash: &'a str,
    old_name: &'a str,
    new_name: &'a str,
    old_stored_path: Option<&'a str>,
    new_stored_path: Option<&'a str>,
    at: chrono::DateTime<Utc>,
}

#[derive(Serialize)]
struct DeleteAuditRecord<'a> {
    hash: &'a str,
    stored_path: &'a str,
    physical_file_removed: bool,
    at: chrono::DateTime<Utc>,
}

#[derive(Serialize)]
struct DownloadAuditRecord<'a> {
    hash: &'a str,
    stored_path: &'a str,
    at: chrono::DateTime<Utc>,
}

/// Orchestrates store/retrieve/rename/delete/copy/move/version under a
/// single serialization lock (spec §4.3). All mutating operations, and
/// read-only metadata lookups, acquire `lock` for the duration of index
/// lookup plus persistence; the lock is never held across an unbounded read
/// from an untrusted reader (content is streamed to a temp file first).
pub struct StorageManager {
    root: PathBuf,
    tmp_dir_name: String,
    lock: Mutex<()>,
    pub metadata_index: Arc<MetadataIndex>,
    pub reference_index: Arc<ReferenceIndex>,
    pub notes_index: Arc<NotesIndex>,
    pub version_index: Arc<VersionIndex>,
    pub routing_rules: Arc<hf_classify::RoutingRulesStore>,
}

impl StorageManager {
    /// Loads a manager rooted at `root`, scratching in-flight writes under
    /// `storage/<tmp_dir_name>` (SPEC_FULL §B, `Config::tmp_dir_name`).
    pub async fn load(root: impl AsRef<Path>, tmp_dir_name: impl Into<String>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        let tmp_dir_name = tmp_dir_name.into();
        tokio::fs::create_dir_all(root.join("storage").join(&tmp_dir_name))
            .await
            .map_err(|e| StorageError::io(&root, e))?;
        tokio::fs::create_dir_all(root.join("media"))
            .await
            .map_err(|e| StorageError::io(&root, e))?;
        tokio::fs::create_dir_all(root.join("metadata"))
            .await
            .map_err(|e| StorageError::io(&root, e))?;

        let metadata_index = Arc::new(MetadataIndex::load(root.join("metadata/files.json")).await?);
        let reference_index =
            Arc::new(ReferenceIndex::load(root.join("metadata/references.json")).await?);
        let notes_index = Arc::new(NotesIndex::load(root.join("metadata/notes.json")).await?);
        let version_index = Arc::new(VersionIndex::load(root.join("metadata/versions.json")).await?);
        let routing_rules =
            Arc::new(hf_classify::RoutingRulesStore::load(root.join("metadata/routing_rules.json")).await?);

        Ok(Self {
            root,
            tmp_dir_name,
            lock: Mutex::new(()),
            metadata_index,
            reference_index,
            notes_index,
            version_index,
            routing_rules,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The real content digest a `FileMetadata` shares storage under: its
    /// own `hash` for a canonical entry, or `linked_to` for a hard-linked
    /// copy. See DESIGN.md for why these can differ.
    fn content_key(meta: &FileMetadata) -> String {
        meta.linked_to.clone().unwrap_or_else(|| meta.hash.clone())
    }

    /// Streams `reader` to a temp file while hashing it, then — under the
    /// manager lock — either discards the temp file as a duplicate or
    /// commits it into the classified tree (spec §4.3.1).
    #[instrument(skip(self, reader, metadata))]
    pub async fn store_file<R: AsyncRead + Unpin>(
        &self,
        reader: R,
        filename: &str,
        mime_type: &str,
        size_hint: Option<u64>,
        metadata: std::collections::HashMap<String, String>,
        category_hint: Option<&str>,
    ) -> Result<(FileMetadata, bool), StorageError> {
        hf_fs::validate_filename(filename)?;

        let components = hf_classify::classify(mime_type, filename, category_hint, Some(&self.routing_rules));
        let target_dir = self.root.join("storage").join(components.join("/"));
        let tmp_dir = self.root.join("storage").join(&self.tmp_dir_name);
        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(|e| StorageError::io(&target_dir, e))?;
        tokio::fs::create_dir_all(&tmp_dir)
            .await
            .map_err(|e| StorageError::io(&tmp_dir, e))?;

        let tmp_path = tmp_dir.join(format!("tmp_{}", Uuid::new_v4()));
        let write_result = async {
            let mut writer = FastWriter::create(&tmp_path, size_hint)
                .await
                .map_err(|e| StorageError::io(&tmp_path, e))?;
            writer
                .tee_from(reader)
                .await
                .map_err(|e| StorageError::io(&tmp_path, e))?;
            writer.finish().await.map_err(|e| StorageError::io(&tmp_path, e))
        }
        .await;

        let (hash, _streamed_size) = match write_result {
            Ok(pair) => pair,
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(e);
            }
        };

        let _guard = self.lock.lock().await;

        if let Some(existing) = self.metadata_index.find_by_hash(&hash).await {
            trace!(hash = %hash, "duplicate content observed, dropping temp file");
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Ok((existing, true));
        }

        let ext = extract_extension_with_dot(filename);
        let base = hf_fs::sanitize_base_name(strip_extension(filename));
        let final_name = format!("{}_{}{}", &hash[..12], base, ext.to_lowercase());
        let final_path = target_dir.join(&final_name);

        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(|e| StorageError::io(&final_path, e))?;

        let authoritative_size = tokio::fs::metadata(&final_path)
            .await
            .map_err(|e| StorageError::io(&final_path, e))?
            .len();

        let stored_path = repo_relative(&self.root, &final_path);
        let file_meta = FileMetadata {
            hash: hash.clone(),
            original_name: filename.to_string(),
            stored_path,
            category: components.join("/"),
            mime_type: mime_type.to_string(),
            size: authoritative_size,
            uploaded_at: Utc::now(),
            metadata,
            ref_count: 1,
            is_hard_link: false,
            linked_to: None,
        };

        if let Err(e) = self.metadata_index.add(file_meta.clone()).await {
            let _ = tokio::fs::remove_file(&final_path).await;
            return Err(e);
        }

        info!(hash = %hash, path = %file_meta.stored_path, "stored new file");
        Ok((file_meta, false))
    }

    /// Pre-classified, non-deduplicated write used by collaborators that
    /// already know the layout (spec §4.3.2). Returns the repo-relative path.
    #[instrument(skip(self, reader))]
    pub async fn store_media<R: AsyncRead + Unpin>(
        &self,
        reader: R,
        filename: &str,
        subdirs: &[String],
    ) -> Result<String, StorageError> {
        hf_fs::validate_filename(filename)?;

        let dir = self.root.join("media").join(subdirs.join("/"));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, e))?;

        let ext = extract_extension_with_dot(filename);
        let base = hf_fs::sanitize_base_name(strip_extension(filename));
        let final_name = format!("{}_{}{}", base, Uuid::new_v4(), ext.to_lowercase());
        let final_path = dir.join(&final_name);

        let mut writer = FastWriter::create(&final_path, None)
            .await
            .map_err(|e| StorageError::io(&final_path, e))?;
        if let Err(e) = writer.tee_from(reader).await {
            let _ = tokio::fs::remove_file(&final_path).await;
            return Err(StorageError::io(&final_path, e));
        }
        writer.finish().await.map_err(|e| StorageError::io(&final_path, e))?;

        Ok(repo_relative(&self.root, &final_path))
    }

    pub async fn get_file_metadata(&self, hash: &str) -> Result<FileMetadata, StorageError> {
        let _guard = self.lock.lock().await;
        self.metadata_index
            .find_by_hash(hash)
            .await
            .ok_or_else(|| StorageError::HashNotFound(hash.to_string()))
    }

    /// Opens the physical file for `hash`, appending a `download_log.ndjson`
    /// audit record on success (SPEC_FULL §C).
    #[instrument(skip(self))]
    pub async fn get_file_by_hash(
        &self,
        hash: &str,
    ) -> Result<(FileMetadata, tokio::fs::File), StorageError> {
        let meta = self.get_file_metadata(hash).await?;
        let full_path = self.root.join(&meta.stored_path);
        let file = tokio::fs::File::open(&full_path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StorageError::PhysicalFileMissing(hash.to_string())
                } else {
                    StorageError::io(&full_path, e)
                }
            })?;

        hf_fs::append_ndjson(
            self.root.join("metadata/download_log.ndjson"),
            &DownloadAuditRecord {
                hash: &meta.hash,
                stored_path: &meta.stored_path,
                at: Utc::now(),
            },
        )
        .await;

        Ok((meta, file))
    }

    /// Opens the physical file at `relative_path`, rejecting traversal
    /// attempts (spec §4.3.3, §8 scenario 2).
    #[instrument(skip(self))]
    pub async fn get_file_by_path(
        &self,
        relative_path: &str,
    ) -> Result<(FileMetadata, tokio::fs::File), StorageError> {
        let resolved = hf_fs::validate_relative_path(&self.root, relative_path)?;
        let repo_relative_str = repo_relative(&self.root, &resolved);

        let _guard = self.lock.lock().await;
        let meta = self
            .metadata_index
            .find_by_path(&repo_relative_str)
            .await
            .ok_or_else(|| StorageError::PathNotFound(resolved.clone()))?;
        drop(_guard);

        let file = tokio::fs::File::open(&resolved)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StorageError::PhysicalFileMissing(meta.hash.clone())
                } else {
                    StorageError::io(&resolved, e)
                }
            })?;

        hf_fs::append_ndjson(
            self.root.join("metadata/download_log.ndjson"),
            &DownloadAuditRecord {
                hash: &meta.hash,
                stored_path: &meta.stored_path,
                at: Utc::now(),
            },
        )
        .await;

        Ok((meta, file))
    }

    /// Renames a file's `original_name`, and optionally its physical file
    /// preserving the digest prefix (spec §4.3.4). Rolls the physical
    /// rename back if index persistence subsequently fails.
    #[instrument(skip(self))]
    pub async fn rename_file(
        &self,
        hash: &str,
        new_name: &str,
        update_stored_file: bool,
    ) -> Result<FileMetadata, StorageError> {
        hf_fs::validate_filename(new_name)?;

        let _guard = self.lock.lock().await;
        let mut meta = self
            .metadata_index
            .find_by_hash(hash)
            .await
            .ok_or_else(|| StorageError::HashNotFound(hash.to_string()))?;

        let old_name = meta.original_name.clone();
        let old_stored_path = meta.stored_path.clone();
        let mut physical_renamed = false;

        if update_stored_file {
            let old_full = self.root.join(&meta.stored_path);
            let parent = old_full.parent().unwrap_or(&self.root).to_path_buf();
            let ext = extract_extension_with_dot(new_name);
            let base = hf_fs::sanitize_base_name(strip_extension(new_name));
            let new_filename = format!("{}_{}{}", &hash[..12], base, ext.to_lowercase());
            let new_full = parent.join(&new_filename);

            if new_full != old_full && tokio::fs::metadata(&new_full).await.is_ok() {
                return Err(StorageError::NameConflict(new_filename));
            }

            if new_full != old_full {
                tokio::fs::rename(&old_full, &new_full)
                    .await
                    .map_err(|e| StorageError::io(&new_full, e))?;
                physical_renamed = true;
            }

            meta.stored_path = repo_relative(&self.root, &new_full);
        }

        meta.original_name = new_name.to_string();

        if let Err(e) = self.metadata_index.update(meta.clone()).await {
            if physical_renamed {
                let old_full = self.root.join(&old_stored_path);
                let new_full = self.root.join(&meta.stored_path);
                if let Err(rollback_err) = tokio::fs::rename(&new_full, &old_full).await {
                    return Err(StorageError::RollbackFailed {
                        primary: e.to_string(),
                        rollback: rollback_err.to_string(),
                    });
                }
            }
            return Err(e);
        }

        hf_fs::append_ndjson(
            self.root.join("metadata/rename_log.ndjson"),
            &RenameAuditRecord {
                hash,
                old_name: &old_name,
                new_name,
                old_stored_path: Some(&old_stored_path),
                new_stored_path: Some(&meta.stored_path),
                at: Utc::now(),
            },
        )
        .await;

        Ok(meta)
    }

    /// Deletes `hash` (spec §4.3.5). If the physical path is shared via
    /// `ReferenceIndex`, only the reference and this metadata entry are
    /// removed; the physical file is removed only when no hash references
    /// it anymore, and only after metadata removal succeeds.
    #[instrument(skip(self))]
    pub async fn delete_file(&self, hash: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;

        let meta = self
            .metadata_index
            .find_by_hash(hash)
            .await
            .ok_or_else(|| StorageError::HashNotFound(hash.to_string()))?;

        let remaining_refs = self
            .reference_index
            .remove_reference(&meta.stored_path, hash)
            .await?;

        self.metadata_index.delete(hash).await?;

        let mut physical_removed = false;
        if remaining_refs == 0 {
            let full_path = self.root.join(&meta.stored_path);
            match tokio::fs::remove_file(&full_path).await {
                Ok(()) => physical_removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %full_path.display(), error = %e, "failed to remove physical file after delete"),
            }
        } else {
            self.sync_ref_counts(&meta.stored_path, remaining_refs).await?;
        }

        hf_fs::append_ndjson(
            self.root.join("metadata/delete_log.ndjson"),
            &DeleteAuditRecord {
                hash,
                stored_path: &meta.stored_path,
                physical_file_removed: physical_removed,
                at: Utc::now(),
            },
        )
        .await;

        Ok(())
    }

    /// Copies `hash` to a new logical name. Per spec §4.3.6 the
    /// implementation may short-circuit a full copy to the hard-link path
    /// at its discretion: since the content is byte-identical, a full copy
    /// would rehash to the same digest as the source, so both modes here
    /// register a second `FileMetadata` sharing the source's physical file
    /// (see DESIGN.md). `hard_link` is accepted for API fidelity with the
    /// spec's two named modes.
    #[instrument(skip(self))]
    pub async fn copy_file(
        &self,
        hash: &str,
        new_name: &str,
        hard_link: bool,
        destination_category: Option<&str>,
    ) -> Result<FileMetadata, StorageError> {
        let _ = hard_link;
        hf_fs::validate_filename(new_name)?;

        let _guard = self.lock.lock().await;
        let source = self
            .metadata_index
            .find_by_hash(hash)
            .await
            .ok_or_else(|| StorageError::HashNotFound(hash.to_string()))?;

        let category = match destination_category {
            Some(c) => hf_types::validate_category(c)
                .map_err(map_category_error)?
                .join("/"),
            None => source.category.clone(),
        };

        let conflict = self
            .metadata_index
            .all()
            .await
            .into_iter()
            .any(|m| m.category == category && m.original_name == new_name);
        if conflict {
            return Err(StorageError::CopyConflict(new_name.to_string()));
        }

        let canonical_hash = Self::content_key(&source);
        let link_hash = hex::encode(Sha256::digest(
            format!("{canonical_hash}:{}", Uuid::new_v4()).as_bytes(),
        ));

        let mut new_meta = source.clone();
        new_meta.hash = link_hash.clone();
        new_meta.original_name = new_name.to_string();
        new_meta.category = category;
        new_meta.uploaded_at = Utc::now();
        new_meta.is_hard_link = true;
        new_meta.linked_to = Some(canonical_hash.clone());

        self.metadata_index.add(new_meta.clone()).await?;

        // Register the canonical hash's own reference the first time a
        // physical path gains a second owner.
        self.reference_index
            .add_reference(&source.stored_path, &canonical_hash)
            .await?;
        let count = self
            .reference_index
            .add_reference(&source.stored_path, &link_hash)
            .await?;

        self.sync_ref_counts(&source.stored_path, count).await?;

        Ok(new_meta)
    }

    /// Relocates a file's category, renaming both the physical file and
    /// every metadata entry sharing its `stored_path` (spec §4.3.7).
    #[instrument(skip(self))]
    pub async fn move_file(
        &self,
        hash: &str,
        new_category: &str,
        move_reason: Option<&str>,
    ) -> Result<MoveOutcome, StorageError> {
        let category_components =
            hf_types::validate_category(new_category).map_err(map_category_error)?;
        let category = category_components.join("/");

        let _guard = self.lock.lock().await;
        let mut meta = self
            .metadata_index
            .find_by_hash(hash)
            .await
            .ok_or_else(|| StorageError::HashNotFound(hash.to_string()))?;

        let old_stored_path = meta.stored_path.clone();
        let old_full = self.root.join(&old_stored_path);
        let file_name = old_full
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let new_dir = self.root.join("storage").join(&category);
        tokio::fs::create_dir_all(&new_dir)
            .await
            .map_err(|e| StorageError::io(&new_dir, e))?;

        let mut renamed = false;
        let mut new_full = new_dir.join(&file_name);
        if tokio::fs::metadata(&new_full).await.is_ok() {
            let (stem, ext) = split_stem_ext(&file_name);
            new_full = new_dir.join(format!("{stem}_{}{ext}", &Uuid::new_v4().to_string()[..8]));
            renamed = true;
        }

        tokio::fs::rename(&old_full, &new_full)
            .await
            .map_err(|e| StorageError::io(&new_full, e))?;

        let new_stored_path = repo_relative(&self.root, &new_full);

        let siblings: Vec<FileMetadata> = self
            .metadata_index
            .all()
            .await
            .into_iter()
            .filter(|m| m.stored_path == old_stored_path && m.hash != hash)
            .collect();

        meta.stored_path = new_stored_path.clone();
        meta.category = category;
        meta.metadata.insert(
            "moved_from".to_string(),
            old_stored_path.clone(),
        );
        meta.metadata
            .insert("moved_at".to_string(), Utc::now().to_rfc3339());
        if let Some(reason) = move_reason {
            meta.metadata
                .insert("move_reason".to_string(), reason.to_string());
        }

        let persist_result = async {
            self.metadata_index.update(meta.clone()).await?;
            for mut sibling in siblings {
                sibling.stored_path = new_stored_path.clone();
                self.metadata_index.update(sibling).await?;
            }
            Ok::<(), StorageError>(())
        }
        .await;

        if let Err(e) = persist_result {
            if let Err(rollback_err) = tokio::fs::rename(&new_full, &old_full).await {
                return Err(StorageError::RollbackFailed {
                    primary: e.to_string(),
                    rollback: rollback_err.to_string(),
                });
            }
            return Err(e);
        }

        Ok(MoveOutcome { metadata: meta, renamed })
    }

    /// Processes up to 100 category moves under one lock acquisition,
    /// reporting per-item success/failure without aborting on the first
    /// error (spec §4.3.8).
    #[instrument(skip(self, items))]
    pub async fn batch_move(
        &self,
        items: Vec<(String, String)>,
    ) -> Result<Vec<Result<MoveOutcome, StorageError>>, StorageError> {
        if items.len() > MAX_BATCH_SIZE {
            return Err(ValidationError::BatchTooLarge(items.len(), MAX_BATCH_SIZE).into());
        }
        let mut results = Vec::with_capacity(items.len());
        for (hash, category) in items {
            results.push(self.move_file(&hash, &category, None).await);
        }
        Ok(results)
    }

    async fn sync_ref_counts(&self, stored_path: &str, count: u32) -> Result<(), StorageError> {
        let effective = count.max(1);
        let entries: Vec<FileMetadata> = self
            .metadata_index
            .all()
            .await
            .into_iter()
            .filter(|m| m.stored_path == stored_path && m.ref_count != effective)
            .collect();
        for mut entry in entries {
            entry.ref_count = effective;
            self.metadata_index.update(entry).await?;
        }
        Ok(())
    }
}

/// Translates a category-validation failure into the matching
/// `ValidationError` variant; the generic shapes (empty, parent-ref, empty
/// segment, bad charset) collapse into `InvalidCategory` with the
/// underlying message, while the three well-defined limit violations keep
/// their own typed variant.
fn map_category_error(err: hf_types::CategoryError) -> ValidationError {
    match err {
        hf_types::CategoryError::TooDeep(depth, max) => ValidationError::CategoryTooDeep(depth, max),
        hf_types::CategoryError::SegmentTooLong(segment, max) => {
            ValidationError::CategorySegmentTooLong(segment, max)
        }
        hf_types::CategoryError::ReservedName(segment) => {
            ValidationError::CategoryReservedName(segment)
        }
        other => ValidationError::InvalidCategory(other.to_string()),
    }
}

fn repo_relative(root: &Path, full_path: &Path) -> String {
    full_path
        .strip_prefix(root)
        .unwrap_or(full_path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn extract_extension_with_dot(filename: &str) -> String {
    let filename = filename.rsplit('/').next().unwrap_or(filename);
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => format!(".{ext}"),
        _ => String::new(),
    }
}

fn strip_extension(filename: &str) -> &str {
    let filename = filename.rsplit('/').next().unwrap_or(filename);
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    }
}

fn split_stem_ext(filename: &str) -> (String, String) {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
        _ => (filename.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn manager_in_tempdir() -> (StorageManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = StorageManager::load(dir.path(), ".tmp").await.expect("loads");
        (manager, dir)
    }

    #[tokio::test]
    async fn store_then_get_round_trips_content() {
        let (manager, _dir) = manager_in_tempdir().await;

        let (meta, duplicate) = manager
            .store_file(
                &b"hello world"[..],
                "greeting.txt",
                "text/plain",
                Some(11),
                std::collections::HashMap::new(),
                None,
            )
            .await
            .expect("store succeeds");
        assert!(!duplicate);
        assert_eq!(meta.size, 11);

        let (fetched, mut file) = manager.get_file_by_hash(&meta.hash).await.expect("fetch succeeds");
        assert_eq!(fetched.hash, meta.hash);

        let mut content = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut file, &mut content)
            .await
            .expect("read succeeds");
        assert_eq!(content, b"hello world");
    }

    #[tokio::test]
    async fn second_store_of_identical_content_is_flagged_duplicate() {
        let (manager, _dir) = manager_in_tempdir().await;

        let (first, _) = manager
            .store_file(
                &b"same bytes"[..],
                "a.txt",
                "text/plain",
                Some(10),
                std::collections::HashMap::new(),
                None,
            )
            .await
            .expect("first store succeeds");

        let (second, duplicate) = manager
            .store_file(
                &b"same bytes"[..],
                "b.txt",
                "text/plain",
                Some(10),
                std::collections::HashMap::new(),
                None,
            )
            .await
            .expect("second store succeeds");

        assert!(duplicate);
        assert_eq!(first.hash, second.hash);
        assert_eq!(first.stored_path, second.stored_path);
    }

    #[tokio::test]
    async fn delete_unreferenced_file_removes_metadata_and_bytes() {
        let (manager, _dir) = manager_in_tempdir().await;

        let (meta, _) = manager
            .store_file(
                &b"gone soon"[..],
                "temp.txt",
                "text/plain",
                Some(9),
                std::collections::HashMap::new(),
                None,
            )
            .await
            .expect("store succeeds");

        let full_path = manager.root().join(&meta.stored_path);
        manager.delete_file(&meta.hash).await.expect("delete succeeds");

        assert!(manager.get_file_metadata(&meta.hash).await.is_err());
        assert!(tokio::fs::metadata(&full_path).await.is_err());
    }
}
