use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hf_errors::StorageError;
use hf_types::{DuplicateGroup, FileMetadata, VerificationIssue, VerificationIssueKind};
use sha2::{Digest, Sha256};
use tracing::{instrument, warn};
use walkdir::WalkDir;

use crate::metadata_index::MetadataIndex;

/// Result of [`DuplicateScanner::merge_duplicates`] (spec §4.5).
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub kept_hash: String,
    pub removed_hashes: Vec<String>,
    pub reclaimed_bytes: u64,
}

/// Groups the index by content digest, optionally rehashing on disk, and
/// cross-checks the physical tree against the index (spec §4.5).
///
/// A scan is serialized by `scan_in_progress`; concurrent scans fail with
/// [`StorageError::ScanInProgress`] rather than interleaving disk walks.
pub struct DuplicateScanner {
    /// Repository root; `FileMetadata::stored_path` is relative to this.
    root: PathBuf,
    metadata_index: Arc<MetadataIndex>,
    scan_in_progress: AtomicBool,
}

impl DuplicateScanner {
    pub fn new(root: PathBuf, metadata_index: Arc<MetadataIndex>) -> Self {
        Self {
            root,
            metadata_index,
            scan_in_progress: AtomicBool::new(false),
        }
    }

    fn acquire_scan_guard(&self) -> Result<ScanGuard<'_>, StorageError> {
        if self
            .scan_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(StorageError::ScanInProgress);
        }
        Ok(ScanGuard { flag: &self.scan_in_progress })
    }

    /// Content-key for grouping: a hard-linked copy's `linked_to` points at
    /// the real digest it shares storage with; a canonical entry's own
    /// `hash` is the real digest. See DESIGN.md for why `hash` alone is not
    /// always the real digest on a linked entry.
    fn content_key(meta: &FileMetadata) -> String {
        meta.linked_to.clone().unwrap_or_else(|| meta.hash.clone())
    }

    #[instrument(skip(self))]
    pub async fn scan_for_duplicates(&self, deep: bool) -> Result<Vec<DuplicateGroup>, StorageError> {
        let _guard = self.acquire_scan_guard()?;

        let all = self.metadata_index.all().await;
        let mut groups: HashMap<String, Vec<FileMetadata>> = HashMap::new();
        for meta in all {
            groups.entry(Self::content_key(&meta)).or_default().push(meta);
        }

        let mut result = Vec::new();
        for (content_hash, entries) in groups {
            if entries.len() < 2 {
                continue;
            }
            if deep {
                for entry in &entries {
                    let full_path = self.root.join(&entry.stored_path);
                    let on_disk_hash = hash_file(&full_path).await?;
                    if on_disk_hash != content_hash {
                        return Err(StorageError::Io {
                            path: full_path,
                            source: std::io::Error::new(
                                std::io::ErrorKind::InvalidData,
                                format!(
                                    "hash mismatch during deep scan: expected {content_hash}, found {on_disk_hash}"
                                ),
                            ),
                        });
                    }
                }
            }
            result.push(DuplicateGroup::from_entries(content_hash, entries));
        }

        Ok(result)
    }

    /// Walks `storage/` (excluding `.tmp/`) and cross-references it against
    /// the index, reporting orphaned files, missing files, and hash
    /// mismatches (spec §4.5).
    #[instrument(skip(self))]
    pub async fn verify_deduplication_system(&self) -> Result<Vec<VerificationIssue>, StorageError> {
        let all = self.metadata_index.all().await;
        let mut by_path: HashMap<String, &FileMetadata> =
            all.iter().map(|m| (m.stored_path.clone(), m)).collect();

        let mut issues = Vec::new();
        let storage_dir = self.root.join("storage");
        let root_for_walk = self.root.clone();

        let walked: Vec<PathBuf> = tokio::task::spawn_blocking(move || {
            WalkDir::new(&storage_dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| !e.path().components().any(|c| c.as_os_str() == ".tmp"))
                .map(|e| e.path().to_path_buf())
                .collect::<Vec<_>>()
                .into_iter()
                .map(|p| p.strip_prefix(&root_for_walk).map(|r| r.to_path_buf()).unwrap_or(p))
                .collect()
        })
        .await
        .map_err(|e| StorageError::io(".", std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        for relative_path in &walked {
            let relative = relative_path.to_string_lossy().replace('\\', "/");
            let full_path = self.root.join(relative_path);

            let _ = &full_path; // presence already confirmed by the walk; hash check happens below
            match by_path.remove(relative.as_str()) {
                Some(_meta) => {}
                None => {
                    issues.push(VerificationIssue {
                        kind: VerificationIssueKind::OrphanedFile,
                        path: Some(relative.clone()),
                        hash: None,
                        detail: format!("{relative} exists on disk but is not in the metadata index"),
                    });
                }
            }
        }

        for (path, meta) in by_path {
            issues.push(VerificationIssue {
                kind: VerificationIssueKind::MissingFile,
                path: Some(path.clone()),
                hash: Some(meta.hash.clone()),
                detail: format!("{path} is indexed under hash {} but missing on disk", meta.hash),
            });
        }

        for meta in &all {
            let full_path = self.root.join(&meta.stored_path);
            if !full_path.exists() {
                continue;
            }
            if let Ok(on_disk_hash) = hash_file(&full_path).await {
                let expected = Self::content_key(meta);
                if on_disk_hash != expected {
                    issues.push(VerificationIssue {
                        kind: VerificationIssueKind::HashMismatch,
                        path: Some(meta.stored_path.clone()),
                        hash: Some(meta.hash.clone()),
                        detail: format!(
                            "{} hashes to {on_disk_hash} on disk but index expects {expected}",
                            meta.stored_path
                        ),
                    });
                }
            }
        }

        Ok(issues)
    }

    /// Keeps `keep`'s `stored_path`, optionally removing the other entries'
    /// metadata (and, if `remove_others`, their physical files when
    /// unreferenced), reporting reclaimed bytes (spec §4.5). Does not touch
    /// `ReferenceIndex` bookkeeping for non-linked duplicates, since a
    /// group found by content drift (rather than an explicit hard-link
    /// copy) was never reference-counted in the first place.
    #[instrument(skip(self))]
    pub async fn merge_duplicates(
        &self,
        content_hash: &str,
        keep_stored_path: &str,
        remove_others: bool,
    ) -> Result<MergeReport, StorageError> {
        let all = self.metadata_index.all().await;
        let group: Vec<FileMetadata> = all
            .into_iter()
            .filter(|m| Self::content_key(m) == content_hash)
            .collect();

        if group.is_empty() {
            return Err(StorageError::DuplicateGroupNotFound(content_hash.to_string()));
        }

        let kept = group
            .iter()
            .find(|m| m.stored_path == keep_stored_path)
            .cloned()
            .ok_or_else(|| StorageError::DuplicateGroupNotFound(content_hash.to_string()))?;

        let mut removed_hashes = Vec::new();
        let mut reclaimed_bytes = 0u64;

        if remove_others {
            for entry in group.iter().filter(|m| m.hash != kept.hash) {
                self.metadata_index.delete(&entry.hash).await?;
                removed_hashes.push(entry.hash.clone());
                if entry.stored_path != kept.stored_path {
                    let full_path = self.root.join(&entry.stored_path);
                    if let Err(e) = tokio::fs::remove_file(&full_path).await {
                        if e.kind() != std::io::ErrorKind::NotFound {
                            warn!(path = %full_path.display(), error = %e, "failed to remove merged duplicate file");
                        }
                    } else {
                        reclaimed_bytes += entry.size;
                    }
                }
            }
        }

        Ok(MergeReport {
            kept_hash: kept.hash,
            removed_hashes,
            reclaimed_bytes,
        })
    }
}

struct ScanGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

async fn hash_file(path: &Path) -> Result<String, StorageError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| StorageError::io(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    async fn scanner_in_tempdir() -> (DuplicateScanner, Arc<MetadataIndex>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        tokio::fs::create_dir_all(dir.path().join("storage/documents/txt"))
            .await
            .unwrap();
        let metadata_index = Arc::new(
            MetadataIndex::load(dir.path().join("metadata/files.json"))
                .await
                .unwrap(),
        );
        let scanner = DuplicateScanner::new(dir.path().to_path_buf(), metadata_index.clone());
        (scanner, metadata_index, dir)
    }

    fn meta(hash: &str, stored_path: &str, size: u64, linked_to: Option<&str>) -> FileMetadata {
        let mut m = FileMetadata::new(
            hash.to_string(),
            "a.txt".to_string(),
            stored_path.to_string(),
            "documents/txt".to_string(),
            "text/plain".to_string(),
            size,
        );
        m.linked_to = linked_to.map(str::to_string);
        m.is_hard_link = linked_to.is_some();
        m
    }

    #[tokio::test]
    async fn scan_groups_entries_sharing_content_key() {
        let (scanner, index, _dir) = scanner_in_tempdir().await;

        index.add(meta("hA", "storage/documents/txt/a.txt", 100, None)).await.unwrap();
        index.add(meta("hB", "storage/documents/txt/b.txt", 100, Some("hA"))).await.unwrap();
        index.add(meta("hC", "storage/documents/txt/c.txt", 50, None)).await.unwrap();

        let groups = scanner.scan_for_duplicates(false).await.unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].hash, "hA");
        assert_eq!(groups[0].entries.len(), 2);
        assert_eq!(groups[0].total_wasted, 100);
    }

    #[tokio::test]
    async fn deep_scan_fails_on_hash_mismatch() {
        let (scanner, index, dir) = scanner_in_tempdir().await;

        let real_digest = digest_of(b"hello");
        tokio::fs::write(dir.path().join("storage/documents/txt/a.txt"), b"hello")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("storage/documents/txt/b.txt"), b"tampered")
            .await
            .unwrap();

        index
            .add(meta(&real_digest, "storage/documents/txt/a.txt", 5, None))
            .await
            .unwrap();
        index
            .add(meta("linked", "storage/documents/txt/b.txt", 5, Some(&real_digest)))
            .await
            .unwrap();

        let err = scanner.scan_for_duplicates(true).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[tokio::test]
    async fn concurrent_scans_are_rejected() {
        let (scanner, _index, _dir) = scanner_in_tempdir().await;

        scanner.scan_in_progress.store(true, Ordering::SeqCst);
        let err = scanner.scan_for_duplicates(false).await.unwrap_err();
        assert!(matches!(err, StorageError::ScanInProgress));

        scanner.scan_in_progress.store(false, Ordering::SeqCst);
        assert!(scanner.scan_for_duplicates(false).await.is_ok());
    }

    #[tokio::test]
    async fn verify_reports_orphaned_and_missing_files() {
        let (scanner, index, dir) = scanner_in_tempdir().await;

        // Indexed but absent on disk.
        index
            .add(meta("missing-hash", "storage/documents/txt/ghost.txt", 10, None))
            .await
            .unwrap();

        // Present on disk but never indexed.
        tokio::fs::write(dir.path().join("storage/documents/txt/orphan.txt"), b"x")
            .await
            .unwrap();

        let issues = scanner.verify_deduplication_system().await.unwrap();

        assert!(issues
            .iter()
            .any(|i| i.kind == VerificationIssueKind::OrphanedFile
                && i.path.as_deref() == Some("storage/documents/txt/orphan.txt")));
        assert!(issues
            .iter()
            .any(|i| i.kind == VerificationIssueKind::MissingFile
                && i.path.as_deref() == Some("storage/documents/txt/ghost.txt")));
    }

    #[tokio::test]
    async fn merge_duplicates_removes_non_kept_entries_and_reclaims_bytes() {
        let (scanner, index, dir) = scanner_in_tempdir().await;

        tokio::fs::write(dir.path().join("storage/documents/txt/a.txt"), b"dup")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("storage/documents/txt/b.txt"), b"dup")
            .await
            .unwrap();

        index.add(meta("hA", "storage/documents/txt/a.txt", 3, None)).await.unwrap();
        index.add(meta("hB", "storage/documents/txt/b.txt", 3, Some("hA"))).await.unwrap();

        let report = scanner
            .merge_duplicates("hA", "storage/documents/txt/a.txt", true)
            .await
            .unwrap();

        assert_eq!(report.kept_hash, "hA");
        assert_eq!(report.removed_hashes, vec!["hB".to_string()]);
        assert_eq!(report.reclaimed_bytes, 3);
        assert!(index.find_by_hash("hB").await.is_none());
        assert!(!dir.path().join("storage/documents/txt/b.txt").exists());
        assert!(dir.path().join("storage/documents/txt/a.txt").exists());
    }

    #[tokio::test]
    async fn merge_duplicates_fails_for_unknown_group() {
        let (scanner, _index, _dir) = scanner_in_tempdir().await;
        let err = scanner
            .merge_duplicates("does-not-exist", "storage/documents/txt/a.txt", true)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateGroupNotFound(_)));
    }
}
