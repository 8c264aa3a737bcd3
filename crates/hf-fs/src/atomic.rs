use std::path::Path;

use hf_errors::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;
use uuid::Uuid;

/// Serializes `value` as pretty-printed JSON and writes it to `path` via
/// write-to-`.tmp`-then-rename, which is atomic on POSIX and on
/// same-volume NTFS rename (spec §4.4, §6). Creates the parent directory if
/// it is missing.
#[instrument(skip(value), fields(path = %path.as_ref().display()))]
pub async fn write_json_atomic<T: Serialize + Sync>(
    path: impl AsRef<Path>,
    value: &T,
) -> Result<(), StorageError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::io(parent, e))?;
    }

    let bytes = serde_json::to_vec_pretty(value)?;

    let tmp_name = format!(
        ".{}.tmp-{}",
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "index".to_string()),
        Uuid::new_v4()
    );
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, &bytes)
        .await
        .map_err(|e| StorageError::io(&tmp_path, e))?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| StorageError::io(path, e))?;

    Ok(())
}

/// Reads and deserializes a JSON file written by [`write_json_atomic`].
/// Returns `Ok(None)` if the file does not exist yet, so first-run callers
/// can seed an empty index without a separate existence check.
pub async fn read_json<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<Option<T>, StorageError> {
    let path = path.as_ref();
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}
