use std::path::Path;

use hf_errors::StorageError;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Appends one JSON document as a line to an NDJSON audit log (spec §6).
///
/// Audit-log appends are best-effort: a failure here is logged and
/// swallowed rather than propagated, per spec §7 ("recovery is local only
/// for audit-log-append failures... never fails the primary op").
pub async fn append_ndjson<T: Serialize>(path: impl AsRef<Path>, record: &T) {
    let path = path.as_ref();
    if let Err(e) = append_ndjson_inner(path, record).await {
        warn!(path = %path.display(), error = %e, "failed to append audit record");
    }
}

async fn append_ndjson_inner<T: Serialize>(
    path: &Path,
    record: &T,
) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::io(parent, e))?;
    }

    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| StorageError::io(path, e))?;

    file.write_all(&line)
        .await
        .map_err(|e| StorageError::io(path, e))?;

    Ok(())
}
