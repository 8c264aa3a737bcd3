//! Error types shared across the ingestion engine.
//!
//! Every public operation in `hf-storage`/`hf-jobs`/`hf-classify` returns one
//! of the enums defined here rather than a boxed/opaque error, so callers can
//! match on the §7 error *kinds* (validation, not-found, conflict, integrity,
//! resource, I/O) instead of parsing strings.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by path/filename validation (`hf-fs`) and reused by every
/// component that accepts caller-supplied names or paths.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("filename must not be empty")]
    EmptyFilename,

    #[error("filename exceeds 255 bytes: {0:?}")]
    FilenameTooLong(String),

    #[error("filename contains a path separator: {0:?}")]
    FilenameHasSeparator(String),

    #[error("filename contains '..': {0:?}")]
    FilenameHasParentRef(String),

    #[error("filename contains a control character: {0:?}")]
    FilenameHasControlChar(String),

    #[error("filename contains a reserved character: {0:?}")]
    FilenameHasReservedChar(String),

    #[error("filename is a reserved device name: {0:?}")]
    FilenameIsReservedDeviceName(String),

    #[error("filename has leading/trailing whitespace or dots: {0:?}")]
    FilenameHasLeadingTrailingJunk(String),

    #[error("path escapes the repository root: {0}")]
    PathEscapesRoot(PathBuf),

    #[error("path is absolute: {0}")]
    PathIsAbsolute(PathBuf),

    #[error("path contains '..': {0}")]
    PathHasParentRef(PathBuf),

    #[error("path contains a null byte")]
    PathHasNullByte,

    #[error("category is invalid: {0}")]
    InvalidCategory(String),

    #[error("category depth {0} exceeds the maximum of {1}")]
    CategoryTooDeep(usize, usize),

    #[error("category segment {0:?} exceeds {1} bytes")]
    CategorySegmentTooLong(String, usize),

    #[error("category uses a reserved name: {0:?}")]
    CategoryReservedName(String),

    #[error("metadata key {0:?} is a protected field")]
    ProtectedMetadataField(String),

    #[error("metadata key {0:?} has an invalid character set")]
    InvalidMetadataKey(String),

    #[error("metadata key {0:?} exceeds 256 bytes")]
    MetadataKeyTooLong(String),

    #[error("metadata value for {0:?} exceeds 32 KiB")]
    MetadataValueTooLarge(String),

    #[error("total metadata size exceeds 64 KiB")]
    MetadataTotalTooLarge,

    #[error("metadata field count exceeds 100")]
    MetadataTooManyFields,

    #[error("batch size {0} exceeds the maximum of {1}")]
    BatchTooLarge(usize, usize),

    #[error("nil/empty reader supplied")]
    InvalidInput,
}

/// Errors raised by `hf-storage`.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("hash not indexed: {0}")]
    HashNotFound(String),

    #[error("path not indexed: {0}")]
    PathNotFound(PathBuf),

    #[error("physical file missing on disk for hash {0}")]
    PhysicalFileMissing(String),

    #[error("duplicate group unknown for hash {0}")]
    DuplicateGroupNotFound(String),

    #[error("version {0} not present for file {1}")]
    VersionNotFound(u64, String),

    #[error("destination filename already exists: {0}")]
    NameConflict(String),

    #[error("destination already exists for hard-link copy: {0}")]
    CopyConflict(String),

    #[error("a duplicate scan is already in progress")]
    ScanInProgress,

    #[error("version retention would drop below the minimum of {0}")]
    VersionLimitReached(u32),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize index: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("rollback failed after a prior failure: primary={primary}, rollback={rollback}")]
    RollbackFailed {
        primary: String,
        rollback: String,
    },
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by `hf-jobs`.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job queue is at capacity")]
    QueueFull,

    #[error("job {0} not found")]
    NotFound(uuid::Uuid),

    #[error("job {0} is already terminal")]
    AlreadyTerminal(uuid::Uuid),

    #[error("I/O error persisting job {job_id}: {source}")]
    Io {
        job_id: uuid::Uuid,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize job: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// uuid is a light re-export so hf-errors doesn't force every dependent crate
// to also depend on it just to name a JobError variant.
pub use uuid;
