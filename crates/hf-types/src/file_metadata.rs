use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields that may never be supplied as a user metadata key (spec §4.4).
pub const PROTECTED_METADATA_FIELDS: &[&str] = &[
    "hash",
    "original_name",
    "stored_path",
    "mime_type",
    "size",
    "uploaded_at",
    "category",
];

/// The canonical record for one stored artifact (spec §3).
///
/// At most one `FileMetadata` exists per `hash` in the `MetadataIndex`.
/// `stored_path` is always repository-relative, forward-slash normalized,
/// and never contains `..`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// 64-hex lowercase SHA-256 digest of the content; primary key.
    pub hash: String,
    /// Caller-supplied filename, preserved verbatim.
    pub original_name: String,
    /// Repository-relative, forward-slash-normalized path to the physical file.
    pub stored_path: String,
    /// The `/`-joined classification components, e.g. `images/jpg`.
    pub category: String,
    pub mime_type: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    /// Free-form caller metadata. Never contains a protected key.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Number of logical hashes referencing the physical file at `stored_path`.
    #[serde(default = "default_ref_count")]
    pub ref_count: u32,
    /// True if this record was produced by a hard-link copy.
    #[serde(default)]
    pub is_hard_link: bool,
    /// The hash this record is hard-linked to, if any.
    #[serde(default)]
    pub linked_to: Option<String>,
}

fn default_ref_count() -> u32 {
    1
}

impl FileMetadata {
    pub fn new(
        hash: String,
        original_name: String,
        stored_path: String,
        category: String,
        mime_type: String,
        size: u64,
    ) -> Self {
        Self {
            hash,
            original_name,
            stored_path,
            category,
            mime_type,
            size,
            uploaded_at: Utc::now(),
            metadata: HashMap::new(),
            ref_count: 1,
            is_hard_link: false,
            linked_to: None,
        }
    }
}
