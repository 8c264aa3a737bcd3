use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry in a [`VersionChain`] (spec §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub file_id: Uuid,
    pub version: u64,
    pub hash: String,
    pub size: u64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_current: bool,
}

/// The ordered history of versions for one logical file-id. Exactly one
/// entry has `is_current == true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionChain {
    pub file_id: Uuid,
    pub current_version: u64,
    /// Append-order (oldest first); `VersionIndex::list_versions` reverses
    /// this for its newest-first contract.
    pub versions: Vec<VersionMetadata>,
}

impl VersionChain {
    pub fn new(file_id: Uuid) -> Self {
        Self {
            file_id,
            current_version: 0,
            versions: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<&VersionMetadata> {
        self.versions.iter().find(|v| v.is_current)
    }
}

/// A metadata-only comparison between two versions of the same file-id
/// (spec §4.7 — content-level diff is a Non-goal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDiff {
    pub from_version: u64,
    pub to_version: u64,
    pub old_hash: String,
    pub new_hash: String,
    pub hash_changed: bool,
    pub size_delta: i64,
    pub old_comment: Option<String>,
    pub new_comment: Option<String>,
    pub old_uploader: Option<String>,
    pub new_uploader: Option<String>,
    pub time_delta_seconds: i64,
}

/// A retention policy applied by `VersionIndex::apply_retention_policy`.
/// `KeepMinimum` from spec §3 is carried as `keep_minimum` on the call, not
/// baked into the policy, since it is a property of the caller's contract
/// rather than of any one policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum RetentionPolicy {
    LastN(u32),
    WithinDays(i64),
}
