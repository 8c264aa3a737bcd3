use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::file_metadata::FileMetadata;

/// A set of `FileMetadata` records sharing a digest (spec §4.5, GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub hash: String,
    pub entries: Vec<FileMetadata>,
    pub total_wasted: u64,
}

impl DuplicateGroup {
    pub fn from_entries(hash: String, entries: Vec<FileMetadata>) -> Self {
        let size = entries.first().map(|m| m.size).unwrap_or(0);
        let total_wasted = (entries.len().saturating_sub(1) as u64) * size;
        Self {
            hash,
            entries,
            total_wasted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationIssueKind {
    OrphanedFile,
    MissingFile,
    HashMismatch,
}

/// One discrepancy found by `DuplicateScanner::verify_deduplication_system`
/// (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationIssue {
    pub kind: VerificationIssueKind,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    pub detail: String,
}
