// NOTE: category validation returns `CategoryError`, a local enum, rather
// than `hf_errors::ValidationError` directly; `hf-storage` maps it onto the
// matching `ValidationError` variant at the boundary that owns error
// reporting, keeping this crate free of a dependency on `hf-errors`.

use thiserror::Error;

/// The fixed top-level categories (spec §3).
pub const TOP_LEVEL_CATEGORIES: &[&str] = &[
    "images",
    "videos",
    "audio",
    "documents",
    "spreadsheets",
    "presentations",
    "archives",
    "code",
    "other",
];

/// Directory names a category segment may never use, either because they
/// collide with the fixed repository layout (spec §6) or are OS-reserved.
const RESERVED_SEGMENT_NAMES: &[&str] = &[
    ".tmp", "tmp", "metadata", "jobs", "media", "json", "storage", ".", "..",
];

const MAX_CATEGORY_DEPTH: usize = 10;
const MAX_SEGMENT_LEN: usize = 100;

/// Reasons [`validate_category`] can reject input. Kept granular so callers
/// that own an error-reporting boundary (`hf-storage`) can translate each
/// case to its own typed variant instead of matching on message text.
#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("category must not be empty")]
    Empty,

    #[error("category must not contain '..'")]
    ParentRef,

    #[error("category must not contain empty segments")]
    EmptySegment,

    #[error("category depth {0} exceeds the maximum of {1}")]
    TooDeep(usize, usize),

    #[error("category segment {0:?} exceeds {1} bytes")]
    SegmentTooLong(String, usize),

    #[error("category segment {0:?} is reserved")]
    ReservedName(String),

    #[error("category segment {0:?} contains an invalid character")]
    InvalidChar(String),
}

/// Validates a user-supplied category path (spec §3, §4.3.7).
///
/// Returns the `/`-joined segments on success. Does not require the
/// category's first segment to be one of [`TOP_LEVEL_CATEGORIES`] — custom
/// routing rules may add new top-level categories — but every segment must
/// independently be well-formed.
pub fn validate_category(category: &str) -> Result<Vec<String>, CategoryError> {
    if category.is_empty() {
        return Err(CategoryError::Empty);
    }
    if category.contains("..") {
        return Err(CategoryError::ParentRef);
    }

    let segments: Vec<String> = category
        .split('/')
        .map(|s| s.trim().to_lowercase())
        .collect();

    if segments.len() > MAX_CATEGORY_DEPTH {
        return Err(CategoryError::TooDeep(segments.len(), MAX_CATEGORY_DEPTH));
    }

    for segment in &segments {
        if segment.is_empty() {
            return Err(CategoryError::EmptySegment);
        }
        if segment.len() > MAX_SEGMENT_LEN {
            return Err(CategoryError::SegmentTooLong(
                segment.clone(),
                MAX_SEGMENT_LEN,
            ));
        }
        if RESERVED_SEGMENT_NAMES.contains(&segment.as_str()) {
            return Err(CategoryError::ReservedName(segment.clone()));
        }
        if segment
            .chars()
            .any(|c| c.is_control() || c == '/' || c == '\\' || c == '\0')
        {
            return Err(CategoryError::InvalidChar(segment.clone()));
        }
    }

    Ok(segments)
}
