use std::path::{Component, Path, PathBuf};

use hf_errors::ValidationError;

/// Validates a caller-supplied path is safely containable under `root`
/// (spec §4.3.3, testable property §8 scenario 2).
///
/// Rejects absolute paths, any path containing a `..` component, any path
/// containing a null byte, and — as a defense against symlink or
/// normalization tricks — any path whose lexical join with `root` resolves
/// outside of `root`.
pub fn validate_relative_path(root: &Path, candidate: &str) -> Result<PathBuf, ValidationError> {
    if candidate.contains('\0') {
        return Err(ValidationError::PathHasNullByte);
    }

    let candidate_path = Path::new(candidate);
    if candidate_path.is_absolute() {
        return Err(ValidationError::PathIsAbsolute(candidate_path.to_path_buf()));
    }

    for component in candidate_path.components() {
        match component {
            Component::ParentDir => {
                return Err(ValidationError::PathHasParentRef(candidate_path.to_path_buf()))
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(ValidationError::PathIsAbsolute(candidate_path.to_path_buf()))
            }
            _ => {}
        }
    }

    let joined = root.join(candidate_path);
    let normalized = lexically_normalize(&joined);
    let root_normalized = lexically_normalize(root);

    match normalized.strip_prefix(&root_normalized) {
        Ok(rel) if rel.components().next() != Some(Component::ParentDir) => Ok(normalized),
        _ => Err(ValidationError::PathEscapesRoot(candidate_path.to_path_buf())),
    }
}

/// Lexical (non-syscall) normalization: collapses `.` and resolves `..`
/// against preceding components without touching the filesystem, so this
/// works even for paths that do not exist yet.
fn lexically_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_parent_ref() {
        let root = Path::new("/repo");
        assert!(validate_relative_path(root, "../etc/passwd").is_err());
    }

    #[test]
    fn rejects_parent_ref_after_normal_segment() {
        let root = Path::new("/repo");
        assert!(validate_relative_path(root, "storage/../../etc/passwd").is_err());
    }

    #[test]
    fn rejects_absolute() {
        let root = Path::new("/repo");
        assert!(validate_relative_path(root, "/etc/passwd").is_err());
    }

    #[test]
    fn accepts_plain_relative_path() {
        let root = Path::new("/repo");
        let resolved = validate_relative_path(root, "storage/images/jpg/a.jpg").unwrap();
        assert_eq!(resolved, Path::new("/repo/storage/images/jpg/a.jpg"));
    }

    #[test]
    fn rejects_null_byte() {
        let root = Path::new("/repo");
        assert!(validate_relative_path(root, "storage/\0evil").is_err());
    }

    proptest::proptest! {
        #[test]
        fn any_path_containing_parent_ref_is_rejected(
            prefix in "[a-z/]{0,20}",
            suffix in "[a-z/]{0,20}",
        ) {
            let root = Path::new("/repo");
            let candidate = format!("{prefix}/../{suffix}");
            prop_assert!(validate_relative_path(root, &candidate).is_err());
        }

        #[test]
        fn plain_alnum_segments_never_escape_root(segments in proptest::collection::vec("[a-z0-9]{1,10}", 1..5)) {
            let root = Path::new("/repo");
            let candidate = segments.join("/");
            let resolved = validate_relative_path(root, &candidate).unwrap();
            prop_assert!(resolved.starts_with(root));
        }
    }
}
