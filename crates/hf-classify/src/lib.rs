//! Maps `(mime_type, filename, category_hint)` to an ordered directory path
//! under `storage/` (spec §4.1, §4.9).
//!
//! Resolution order: built-in MIME table, then built-in extension table,
//! then the optional [`RoutingRulesStore`] (by MIME, then extension), then
//! `["other", "unknown"]`. The classifier never reaches up into the
//! `StorageManager` — callers hand it whatever rule store they have.

mod routing_store;
mod tables;

pub use routing_store::RoutingRulesStore;

/// Resolves `(mime_type, filename, hint)` into ordered directory components.
///
/// `hint`, once sanitized, is appended as an extra leaf segment when
/// non-empty (spec §4.1).
pub fn classify(
    mime_type: &str,
    filename: &str,
    hint: Option<&str>,
    routing_rules: Option<&RoutingRulesStore>,
) -> Vec<String> {
    let mut components = resolve_category(mime_type, filename, routing_rules);

    if let Some(hint) = hint {
        let sanitized = hf_fs::sanitize_hint(hint);
        if !sanitized.is_empty() {
            components.push(sanitized);
        }
    }

    components
}

fn resolve_category(
    mime_type: &str,
    filename: &str,
    routing_rules: Option<&RoutingRulesStore>,
) -> Vec<String> {
    let mime_lower = mime_type.trim().to_lowercase();
    if let Some(path) = tables::BUILTIN_MIME_TABLE
        .iter()
        .find(|(m, _)| *m == mime_lower)
        .map(|(_, path)| to_owned_path(path))
    {
        return path;
    }

    let extension = extract_extension(filename);
    if let Some(ext) = &extension {
        if let Some(path) = tables::BUILTIN_EXTENSION_TABLE
            .iter()
            .find(|(e, _)| e == ext)
            .map(|(_, path)| to_owned_path(path))
        {
            return path;
        }
    }

    if let Some(store) = routing_rules {
        if let Some(path) = store.resolve(&mime_lower, extension.as_deref()) {
            return path;
        }
    }

    vec!["other".to_string(), "unknown".to_string()]
}

fn to_owned_path(path: &[&str]) -> Vec<String> {
    path.iter().map(|s| s.to_string()).collect()
}

fn extract_extension(filename: &str) -> Option<String> {
    let filename = filename.rsplit('/').next().unwrap_or(filename);
    let mut parts = filename.rsplitn(2, '.');
    let ext = parts.next()?;
    let stem_exists = parts.next().is_some();
    if !stem_exists || ext.is_empty() || ext == filename {
        return None;
    }
    Some(ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_mime() {
        assert_eq!(
            classify("image/jpeg", "photo.jpg", None, None),
            vec!["images", "jpg"]
        );
    }

    #[test]
    fn resolves_by_extension_when_mime_unknown() {
        assert_eq!(
            classify("application/octet-stream", "notes.md", None, None),
            vec!["documents", "md"]
        );
    }

    #[test]
    fn falls_back_to_other_unknown() {
        assert_eq!(
            classify("application/x-unknown", "weird.xyz", None, None),
            vec!["other", "unknown"]
        );
    }

    #[test]
    fn appends_sanitized_hint() {
        assert_eq!(
            classify("image/png", "a.png", Some("  Vacation Photos!! "), None),
            vec!["images", "png", "vacation-photos"]
        );
    }

    #[test]
    fn empty_hint_after_sanitization_is_not_appended() {
        assert_eq!(
            classify("image/png", "a.png", Some("   !!!   "), None),
            vec!["images", "png"]
        );
    }
}
