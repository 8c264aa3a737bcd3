use hf_errors::ValidationError;

const RESERVED_WINDOWS_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Validates a filename before any I/O touches it (spec §4.3.4).
pub fn validate_filename(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyFilename);
    }
    if name.len() > 255 {
        return Err(ValidationError::FilenameTooLong(name.to_string()));
    }
    if name.contains("..") {
        return Err(ValidationError::FilenameHasParentRef(name.to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ValidationError::FilenameHasSeparator(name.to_string()));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::FilenameHasControlChar(name.to_string()));
    }
    if name.chars().any(|c| FORBIDDEN_CHARS.contains(&c)) {
        return Err(ValidationError::FilenameHasReservedChar(name.to_string()));
    }
    if name != name.trim() || name.ends_with('.') {
        return Err(ValidationError::FilenameHasLeadingTrailingJunk(
            name.to_string(),
        ));
    }

    let stem = name.split('.').next().unwrap_or(name);
    if RESERVED_WINDOWS_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
    {
        return Err(ValidationError::FilenameIsReservedDeviceName(
            name.to_string(),
        ));
    }

    Ok(())
}

/// Sanitizes a filename stem for embedding into a constructed physical
/// filename: lowercases, collapses runs of non-alphanumeric characters to a
/// single `-`, and trims leading/trailing `-`. Idempotent and never
/// produces a path separator (spec §4.1, §4.3.1).
pub fn sanitize_base_name(name: &str) -> String {
    sanitize_collapsing(name)
}

/// Sanitizes a caller-supplied category hint (spec §4.1): same collapsing
/// rule as [`sanitize_base_name`], over the category-hint specifically.
pub fn sanitize_hint(hint: &str) -> String {
    sanitize_collapsing(hint)
}

fn sanitize_collapsing(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_dash = false;
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize_hint("  My Photos!! 2024  ");
        let twice = sanitize_hint(&once);
        assert_eq!(once, twice);
        assert!(!once.contains('/'));
        assert!(!once.contains('\\'));
    }

    #[test]
    fn sanitize_never_produces_separators() {
        let sanitized = sanitize_base_name("a/b\\c");
        assert!(!sanitized.contains('/') && !sanitized.contains('\\'));
    }

    #[test]
    fn rejects_reserved_device_name() {
        assert!(validate_filename("CON.txt").is_err());
    }

    #[test]
    fn rejects_path_separator() {
        assert!(validate_filename("a/b.txt").is_err());
    }

    #[test]
    fn rejects_leading_trailing_whitespace() {
        assert!(validate_filename(" a.txt").is_err());
        assert!(validate_filename("a.txt ").is_err());
    }

    #[test]
    fn accepts_ordinary_name() {
        assert!(validate_filename("hello-world.txt").is_ok());
    }

    proptest::proptest! {
        #[test]
        fn sanitize_base_name_is_idempotent_over_arbitrary_input(s in ".{0,200}") {
            let once = sanitize_base_name(&s);
            let twice = sanitize_base_name(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn sanitize_base_name_never_emits_a_separator(s in ".{0,200}") {
            let sanitized = sanitize_base_name(&s);
            prop_assert!(!sanitized.contains('/') && !sanitized.contains('\\'));
        }
    }
}
