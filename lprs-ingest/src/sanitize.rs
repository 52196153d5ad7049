//! Filename sanitizing for client-supplied names
//!
//! Every character outside `[A-Za-z0-9._-]` becomes `_`, so a sanitized
//! name can never contain a path separator. Dot-only names (`.`, `..`)
//! are escaped as well.

/// Map an arbitrary client-supplied name onto the safe charset
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if !sanitized.is_empty() && sanitized.chars().all(|c| c == '.') {
        return "_".repeat(sanitized.len());
    }
    sanitized
}

/// Sanitized plate text for generated names, `unknown` when empty
pub fn plate_stem(plate: Option<&str>) -> String {
    let stem = sanitize_filename(plate.unwrap_or_default());
    if stem.is_empty() {
        "unknown".to_string()
    } else {
        stem
    }
}
