//! Virtual path helpers.
//!
//! Stored page paths and bus keys use the *normalized* form: a leading `/`,
//! the template extension stripped, everything lowercase.
//!
//! `/Home/Index.liquid` → `/home/index`

/// Default template file extension.
pub const VIEW_EXTENSION: &str = ".liquid";

/// Normalize a virtual path for store lookups and change tokens.
pub fn normalize(path: &str, extension: &str) -> String {
    let mut trimmed = path.trim();
    if let Some(rest) = trimmed.strip_prefix('~') {
        trimmed = rest;
    }
    let trimmed = strip_extension(trimmed, extension);

    let mut normalized = String::with_capacity(trimmed.len() + 1);
    if !trimmed.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(&trimmed.replace('\\', "/").to_lowercase());
    normalized
}

/// Remove every trailing repetition of `extension` (case-insensitive).
pub fn strip_extension<'a>(path: &'a str, extension: &str) -> &'a str {
    if extension.is_empty() {
        return path;
    }
    let mut result = path;
    while has_extension(result, extension) {
        result = &result[..result.len() - extension.len()];
    }
    result
}

/// Whether `path` ends with `extension`, ignoring ASCII case.
pub fn has_extension(path: &str, extension: &str) -> bool {
    !extension.is_empty()
        && path.len() >= extension.len()
        && path.is_char_boundary(path.len() - extension.len())
        && path[path.len() - extension.len()..].eq_ignore_ascii_case(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_extension_and_lowercases() {
        assert_eq!(normalize("/Home/Index.liquid", VIEW_EXTENSION), "/home/index");
        assert_eq!(normalize("/Shared/Foo.LIQUID", VIEW_EXTENSION), "/shared/foo");
    }

    #[test]
    fn test_normalize_repeated_extension() {
        assert_eq!(normalize("/a.liquid.liquid", VIEW_EXTENSION), "/a");
    }

    #[test]
    fn test_normalize_adds_leading_slash() {
        assert_eq!(normalize("home/index", VIEW_EXTENSION), "/home/index");
        assert_eq!(normalize("~/Home/Index.liquid", VIEW_EXTENSION), "/home/index");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("/Home/Index.liquid", VIEW_EXTENSION);
        assert_eq!(normalize(&once, VIEW_EXTENSION), once);
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("index.liquid", ".liquid"));
        assert!(has_extension("index.Liquid", ".liquid"));
        assert!(!has_extension("index.html", ".liquid"));
        assert!(!has_extension("x", ".liquid"));
        assert!(!has_extension("x", ""));
    }

    #[test]
    fn test_strip_extension_multibyte_safe() {
        assert_eq!(strip_extension("页面", ".liquid"), "页面");
    }
}
