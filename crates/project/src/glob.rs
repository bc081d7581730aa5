//! Helpers for the `dir/**` glob strings passed between pipeline stages.

/// Suffix meaning "this directory and everything beneath it".
pub const RECURSIVE_SUFFIX: &str = "/**";

/// Normalize a project-relative path: forward slashes, no leading `./`,
/// no trailing `/`. A bare `.` normalizes to the empty string.
pub fn normalize_path(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while let Some(rest) = value.strip_prefix("./") {
        value = rest.to_string();
    }
    let value = value.trim_end_matches('/');
    if value == "." {
        return String::new();
    }
    value.to_string()
}

/// `src/shared` -> `src/shared/**`. The empty path maps to `**`.
pub fn to_recursive_glob(path: &str) -> String {
    let base = normalize_path(path);
    if base.is_empty() {
        return "**".to_string();
    }
    format!("{base}{RECURSIVE_SUFFIX}")
}

pub fn is_recursive(glob: &str) -> bool {
    glob == "**" || glob.ends_with(RECURSIVE_SUFFIX)
}

/// The directory part of a glob with its recursive suffix stripped.
pub fn glob_base(glob: &str) -> &str {
    if glob == "**" {
        return "";
    }
    glob.strip_suffix(RECURSIVE_SUFFIX).unwrap_or(glob)
}

pub fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{'])
}
