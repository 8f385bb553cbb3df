//! Utility functions shared across the crate.

use std::path::PathBuf;

/// Fallback used when sanitising leaves nothing of a filename.
const FALLBACK_FILENAME: &str = "document.pdf";

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Whether an uploaded filename carries a `.pdf` extension (any case).
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"))
}

/// Reduce an uploaded filename to something safe to use on disk and in a
/// `Content-Disposition` header.
///
/// Whitespace and path separators become `_`, anything outside
/// `[A-Za-z0-9._-]` is dropped and leading/trailing dots and underscores are
/// trimmed, so `../../etc/passwd` becomes `etc_passwd`.
pub fn secure_filename(filename: &str) -> String {
    let mapped: String = filename
        .chars()
        .filter_map(|c| match c {
            '/' | '\\' => Some(' '),
            c if c.is_whitespace() => Some(' '),
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => Some(c),
            _ => None,
        })
        .collect();

    let joined = mapped.split_whitespace().collect::<Vec<_>>().join("_");
    let trimmed = joined.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Name given to the labeled copy of `original`.
pub fn processed_name(original: &str) -> String {
    format!("processed_{}", secure_filename(original))
}
