// src/paths/normalize.rs

//! Utility functions for host-specific path spelling.

use std::path::Path;

/// Spell `path` with the host's separator.
///
/// Tools report paths with whatever separator they like; on Windows hosts
/// forward slashes are rewritten so that `C:/a/b.h` and `C:\a\b.h` intern to
/// the same id.
pub fn normalize_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) {
        s.replace('/', "\\")
    } else {
        s.into_owned()
    }
}

/// Key used when comparing paths for equality across sources.
///
/// Windows file systems are case-insensitive, so the key is lowercased
/// there; everywhere else it is the normalized path itself.
pub fn comparison_key(path: &Path) -> String {
    let normalized = normalize_path(path);
    if cfg!(windows) {
        normalized.to_lowercase()
    } else {
        normalized
    }
}
