// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::{Path, PathBuf};

/// Return the application data directory, creating it if needed.
///
/// `$XDG_DATA_HOME/textwerk`, falling back to `~/.local/share/textwerk`.
pub fn data_dir() -> PathBuf {
    let dir = dirs_fallback().join("textwerk");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Return a subdirectory of `base` (e.g. "exports", "pictures"), creating it
/// if needed.
pub fn subdir(base: &Path, name: &str) -> PathBuf {
    let dir = base.join(name);
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn dirs_fallback() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdir_is_created() {
        let base = tempfile::tempdir().unwrap();
        let exports = subdir(base.path(), "exports");
        assert!(exports.is_dir());
        assert_eq!(exports, base.path().join("exports"));
    }
}
