//! Utility functions and helpers

pub mod csv;
pub mod hash;
pub mod stats;

use std::path::{Path, PathBuf};

/// Resolve a possibly relative path against the current directory
pub fn absolute_path(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
