//! Discovery Module
//!
//! Recursively scans a directory and returns the files whose root-relative
//! path passes a [`GlobFilter`]. Results are sorted so every run sees the
//! same order.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::glob::{relative_path, GlobFilter};

pub fn find_files(base_dir: &Path, filter: &GlobFilter) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(base_dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry below {}: {}", base_dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(relative) = relative_path(base_dir, entry.path()) {
            if filter.matches(&relative) {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    files.sort();
    files
}
