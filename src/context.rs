//! Build context: the incremental change feed.
//!
//! The host decides whether a build is incremental and which files changed
//! since the last successful build. [`FullBuild`] always rebuilds;
//! [`SnapshotContext`] keeps content hashes of the previous build in a JSON
//! manifest and diffs the tree against it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{JoinError, JoinResult};
use crate::files::{modified, write_atomic};

pub trait BuildContext {
    fn is_incremental(&self) -> bool;

    /// Files added or changed below `root` since the last build.
    fn changed_files(&self, root: &Path) -> JoinResult<Vec<PathBuf>>;

    /// Files removed below `root` since the last build.
    fn deleted_files(&self, root: &Path) -> JoinResult<Vec<PathBuf>>;

    /// True when `target` exists and is at least as new as `source`.
    fn is_uptodate(&self, target: &Path, source: &Path) -> bool {
        match (modified(target), modified(source)) {
            (Ok(t), Ok(s)) => t >= s,
            _ => false,
        }
    }

    /// Called after an output file has been written.
    fn refresh(&mut self, path: &Path) {
        debug!("refreshed {}", path.display());
    }

    /// Called once a run over `root` completed without error.
    fn build_finished(&mut self, _root: &Path) -> JoinResult<()> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FULL BUILD
// ═══════════════════════════════════════════════════════════════════════════════

/// Non-incremental context: every module is rebuilt.
#[derive(Debug, Default)]
pub struct FullBuild;

impl BuildContext for FullBuild {
    fn is_incremental(&self) -> bool {
        false
    }

    fn changed_files(&self, _root: &Path) -> JoinResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    fn deleted_files(&self, _root: &Path) -> JoinResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOT CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    /// Absolute path to sha256 of the contents.
    files: BTreeMap<String, String>,
}

pub struct SnapshotContext {
    manifest_path: PathBuf,
    previous: Option<Snapshot>,
    refreshed: Vec<PathBuf>,
}

impl SnapshotContext {
    /// Load the manifest `<cache_dir>/<name>.json`. A missing or corrupt
    /// manifest makes the next build a full one.
    pub fn open(cache_dir: &Path, name: &str) -> Self {
        let manifest_path = cache_dir.join(format!("{}.json", name));
        let previous = match fs::read_to_string(&manifest_path) {
            Ok(data) => match serde_json::from_str::<Snapshot>(&data) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(
                        "Snapshot manifest {} is unreadable, doing a full build: {}",
                        manifest_path.display(),
                        e
                    );
                    fs::remove_file(&manifest_path).ok();
                    None
                }
            },
            Err(_) => None,
        };

        SnapshotContext {
            manifest_path,
            previous,
            refreshed: Vec::new(),
        }
    }

    pub fn compute_hash(contents: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(contents);
        format!("{:x}", hasher.finalize())
    }

    /// Outputs written during this run, in write order.
    pub fn refreshed(&self) -> &[PathBuf] {
        &self.refreshed
    }

    fn scan(root: &Path) -> JoinResult<BTreeMap<String, String>> {
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                JoinError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let bytes = fs::read(entry.path()).map_err(|e| JoinError::io(entry.path(), e))?;
            files.insert(
                entry.path().display().to_string(),
                Self::compute_hash(&bytes),
            );
        }
        Ok(files)
    }

    fn previous_under<'s>(&'s self, root: &Path) -> impl Iterator<Item = (&'s String, &'s String)> {
        let root = root.to_path_buf();
        self.previous
            .iter()
            .flat_map(|s| s.files.iter())
            .filter(move |(path, _)| Path::new(path.as_str()).starts_with(&root))
    }
}

impl BuildContext for SnapshotContext {
    fn is_incremental(&self) -> bool {
        self.previous.is_some()
    }

    fn changed_files(&self, root: &Path) -> JoinResult<Vec<PathBuf>> {
        let Some(previous) = &self.previous else {
            return Ok(Vec::new());
        };
        Ok(Self::scan(root)?
            .into_iter()
            .filter(|(path, hash)| previous.files.get(path) != Some(hash))
            .map(|(path, _)| PathBuf::from(path))
            .collect())
    }

    fn deleted_files(&self, root: &Path) -> JoinResult<Vec<PathBuf>> {
        Ok(self
            .previous_under(root)
            .map(|(path, _)| PathBuf::from(path))
            .filter(|path| !path.exists())
            .collect())
    }

    fn refresh(&mut self, path: &Path) {
        debug!("refreshed {}", path.display());
        self.refreshed.push(path.to_path_buf());
    }

    fn build_finished(&mut self, root: &Path) -> JoinResult<()> {
        let mut snapshot = self.previous.take().unwrap_or_default();
        snapshot
            .files
            .retain(|path, _| !Path::new(path.as_str()).starts_with(root));
        snapshot.files.extend(Self::scan(root)?);

        let data = serde_json::to_string_pretty(&snapshot)?;
        write_atomic(&self.manifest_path, &data)?;
        self.previous = Some(snapshot);
        Ok(())
    }
}
