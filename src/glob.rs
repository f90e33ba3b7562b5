//! Path matching for the join pipeline.
//!
//! Patterns are Ant style: `*` stays inside one path segment, `**` spans any
//! number of segments. Candidates are always matched as `/`-separated paths
//! relative to a root directory.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use lazy_static::lazy_static;
use std::path::{Component, Path, PathBuf};

use crate::error::{JoinError, JoinResult};

lazy_static! {
    /// Files every scan ignores: editor droppings and version control metadata.
    static ref DEFAULT_EXCLUDES: GlobSet = {
        let patterns = [
            "**/*~",
            "**/#*#",
            "**/.#*",
            "**/%*%",
            "**/._*",
            "**/.DS_Store",
            "**/CVS/**",
            "**/.cvsignore",
            "**/RCS/**",
            "**/SCCS/**",
            "**/vssver.scc",
            "**/.svn/**",
            "**/.arch-ids/**",
            "**/.bzr/**",
            "**/.hg/**",
            "**/.hgignore",
            "**/.git/**",
            "**/.gitignore",
            "**/.gitattributes",
            "**/_darcs/**",
        ];
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(
                GlobBuilder::new(pattern)
                    .literal_separator(true)
                    .build()
                    .unwrap(),
            );
        }
        builder.build().unwrap()
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// GLOB FILTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiled include/exclude pattern lists.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    includes: GlobSet,
    excludes: GlobSet,
    default_excludes: bool,
}

impl GlobFilter {
    pub fn new(includes: &[String], excludes: &[String]) -> JoinResult<Self> {
        Ok(GlobFilter {
            includes: build_set(includes)?,
            excludes: build_set(excludes)?,
            default_excludes: false,
        })
    }

    /// Also reject anything matched by the default exclusion rules.
    pub fn with_default_excludes(mut self) -> Self {
        self.default_excludes = true;
        self
    }

    /// `relative` is a `/`-separated path without a leading slash.
    pub fn matches(&self, relative: &str) -> bool {
        if self.default_excludes && DEFAULT_EXCLUDES.is_match(relative) {
            return false;
        }
        self.includes.is_match(relative) && !self.excludes.is_match(relative)
    }
}

fn build_set(patterns: &[String]) -> JoinResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        // Patterns may be written rooted ("/js/**/*.js"); candidates never are.
        let glob = GlobBuilder::new(pattern.trim_start_matches('/'))
            .literal_separator(true)
            .build()
            .map_err(|e| JoinError::Config(format!("invalid pattern \"{}\": {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| JoinError::Config(format!("invalid pattern set: {}", e)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATH MATCHER
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolves dependency references seen from one directory and decides whether
/// the resolved file is in scope for inlining.
pub struct PathMatcher<'a> {
    scope_root: &'a Path,
    current_dir: PathBuf,
    filter: &'a GlobFilter,
}

impl<'a> PathMatcher<'a> {
    pub fn new(scope_root: &'a Path, current_dir: impl Into<PathBuf>, filter: &'a GlobFilter) -> Self {
        PathMatcher {
            scope_root,
            current_dir: current_dir.into(),
            filter,
        }
    }

    /// `/`-prefixed references are rooted at the scope root, everything else
    /// at the current directory. The reference is taken as written; no
    /// extension is ever added.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        match reference.strip_prefix('/') {
            Some(rooted) => normalize(&self.scope_root.join(rooted)),
            None => normalize(&self.current_dir.join(reference)),
        }
    }

    pub fn is_in_scope(&self, path: &Path) -> bool {
        match relative_path(self.scope_root, path) {
            Some(relative) => self.filter.matches(&relative),
            None => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATH HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Fold `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `/`-separated path of `path` below `root`, or `None` when it lies outside.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rest = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rest
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
