//! Configuration Module
//!
//! Settings for the join and html2js runs. Both are plain serde structs so a
//! host can hand them over as JSON; every optional field falls back to the
//! conventional layout of an AngularJS + require.js project.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{JoinError, JoinResult};

lazy_static! {
    static ref PATTERN_SEPARATOR: Regex = Regex::new(r"\s*,\s*").unwrap();
}

/// Split a comma separated pattern list, dropping empty entries.
pub fn pattern_list(patterns: &str) -> Vec<String> {
    PATTERN_SEPARATOR
        .split(patterns.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

fn default_main() -> String {
    "main.js".to_string()
}

fn default_app() -> String {
    "app.js".to_string()
}

fn default_modules() -> String {
    "**/*Module.js".to_string()
}

fn default_templates() -> String {
    "*.html,utility/*.html".to_string()
}

fn default_joinable() -> String {
    "/js/**/*.js".to_string()
}

fn default_module_suffix() -> String {
    "Module.js".to_string()
}

fn default_html_include() -> String {
    "**/*.html".to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// JOIN
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinConfig {
    /// Directory holding the sources to join.
    pub source: PathBuf,
    /// Directory receiving the bundles.
    pub target: PathBuf,
    /// Aggregator file name, relative to `source`.
    #[serde(default = "default_main")]
    pub main: String,
    /// Application file name, relative to `source`. Bundled like any module.
    #[serde(default = "default_app")]
    pub app: String,
    /// Comma separated patterns identifying bundle-root modules.
    #[serde(default = "default_modules")]
    pub modules: String,
    /// Comma separated template patterns, relative to each module's directory.
    #[serde(default = "default_templates")]
    pub templates: String,
    /// Comma separated patterns, relative to the parent of `source`, naming
    /// files that may be inlined.
    #[serde(default = "default_joinable")]
    pub joinable: String,
    /// Prefix put before every template cache key.
    #[serde(default)]
    pub prefix: String,
    /// File name suffix of a module living in a directory of the same name.
    #[serde(default = "default_module_suffix")]
    pub module_suffix: String,
    /// Abort on circular internal dependencies instead of warning.
    #[serde(default)]
    pub strict_cycles: bool,
}

impl JoinConfig {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        JoinConfig {
            source: source.into(),
            target: target.into(),
            main: default_main(),
            app: default_app(),
            modules: default_modules(),
            templates: default_templates(),
            joinable: default_joinable(),
            prefix: String::new(),
            module_suffix: default_module_suffix(),
            strict_cycles: false,
        }
    }

    pub fn from_json(json: &str) -> JoinResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn main_file(&self) -> PathBuf {
        self.source.join(&self.main)
    }

    pub fn app_file(&self) -> PathBuf {
        self.source.join(&self.app)
    }

    /// Root that joinable patterns and `/`-prefixed references are relative to.
    pub fn join_root(&self) -> &Path {
        self.source.parent().unwrap_or(&self.source)
    }

    pub fn module_patterns(&self) -> Vec<String> {
        pattern_list(&self.modules)
    }

    pub fn template_patterns(&self) -> Vec<String> {
        pattern_list(&self.templates)
    }

    pub fn joinable_patterns(&self) -> Vec<String> {
        pattern_list(&self.joinable)
    }

    pub fn validate(&self) -> JoinResult<()> {
        check_source_dir(&self.source)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTML2JS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Html2jsConfig {
    /// Directory holding the templates.
    pub source_dir: PathBuf,
    /// Generated templates file.
    pub target: PathBuf,
    #[serde(default = "default_html_include")]
    pub include: String,
    #[serde(default)]
    pub exclude: String,
    #[serde(default)]
    pub prefix: String,
    /// Wrap the output in a require.js `define` call.
    #[serde(default)]
    pub add_require_wrapper: bool,
}

impl Html2jsConfig {
    pub fn new(source_dir: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Html2jsConfig {
            source_dir: source_dir.into(),
            target: target.into(),
            include: default_html_include(),
            exclude: String::new(),
            prefix: String::new(),
            add_require_wrapper: false,
        }
    }

    pub fn from_json(json: &str) -> JoinResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn include_patterns(&self) -> Vec<String> {
        pattern_list(&self.include)
    }

    pub fn exclude_patterns(&self) -> Vec<String> {
        pattern_list(&self.exclude)
    }

    pub fn validate(&self) -> JoinResult<()> {
        check_source_dir(&self.source_dir)
    }
}

fn check_source_dir(dir: &Path) -> JoinResult<()> {
    if !dir.is_dir() {
        return Err(JoinError::Config(format!(
            "could not find the source folder: {}",
            dir.display()
        )));
    }
    Ok(())
}
