//! Html2js Module
//!
//! Bundles every template below a source directory into a single script of
//! `$templateCache` registrations, one angular module per template plus a
//! `templates-main` module depending on all of them.

use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use tracing::{debug, info};

use crate::config::Html2jsConfig;
use crate::context::BuildContext;
use crate::discovery::find_files;
use crate::error::JoinResult;
use crate::files::{modified, read_lines, write_atomic};
use crate::glob::{relative_path, GlobFilter};
use crate::templates::{cache_key, registration_lines};

pub const MAIN_MODULE: &str = "templates-main";

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Html2jsReport {
    /// False when the target was already current.
    pub written: bool,
    pub templates: usize,
}

/// Generate the templates file described by `config`.
pub fn run_html2js(config: &Html2jsConfig, ctx: &mut dyn BuildContext) -> JoinResult<Html2jsReport> {
    let start = Instant::now();
    let result = html2js(config, ctx);
    info!("Html2js:: took {}ms", start.elapsed().as_millis());
    result
}

fn html2js(config: &Html2jsConfig, ctx: &mut dyn BuildContext) -> JoinResult<Html2jsReport> {
    debug!("---Html2js ---------------------------------------");
    debug!("---sourceDir: {}", config.source_dir.display());
    debug!("---includes: {:?}", config.include_patterns());
    debug!("---excludes: {:?}", config.exclude_patterns());
    debug!("---target: {}", config.target.display());
    debug!("---addRequireWrapper: {}", config.add_require_wrapper);
    debug!("---prefix: \"{}\"", config.prefix);

    config.validate()?;
    let filter = GlobFilter::new(&config.include_patterns(), &config.exclude_patterns())?
        .with_default_excludes();
    let files = find_files(&config.source_dir, &filter);

    if !is_build_needed(config, ctx, &filter, &files)? {
        info!("Html2js:: Nothing to do");
        return Ok(Html2jsReport {
            written: false,
            templates: files.len(),
        });
    }

    for file in &files {
        debug!("Html2js:: found: {}", file.display());
    }
    let contents = render(config, &files)?;

    info!("Html2js:: Writing output file: {}", config.target.display());
    write_atomic(&config.target, &contents)?;
    ctx.refresh(&config.target);

    Ok(Html2jsReport {
        written: true,
        templates: files.len(),
    })
}

fn is_build_needed(
    config: &Html2jsConfig,
    ctx: &dyn BuildContext,
    filter: &GlobFilter,
    files: &[PathBuf],
) -> JoinResult<bool> {
    if !ctx.is_incremental() {
        info!("Html2js:: full build");
        return Ok(true);
    }
    if !config.target.exists() {
        info!("Html2js:: detected target file missing");
        return Ok(true);
    }

    let root = &config.source_dir;
    let is_template = |path: &PathBuf| {
        relative_path(root, path).is_some_and(|relative| filter.matches(&relative))
    };
    let deleted: Vec<PathBuf> = ctx.deleted_files(root)?.into_iter().filter(is_template).collect();
    for file in &deleted {
        info!("Html2js:: detected deleted template: {}", shorten(root, file));
    }
    let changed: Vec<PathBuf> = ctx.changed_files(root)?.into_iter().filter(is_template).collect();
    for file in &changed {
        info!("Html2js:: detected new/changed template: {}", shorten(root, file));
    }
    if !changed.is_empty() || !deleted.is_empty() {
        return Ok(true);
    }

    let mut newest: Option<(&PathBuf, SystemTime)> = None;
    for file in files {
        let time = modified(file)?;
        if newest.map_or(true, |(_, t)| time > t) {
            newest = Some((file, time));
        }
    }
    if let Some((file, _)) = newest {
        if !ctx.is_uptodate(&config.target, file) {
            info!(
                "Html2js:: target file was changed or is older than {}",
                shorten(root, file)
            );
            return Ok(true);
        }
    }
    Ok(false)
}

fn shorten(root: &Path, file: &Path) -> String {
    match relative_path(root, file) {
        Some(relative) => format!("/{}", relative),
        None => file.display().to_string(),
    }
}

/// Full text of the templates file for the sorted `files`.
pub fn render(config: &Html2jsConfig, files: &[PathBuf]) -> JoinResult<String> {
    let keys: Vec<String> = files
        .iter()
        .map(|file| cache_key(&config.prefix, &config.source_dir, file))
        .collect();

    let mut lines = Vec::new();
    if config.add_require_wrapper {
        lines.push("define(['angular'], function (angular){".to_string());
        lines.push(String::new());
    }

    lines.push(format!("angular.module('{}', ['{}']);", MAIN_MODULE, keys.join("', '")));
    lines.push(String::new());

    for (file, key) in files.iter().zip(&keys) {
        lines.push(format!(
            "angular.module('{}', []).run(['$templateCache', function($templateCache) {{",
            key
        ));
        lines.extend(registration_lines(key, &read_lines(file)?, '\''));
        lines.push("}]);".to_string());
        lines.push(String::new());
    }

    if config.add_require_wrapper {
        lines.push(String::new());
        lines.push("return null;".to_string());
        lines.push("});".to_string());
    }

    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}
