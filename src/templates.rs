//! Template inlining
//!
//! Emits `$templateCache` registrations so a bundle carries its HTML
//! templates with it. Each template line becomes one escaped string literal;
//! the literals are chained with `+`.

use std::path::{Path, PathBuf};

use crate::error::JoinResult;
use crate::files::read_lines;
use crate::glob::relative_path;

/// Name of the synthetic module holding a bundle's templates.
pub fn templates_module_name(module_name: &str) -> String {
    format!("{}Templates", module_name)
}

pub fn escape_line(line: &str) -> String {
    line.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Cache key: prefix followed by the `/`-rooted path below `root`.
pub fn cache_key(prefix: &str, root: &Path, file: &Path) -> String {
    match relative_path(root, file) {
        Some(relative) => format!("{}/{}", prefix, relative),
        None => format!("{}{}", prefix, file.display()),
    }
}

/// One `$templateCache.put` call, as output lines. `quote` delimits the key.
pub fn registration_lines(key: &str, lines: &[String], quote: char) -> Vec<String> {
    let Some((last, init)) = lines.split_last() else {
        return vec![format!("\t$templateCache.put({q}{}{q}, \"\");", key, q = quote)];
    };

    let mut out = Vec::with_capacity(lines.len() + 1);
    out.push(format!("\t$templateCache.put({q}{}{q},", key, q = quote));
    for line in init {
        out.push(format!("\t\"{}\\n\" +", escape_line(line)));
    }
    out.push(format!("\t\"{}\");", escape_line(last)));
    out
}

pub struct TemplateInliner<'a> {
    root: &'a Path,
    prefix: &'a str,
}

impl<'a> TemplateInliner<'a> {
    pub fn new(root: &'a Path, prefix: &'a str) -> Self {
        TemplateInliner { root, prefix }
    }

    /// Registration block for `templates`, or `None` when there are none.
    pub fn inline(&self, module_name: &str, templates: &[PathBuf]) -> JoinResult<Option<String>> {
        if templates.is_empty() {
            return Ok(None);
        }

        let mut sorted = templates.to_vec();
        sorted.sort();

        let mut lines = vec![format!(
            "angular.module(\"{}\", []).run([\"$templateCache\", function($templateCache) {{",
            templates_module_name(module_name)
        )];
        for file in &sorted {
            let key = cache_key(self.prefix, self.root, file);
            lines.extend(registration_lines(&key, &read_lines(file)?, '"'));
            lines.push(String::new());
        }
        lines.push("}]);\n".to_string());

        Ok(Some(lines.join("\n")))
    }
}
