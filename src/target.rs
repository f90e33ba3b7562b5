//! Target path mapping
//!
//! Bundles land at the same relative location under the output root, except
//! for a module living in a directory of its own name (`A/AModule.js`), which
//! is flattened one level up (`AModule.js`). Every flattening is recorded so
//! the aggregator's references can be rewritten to match.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::glob::relative_path;

// ═══════════════════════════════════════════════════════════════════════════════
// PATH REWRITE REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Pre-flatten path to flattened path, both `/`-rooted at the output root and
/// without the `.js` extension. Kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathRewriteRegistry {
    entries: Vec<(String, String)>,
}

impl PathRewriteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: String, to: String) {
        match self.entries.iter_mut().find(|(key, _)| *key == from) {
            Some(entry) => entry.1 = to,
            None => self.entries.push((from, to)),
        }
    }

    pub fn get(&self, from: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == from)
            .map(|(_, to)| to.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every literal occurrence of each pre-flatten path.
    pub fn apply(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (from, to) in &self.entries {
            result = result.replace(from.as_str(), to);
        }
        result
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TARGET MAPPER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TargetMapper<'a> {
    source_root: &'a Path,
    target_root: &'a Path,
    module_suffix: &'a str,
}

impl<'a> TargetMapper<'a> {
    pub fn new(source_root: &'a Path, target_root: &'a Path, module_suffix: &'a str) -> Self {
        TargetMapper {
            source_root,
            target_root,
            module_suffix,
        }
    }

    pub fn map_target(&self, source_file: &Path, registry: &mut PathRewriteRegistry) -> PathBuf {
        let Some(relative) = relative_path(self.source_root, source_file) else {
            let name = source_file.file_name().unwrap_or(source_file.as_os_str());
            return self.target_root.join(name);
        };

        let parts: Vec<&str> = relative.split('/').collect();
        if let [outer @ .., folder, file] = parts.as_slice() {
            if *file == format!("{}{}", folder, self.module_suffix) {
                let flattened = if outer.is_empty() {
                    file.to_string()
                } else {
                    format!("{}/{}", outer.join("/"), file)
                };
                let from = format!("/{}", strip_js(&relative));
                let to = format!("/{}", strip_js(&flattened));
                debug!("Join:: Flattening {} to {}", from, to);
                registry.insert(from, to);
                return self.target_root.join(flattened);
            }
        }

        self.target_root.join(relative)
    }
}

fn strip_js(path: &str) -> &str {
    path.strip_suffix(".js").unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> TargetMapper<'static> {
        TargetMapper::new(Path::new("/p/src/js"), Path::new("/p/target/js"), "Module.js")
    }

    #[test]
    fn test_plain_module_keeps_relative_location() {
        let mut registry = PathRewriteRegistry::new();
        let target = mapper().map_target(Path::new("/p/src/js/shared/sharedStuff.js"), &mut registry);
        assert_eq!(target, PathBuf::from("/p/target/js/shared/sharedStuff.js"));
        assert!(registry.is_empty());

        let target = mapper().map_target(Path::new("/p/src/js/main.js"), &mut registry);
        assert_eq!(target, PathBuf::from("/p/target/js/main.js"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_self_named_module_is_flattened() {
        let mut registry = PathRewriteRegistry::new();
        let target = mapper().map_target(Path::new("/p/src/js/foo/fooModule.js"), &mut registry);
        assert_eq!(target, PathBuf::from("/p/target/js/fooModule.js"));
        assert_eq!(registry.get("/foo/fooModule"), Some("/fooModule"));

        let target = mapper().map_target(Path::new("/p/src/js/admin/users/usersModule.js"), &mut registry);
        assert_eq!(target, PathBuf::from("/p/target/js/admin/usersModule.js"));
        assert_eq!(registry.get("/admin/users/usersModule"), Some("/admin/usersModule"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_module_in_other_directory_is_not_flattened() {
        let mut registry = PathRewriteRegistry::new();
        let target = mapper().map_target(Path::new("/p/src/js/bar/fooModule.js"), &mut registry);
        assert_eq!(target, PathBuf::from("/p/target/js/bar/fooModule.js"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_custom_suffix() {
        let mapper = TargetMapper::new(Path::new("/root"), Path::new("/out"), "-module.js");
        let mut registry = PathRewriteRegistry::new();
        let target = mapper.map_target(Path::new("/root/foo/foo-module.js"), &mut registry);
        assert_eq!(target, PathBuf::from("/out/foo-module.js"));
        assert_eq!(registry.get("/foo/foo-module"), Some("/foo-module"));
    }

    #[test]
    fn test_apply_only_touches_registered_paths() {
        let mut registry = PathRewriteRegistry::new();
        registry.insert("/A/AModule".to_string(), "/AModule".to_string());
        let text = r#"require(["./A/AModule", "./B/BModule"], function() { load("./A/AModule"); });"#;
        assert_eq!(
            registry.apply(text),
            r#"require(["./AModule", "./B/BModule"], function() { load("./AModule"); });"#
        );
    }
}
