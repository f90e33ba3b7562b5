//! Dependency resolution
//!
//! Walks the `define` dependency lists of a bundle root. Every reference that
//! resolves to an in-scope file is read and walked in turn; its own
//! dependencies are merged into the same flat sets. Everything else is an
//! external dependency and stays declared on the bundle.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{
    Diagnostic, JoinError, JoinResult, DIAG_CYCLE_DETECTED, DIAG_PATTERN_MISMATCH,
};
use crate::files::read_trimmed;
use crate::glob::{GlobFilter, PathMatcher};
use crate::parse::parse_module;

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Inlined files in depth-first declaration order.
    pub internal_deps: Vec<PathBuf>,
    pub internal_dep_contents: HashMap<PathBuf, String>,
    /// Preserved references in first-seen order.
    pub external_deps: Vec<String>,
    /// External reference to factory parameter; first binding wins.
    pub argument_bindings: Vec<(String, String)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn binding_for(&self, dependency: &str) -> Option<&str> {
        self.argument_bindings
            .iter()
            .find(|(dep, _)| dep == dependency)
            .map(|(_, param)| param.as_str())
    }
}

pub struct DependencyResolver<'a> {
    scope_root: &'a Path,
    filter: &'a GlobFilter,
    strict_cycles: bool,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(scope_root: &'a Path, filter: &'a GlobFilter, strict_cycles: bool) -> Self {
        DependencyResolver {
            scope_root,
            filter,
            strict_cycles,
        }
    }

    pub fn resolve(&self, root_file: &Path, root_contents: &str) -> JoinResult<Resolution> {
        let mut resolution = Resolution::default();
        let mut seen = HashSet::new();
        let mut stack = vec![root_file.to_path_buf()];
        self.walk(root_file, root_contents, &mut stack, &mut seen, &mut resolution)?;
        Ok(resolution)
    }

    fn walk(
        &self,
        file: &Path,
        contents: &str,
        stack: &mut Vec<PathBuf>,
        seen: &mut HashSet<PathBuf>,
        out: &mut Resolution,
    ) -> JoinResult<()> {
        let shape = match parse_module(contents) {
            Ok(shape) => shape,
            Err(reason) => {
                warn!("Join:: No define found in {}: {}", file.display(), reason);
                out.diagnostics.push(Diagnostic::new(
                    DIAG_PATTERN_MISMATCH,
                    &format!("no usable define wrapper: {}", reason),
                    file,
                ));
                return Ok(());
            }
        };

        let dir = file.parent().unwrap_or(self.scope_root);
        let matcher = PathMatcher::new(self.scope_root, dir, self.filter);

        for (index, reference) in shape.wrapper.dependencies.iter().enumerate() {
            let dep_file = matcher.resolve(reference);

            if !matcher.is_in_scope(&dep_file) {
                if !out.external_deps.contains(reference) {
                    out.external_deps.push(reference.clone());
                }
                if let Some(param) = shape.wrapper.params.get(index) {
                    if out.binding_for(reference).is_none() {
                        out.argument_bindings.push((reference.clone(), param.clone()));
                    }
                }
                continue;
            }

            if let Some(pos) = stack.iter().position(|p| p == &dep_file) {
                let mut chain = stack[pos..].to_vec();
                chain.push(dep_file.clone());
                if self.strict_cycles {
                    return Err(JoinError::CycleDetected { chain });
                }
                warn!(
                    "Join:: Circular dependency on {} from {}",
                    dep_file.display(),
                    file.display()
                );
                out.diagnostics.push(Diagnostic::new(
                    DIAG_CYCLE_DETECTED,
                    &JoinError::CycleDetected { chain }.to_string(),
                    file,
                ));
                continue;
            }

            if !seen.insert(dep_file.clone()) {
                continue;
            }

            debug!("Join:: Inlining {} into bundle", dep_file.display());
            let dep_contents = read_trimmed(&dep_file)?;
            out.internal_deps.push(dep_file.clone());
            out.internal_dep_contents
                .insert(dep_file.clone(), dep_contents.clone());

            stack.push(dep_file.clone());
            self.walk(&dep_file, &dep_contents, stack, seen, out)?;
            stack.pop();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Fixture {
        dir: tempfile::TempDir,
        filter: GlobFilter,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                dir: tempfile::tempdir().unwrap(),
                filter: GlobFilter::new(&["/js/**/*.js".to_string()], &[]).unwrap(),
            }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn write(&self, rel: &str, contents: &str) -> PathBuf {
            let path = self.root().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
            path
        }

        fn resolve(&self, file: &Path, strict: bool) -> JoinResult<Resolution> {
            let contents = read_trimmed(file).unwrap();
            DependencyResolver::new(self.root(), &self.filter, strict).resolve(file, &contents)
        }
    }

    #[test]
    fn test_internal_and_external_split() {
        let fx = Fixture::new();
        let helper = fx.write("js/A/helper.js", "define([], function() { helper(); });");
        let root = fx.write(
            "js/A/AModule.js",
            r#"define(["lodash", "./helper.js", "angular"], function(_, helper, angular) {});"#,
        );

        let res = fx.resolve(&root, false).unwrap();
        assert_eq!(res.internal_deps, vec![helper.clone()]);
        assert_eq!(
            res.internal_dep_contents.get(&helper).map(|s| s.as_str()),
            Some("define([], function() { helper(); });")
        );
        assert_eq!(res.external_deps, vec!["lodash", "angular"]);
        assert_eq!(res.binding_for("lodash"), Some("_"));
        assert_eq!(res.binding_for("angular"), Some("angular"));
        assert!(res.diagnostics.is_empty());
    }

    #[test]
    fn test_depth_first_order_and_single_visit() {
        let fx = Fixture::new();
        let c = fx.write("js/c.js", "define([], function() {});");
        let b = fx.write("js/b.js", r#"define(["./c.js"], function() {});"#);
        let d = fx.write("js/d.js", r#"define(["./c.js", "./b.js"], function() {});"#);
        let root = fx.write(
            "js/rootModule.js",
            r#"define(["./b.js", "./d.js", "./c.js"], function() {});"#,
        );

        let res = fx.resolve(&root, false).unwrap();
        assert_eq!(res.internal_deps, vec![b, c, d]);
        assert_eq!(res.internal_dep_contents.len(), 3);
    }

    #[test]
    fn test_rooted_reference_and_out_of_glob_file() {
        let fx = Fixture::new();
        let util = fx.write("js/common/util.js", "define([], function() {});");
        fx.write("lib/vendor.js", "define([], function() {});");
        let root = fx.write(
            "js/A/AModule.js",
            r#"define(["/js/common/util.js", "../../lib/vendor.js"], function(util, vendor) {});"#,
        );

        let res = fx.resolve(&root, false).unwrap();
        assert_eq!(res.internal_deps, vec![util]);
        assert_eq!(res.external_deps, vec!["../../lib/vendor.js"]);
        assert_eq!(res.binding_for("../../lib/vendor.js"), Some("vendor"));
    }

    #[test]
    fn test_first_binding_wins_across_files() {
        let fx = Fixture::new();
        fx.write("js/a.js", r#"define(["jquery"], function(jq) {});"#);
        let root = fx.write(
            "js/rootModule.js",
            r#"define(["jquery", "./a.js", "moment"], function($) {});"#,
        );

        let res = fx.resolve(&root, false).unwrap();
        assert_eq!(res.external_deps, vec!["jquery", "moment"]);
        assert_eq!(res.argument_bindings, vec![("jquery".to_string(), "$".to_string())]);
        assert_eq!(res.binding_for("moment"), None);
    }

    #[test]
    fn test_mismatch_is_a_warning() {
        let fx = Fixture::new();
        let plain = fx.write("js/plain.js", "window.plain = true;");
        let root = fx.write("js/rootModule.js", r#"define(["./plain.js"], function() {});"#);

        let res = fx.resolve(&root, false).unwrap();
        assert_eq!(res.internal_deps, vec![plain.clone()]);
        assert_eq!(res.diagnostics.len(), 1);
        assert_eq!(res.diagnostics[0].code, DIAG_PATTERN_MISMATCH);
        assert_eq!(res.diagnostics[0].file, plain.display().to_string());
    }

    #[test]
    fn test_cycle_is_tolerated_by_default() {
        let fx = Fixture::new();
        let a = fx.write("js/a.js", r#"define(["./b.js"], function() {});"#);
        let b = fx.write("js/b.js", r#"define(["./a.js", "./rootModule.js"], function() {});"#);
        let root = fx.write("js/rootModule.js", r#"define(["./a.js"], function() {});"#);

        let res = fx.resolve(&root, false).unwrap();
        assert_eq!(res.internal_deps, vec![a, b]);
        assert!(!res.internal_deps.contains(&root));
        assert_eq!(res.diagnostics.len(), 2);
        assert!(res.diagnostics.iter().all(|d| d.code == DIAG_CYCLE_DETECTED));
    }

    #[test]
    fn test_cycle_fails_in_strict_mode() {
        let fx = Fixture::new();
        fx.write("js/a.js", r#"define(["./b.js"], function() {});"#);
        fx.write("js/b.js", r#"define(["./a.js"], function() {});"#);
        let root = fx.write("js/rootModule.js", r#"define(["./a.js"], function() {});"#);

        match fx.resolve(&root, true) {
            Err(JoinError::CycleDetected { chain }) => {
                assert_eq!(chain.len(), 3);
                assert_eq!(chain.first(), chain.last());
            }
            other => panic!("expected cycle error, got {:?}", other.map(|r| r.internal_deps)),
        }
    }

    #[test]
    fn test_missing_internal_file_is_fatal() {
        let fx = Fixture::new();
        let root = fx.write("js/rootModule.js", r#"define(["./gone.js"], function() {});"#);

        match fx.resolve(&root, false) {
            Err(JoinError::Io { path, .. }) => assert_eq!(path, fx.root().join("js/gone.js")),
            other => panic!("expected io error, got {:?}", other.map(|r| r.internal_deps)),
        }
    }
}
