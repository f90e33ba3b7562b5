//! Transform Module
//!
//! Structural rewrites of module text. Spans come from `parse.rs`; the text
//! between them is never touched.

use crate::parse::{parse_module, ModuleShape};

/// Replacements as `(start, end, text)`; applied back to front.
pub type Replacement = (u32, u32, String);

pub fn apply_replacements(source: &str, mut replacements: Vec<Replacement>) -> String {
    replacements.sort_by(|a, b| b.0.cmp(&a.0));

    let mut result = source.to_string();
    for (start, end, text) in replacements {
        result.replace_range((start as usize)..(end as usize), &text);
    }
    result
}

/// Turn an inlined dependency into an immediately invoked closure.
///
/// Text without a recognisable wrapper is returned unchanged.
pub fn inline_dependency(contents: &str) -> String {
    match parse_module(contents) {
        Ok(shape) => apply_replacements(
            contents,
            vec![
                (shape.wrapper.open.0, shape.wrapper.open.1, "(function() {".to_string()),
                (shape.wrapper.close.0, shape.wrapper.close.1, "\n})();\n".to_string()),
            ],
        ),
        Err(_) => contents.to_string(),
    }
}

/// Turn the bundle root's wrapper into a closure whose value the bundle
/// returns. With `templates_module`, that module is injected as the first
/// requirement of the root's module registration.
pub fn rewrap_root(contents: &str, templates_module: Option<&str>) -> String {
    match parse_module(contents) {
        Ok(shape) => {
            let mut replacements = vec![
                (shape.wrapper.open.0, shape.wrapper.open.1, "return (function() {".to_string()),
                (shape.wrapper.close.0, shape.wrapper.close.1, "\n})();".to_string()),
            ];
            if let Some(name) = templates_module {
                replacements.extend(inject_requirement(&shape, name));
            }
            apply_replacements(contents, replacements)
        }
        Err(_) => contents.to_string(),
    }
}

fn inject_requirement(shape: &ModuleShape, name: &str) -> Option<Replacement> {
    let registration = shape.registration.as_ref()?;
    Some(match registration.first_element {
        Some(pos) => (pos, pos, format!("\"{}\", ", name)),
        None => (
            registration.span.0,
            registration.span.1,
            format!("[ \"{}\" ]", name),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_replacements_out_of_order() {
        let out = apply_replacements(
            "abcdef",
            vec![(0, 1, "X".to_string()), (4, 6, "YZW".to_string()), (2, 2, "-".to_string())],
        );
        assert_eq!(out, "Xb-cdYZW");
    }

    #[test]
    fn test_inline_dependency() {
        let src = "define([\"angular\"], function(angular) {\n    angular.module(\"A\").run(go);\n});";
        assert_eq!(
            inline_dependency(src),
            "(function() {\n    angular.module(\"A\").run(go);\n})();\n"
        );
    }

    #[test]
    fn test_inline_dependency_without_wrapper_is_untouched() {
        assert_eq!(inline_dependency("window.x = 1;"), "window.x = 1;");
    }

    #[test]
    fn test_rewrap_root() {
        let src = "define([], function() {\n    return 1;\n});";
        assert_eq!(rewrap_root(src, None), "return (function() {\n    return 1;\n})();");
    }

    #[test]
    fn test_rewrap_root_injects_into_non_empty_requires() {
        let src = "define([\"angular\"], function(angular) {\n    return angular.module(\"AModule\", [ \"ngRoute\" ]);\n});";
        assert_eq!(
            rewrap_root(src, Some("AModuleTemplates")),
            "return (function() {\n    return angular.module(\"AModule\", [ \"AModuleTemplates\", \"ngRoute\" ]);\n})();"
        );
    }

    #[test]
    fn test_rewrap_root_injects_into_empty_requires() {
        let src = "define([], function() {\n    return angular.module('B', []);\n});";
        assert_eq!(
            rewrap_root(src, Some("BTemplates")),
            "return (function() {\n    return angular.module('B', [ \"BTemplates\" ]);\n})();"
        );
    }
}
