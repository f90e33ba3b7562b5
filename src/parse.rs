//! Parse Module for the join pipeline
//!
//! Locates the require.js wrapper of a source file with the oxc parser:
//!
//! ```text
//! define([ "dep-a", "dep-b" ], function(a, b) { ...body... });
//! ```
//!
//! Only spans and names are extracted. Rewriting happens on the original text
//! in `transform.rs`, so everything inside the factory body is preserved
//! byte for byte.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, ArrayExpressionElement, BindingPattern, CallExpression, Expression,
    FormalParameters, FunctionBody, Statement,
};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// The `define(...)` call found in a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineWrapper {
    /// Declared dependency references, unquoted, in declaration order.
    pub dependencies: Vec<String>,
    /// Factory parameter names, positionally matching `dependencies`.
    pub params: Vec<String>,
    /// From the start of the `define` statement through the body's `{`.
    pub open: (u32, u32),
    /// From the body's `}` (with whitespace before it) through the end of the
    /// statement, including a trailing `;`.
    pub close: (u32, u32),
}

/// The requires array of the first `<x>.module(name, [ ... ])` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiresArray {
    pub span: (u32, u32),
    pub first_element: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleShape {
    pub wrapper: DefineWrapper,
    pub registration: Option<RequiresArray>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse `source` and locate its wrapper. The error describes why the text
/// does not have the expected shape.
pub fn parse_module(source: &str) -> Result<ModuleShape, String> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(false);
    let ret = Parser::new(&allocator, source, source_type).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let reason = ret
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser gave up".to_string());
        return Err(format!("syntax error: {}", reason));
    }

    let mut wrapper = None;
    for stmt in &ret.program.body {
        if let Statement::ExpressionStatement(expr_stmt) = stmt {
            if let Expression::CallExpression(call) = &expr_stmt.expression {
                if is_define_call(call) {
                    wrapper = Some(read_define(source, call, expr_stmt.span)?);
                    break;
                }
            }
        }
    }
    let wrapper = wrapper.ok_or_else(|| "no define call found".to_string())?;

    let mut finder = RegistrationFinder { found: None };
    finder.visit_program(&ret.program);

    Ok(ModuleShape {
        wrapper,
        registration: finder.found,
    })
}

fn is_define_call(call: &CallExpression) -> bool {
    matches!(&call.callee, Expression::Identifier(id) if id.name == "define")
}

fn read_define(source: &str, call: &CallExpression, stmt_span: Span) -> Result<DefineWrapper, String> {
    let (dependencies, factory) = match call.arguments.as_slice() {
        [factory] => (Vec::new(), factory),
        [deps, factory] => (read_dependencies(deps)?, factory),
        _ => return Err("define must take a dependency array and a factory".to_string()),
    };

    let (params, body) = match factory.as_expression() {
        Some(Expression::FunctionExpression(func)) => {
            let body = func
                .body
                .as_ref()
                .ok_or_else(|| "factory function has no body".to_string())?;
            (read_params(source, &func.params), body)
        }
        Some(Expression::ArrowFunctionExpression(arrow)) if !arrow.expression => {
            (read_params(source, &arrow.params), &arrow.body)
        }
        _ => return Err("define factory must be a function with a block body".to_string()),
    };

    Ok(DefineWrapper {
        dependencies,
        params,
        open: (stmt_span.start, body.span.start + 1),
        close: (close_start(source, body), stmt_span.end),
    })
}

fn read_dependencies(arg: &Argument) -> Result<Vec<String>, String> {
    let Some(Expression::ArrayExpression(array)) = arg.as_expression() else {
        return Err("first define argument is not an array".to_string());
    };

    let mut deps = Vec::new();
    for element in &array.elements {
        match element {
            ArrayExpressionElement::StringLiteral(lit) => deps.push(lit.value.to_string()),
            _ => return Err("dependency array must only hold string literals".to_string()),
        }
    }
    Ok(deps)
}

fn read_params(source: &str, params: &FormalParameters) -> Vec<String> {
    params
        .items
        .iter()
        .map(|param| match &param.pattern {
            BindingPattern::BindingIdentifier(id) => id.name.to_string(),
            _ => source[param.span.start as usize..param.span.end as usize].to_string(),
        })
        .collect()
}

/// Position of the body's closing brace, pulled back over any whitespace.
fn close_start(source: &str, body: &FunctionBody) -> u32 {
    let brace = (body.span.end - 1) as usize;
    let inner = &source[..brace];
    inner.trim_end().len() as u32
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE REGISTRATION
// ═══════════════════════════════════════════════════════════════════════════════

struct RegistrationFinder {
    found: Option<RequiresArray>,
}

impl<'a> Visit<'a> for RegistrationFinder {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if self.found.is_some() {
            return;
        }
        if let Expression::StaticMemberExpression(member) = &call.callee {
            if member.property.name == "module" && call.arguments.len() >= 2 {
                if let Some(Expression::ArrayExpression(array)) = call.arguments[1].as_expression() {
                    self.found = Some(RequiresArray {
                        span: (array.span.start, array.span.end),
                        first_element: array.elements.first().map(|e| e.span().start),
                    });
                    return;
                }
            }
        }
        oxc_ast_visit::walk::walk_call_expression(self, call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(source: &str, span: (u32, u32)) -> &str {
        &source[span.0 as usize..span.1 as usize]
    }

    #[test]
    fn test_dependencies_and_params() {
        let src = r#"define([ "lodash", './helper.js' ], function(_, helper) {
    return 1;
});"#;
        let shape = parse_module(src).unwrap();
        assert_eq!(shape.wrapper.dependencies, vec!["lodash", "./helper.js"]);
        assert_eq!(shape.wrapper.params, vec!["_", "helper"]);
        assert_eq!(
            slice(src, shape.wrapper.open),
            r#"define([ "lodash", './helper.js' ], function(_, helper) {"#
        );
        assert_eq!(slice(src, shape.wrapper.close), "\n});");
    }

    #[test]
    fn test_fewer_params_than_dependencies() {
        let shape = parse_module(r#"define(["a", "b"], function(a) {});"#).unwrap();
        assert_eq!(shape.wrapper.dependencies.len(), 2);
        assert_eq!(shape.wrapper.params, vec!["a"]);
    }

    #[test]
    fn test_empty_array_and_factory_only() {
        let shape = parse_module("define([], function() { var x = 1; })").unwrap();
        assert!(shape.wrapper.dependencies.is_empty());

        let src = "define(function() { var x = 1; });";
        let shape = parse_module(src).unwrap();
        assert!(shape.wrapper.dependencies.is_empty());
        assert_eq!(slice(src, shape.wrapper.open), "define(function() {");
        assert_eq!(slice(src, shape.wrapper.close), " });");
    }

    #[test]
    fn test_leading_statement_is_kept_out_of_open_span() {
        let src = "'use strict';\ndefine([], function() {\n  go();\n});";
        let shape = parse_module(src).unwrap();
        assert_eq!(slice(src, shape.wrapper.open), "define([], function() {");
        assert_eq!(&src[..shape.wrapper.open.0 as usize], "'use strict';\n");
    }

    #[test]
    fn test_lookalike_text_inside_body_is_ignored() {
        let src = r#"define(["x"], function(x) {
    var s = "define([\"fake\"], function(f) {";
    // }); not the end
});"#;
        let shape = parse_module(src).unwrap();
        assert_eq!(shape.wrapper.dependencies, vec!["x"]);
        assert_eq!(slice(src, shape.wrapper.close), "\n});");
    }

    #[test]
    fn test_mismatch_reasons() {
        assert!(parse_module("var x = 1;").is_err());
        assert!(parse_module("define([dep], function(d) {});").is_err());
        assert!(parse_module("define([], () => 1);").is_err());
        assert!(parse_module("define([], function( {").is_err());
    }

    #[test]
    fn test_registration_array() {
        let src = r#"define(["angular"], function(angular) {
    angular.module("AModule", [ "ngRoute" ]).config(function() {});
    other.module("B", []);
});"#;
        let shape = parse_module(src).unwrap();
        let reg = shape.registration.unwrap();
        assert_eq!(slice(src, reg.span), r#"[ "ngRoute" ]"#);
        assert_eq!(&src[reg.first_element.unwrap() as usize..][..9], r#""ngRoute""#);

        let src = r#"define([], function() { angular.module('B', []); });"#;
        let reg = parse_module(src).unwrap().registration.unwrap();
        assert_eq!(slice(src, reg.span), "[]");
        assert_eq!(reg.first_element, None);
    }

    #[test]
    fn test_getter_form_is_not_a_registration() {
        let shape = parse_module(r#"define([], function() { angular.module("A").run(go); });"#).unwrap();
        assert!(shape.registration.is_none());
    }
}
