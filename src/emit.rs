//! Emit Module
//!
//! Assembles bundle text from a [`ModuleDescriptor`] and writes outputs.
//!
//! A bundle is laid out as:
//!
//! ```text
//! define([ <external deps> ], function(<bound params>) {
//! (function() { ...inlined dependency... })();     one per internal dep
//! angular.module("XTemplates", []).run(...);        when templates exist
//! return (function() { ...root module body... })();
//! });
//! ```

use std::path::Path;
use tracing::info;

use crate::context::BuildContext;
use crate::error::JoinResult;
use crate::files::write_atomic;
use crate::module::ModuleDescriptor;
use crate::resolve::Resolution;
use crate::target::PathRewriteRegistry;
use crate::templates::{templates_module_name, TemplateInliner};
use crate::transform::{inline_dependency, rewrap_root};

/// Opening line of a bundle: bound externals first, in binding order, then
/// the unbound ones.
pub fn render_header(resolution: &Resolution) -> String {
    let mut deps: Vec<&str> = resolution
        .argument_bindings
        .iter()
        .map(|(dep, _)| dep.as_str())
        .collect();
    for dep in &resolution.external_deps {
        if resolution.binding_for(dep).is_none() {
            deps.push(dep);
        }
    }
    let params: Vec<&str> = resolution
        .argument_bindings
        .iter()
        .map(|(_, param)| param.as_str())
        .collect();

    if deps.is_empty() {
        return format!("define([], function({}) {{\n", params.join(", "));
    }
    format!(
        "define([ \"{}\" ], function({}) {{\n",
        deps.join("\", \""),
        params.join(", ")
    )
}

pub fn render_bundle(module: &ModuleDescriptor, inliner: &TemplateInliner) -> JoinResult<String> {
    let resolution = &module.resolution;
    let mut parts = vec![render_header(resolution)];

    for dep in &resolution.internal_deps {
        if let Some(contents) = resolution.internal_dep_contents.get(dep) {
            parts.push(inline_dependency(contents));
        }
    }

    let block = inliner.inline(&module.name, &module.templates)?;
    let templates_module = block.as_ref().map(|_| templates_module_name(&module.name));
    if let Some(block) = block {
        parts.push(block);
    }

    parts.push(rewrap_root(&module.raw_contents, templates_module.as_deref()));
    parts.push("});".to_string());

    Ok(parts.join("\n"))
}

/// The aggregator's text with every flattened module path rewritten.
pub fn render_aggregator(module: &ModuleDescriptor, registry: &PathRewriteRegistry) -> String {
    registry.apply(&module.raw_contents)
}

pub fn emit(target: &Path, contents: &str, ctx: &mut dyn BuildContext) -> JoinResult<()> {
    info!("Join:: Writing output file: {}", target.display());
    write_atomic(target, contents)?;
    ctx.refresh(target);
    Ok(())
}
