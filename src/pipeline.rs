//! Join pipeline
//!
//! Two phases. Discovery builds every [`ModuleDescriptor`] and, as a side
//! effect of target mapping, the [`PathRewriteRegistry`]. Emission then
//! rebuilds each stale bundle and finally the aggregator, which is the only
//! reader of the registry.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::config::JoinConfig;
use crate::context::BuildContext;
use crate::discovery::find_files;
use crate::emit::{emit, render_aggregator, render_bundle};
use crate::error::{Diagnostic, JoinResult};
use crate::glob::GlobFilter;
use crate::module::ModuleDescriptor;
use crate::resolve::DependencyResolver;
use crate::target::{PathRewriteRegistry, TargetMapper};
use crate::templates::TemplateInliner;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinReport {
    /// Targets written in this run.
    pub processed: usize,
    /// Modules found up to date.
    pub skipped: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl JoinReport {
    pub fn nothing_to_do(&self) -> bool {
        self.processed == 0
    }
}

/// Result of the discovery phase.
#[derive(Debug)]
pub struct Discovery {
    /// Aggregator first, then the app file, then bundle roots in path order.
    pub descriptors: Vec<ModuleDescriptor>,
    pub registry: PathRewriteRegistry,
}

pub fn discover(config: &JoinConfig) -> JoinResult<Discovery> {
    let module_filter = GlobFilter::new(&config.module_patterns(), &[])?.with_default_excludes();
    let template_filter = GlobFilter::new(&config.template_patterns(), &[])?.with_default_excludes();
    let joinable_filter = GlobFilter::new(&config.joinable_patterns(), &[])?;

    let mapper = TargetMapper::new(&config.source, &config.target, &config.module_suffix);
    let resolver = DependencyResolver::new(config.join_root(), &joinable_filter, config.strict_cycles);
    let mut registry = PathRewriteRegistry::new();

    let mut roots: Vec<(PathBuf, bool)> = vec![(config.main_file(), true), (config.app_file(), false)];
    for file in find_files(&config.source, &module_filter) {
        if !roots.iter().any(|(known, _)| *known == file) {
            roots.push((file, false));
        }
    }

    let mut descriptors = Vec::with_capacity(roots.len());
    for (file, is_aggregator) in roots {
        descriptors.push(ModuleDescriptor::discover(
            file,
            is_aggregator,
            &mapper,
            &resolver,
            &template_filter,
            &mut registry,
        )?);
    }

    Ok(Discovery {
        descriptors,
        registry,
    })
}

/// Run one join over `config.source`.
pub fn run_join(config: &JoinConfig, ctx: &mut dyn BuildContext) -> JoinResult<JoinReport> {
    let start = Instant::now();
    let result = join(config, ctx);
    info!("Join:: took {}ms", start.elapsed().as_millis());
    result
}

fn join(config: &JoinConfig, ctx: &mut dyn BuildContext) -> JoinResult<JoinReport> {
    log_banner(config);
    config.validate()?;

    let Discovery {
        descriptors,
        registry,
    } = discover(config)?;

    let mut report = JoinReport::default();
    for module in &descriptors {
        report.diagnostics.extend(module.resolution.diagnostics.iter().cloned());
    }

    let inliner = TemplateInliner::new(&config.source, &config.prefix);
    for module in descriptors.iter().filter(|m| !m.is_aggregator) {
        if !module.is_stale(&*ctx, &config.source)? {
            report.skipped += 1;
            continue;
        }
        let bundle = render_bundle(module, &inliner)?;
        emit(&module.target_file, &bundle, ctx)?;
        report.processed += 1;
    }

    for module in descriptors.iter().filter(|m| m.is_aggregator) {
        if !module.is_stale(&*ctx, &config.source)? {
            report.skipped += 1;
            continue;
        }
        emit(&module.target_file, &render_aggregator(module, &registry), ctx)?;
        report.processed += 1;
    }

    if report.nothing_to_do() {
        info!("Join:: Nothing to do.");
    }
    ctx.build_finished(&config.source)?;
    Ok(report)
}

fn log_banner(config: &JoinConfig) {
    info!("-------------------------------------------------");
    info!("---Join ------------------------------------------");
    info!("---source: {}", config.source.display());
    info!("---main: {}", config.main_file().display());
    info!("---app: {}", config.app_file().display());
    info!("---modules: {:?}", config.module_patterns());
    info!("---templates: {:?}", config.template_patterns());
    info!("---joinable: {:?}", config.joinable_patterns());
    info!("---target: {}", config.target.display());
    info!("---prefix: \"{}\"", config.prefix);
    info!("-------------------------------------------------");
}
