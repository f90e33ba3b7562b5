//! # amd-join
//!
//! Incremental bundler for AngularJS applications laid out as require.js
//! (AMD) modules.
//!
//! Every bundle-root module found under the source directory is emitted as a
//! single file: its in-scope dependencies are inlined as closures, its HTML
//! templates are registered with `$templateCache`, and out-of-scope
//! dependencies stay declared on the bundle's `define` call. The aggregator
//! (`main.js`) is copied with references to flattened bundle paths rewritten.
//!
//! ## Pipeline
//!
//! 1. **Discovery** (`pipeline::discover`): descriptors, target paths and the
//!    path rewrite registry.
//! 2. **Staleness** (`module::ModuleDescriptor::is_stale`): skip bundles whose
//!    target is newer than all of their inputs.
//! 3. **Emission** (`emit`): bundles first, the aggregator last.
//!
//! [`run_html2js`] is the companion step that collects a whole template
//! directory into one script.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod config;
mod context;
mod discovery;
mod emit;
mod error;
mod files;
mod glob;
mod html2js;
mod module;
mod parse;
mod pipeline;
mod resolve;
mod target;
mod templates;
mod transform;


pub use config::{pattern_list, Html2jsConfig, JoinConfig};
pub use context::{BuildContext, FullBuild, SnapshotContext};
pub use error::{Diagnostic, JoinError, JoinResult, DIAG_CYCLE_DETECTED, DIAG_PATTERN_MISMATCH};
pub use glob::GlobFilter;
pub use html2js::{run_html2js, Html2jsReport};
pub use module::ModuleDescriptor;
pub use pipeline::{discover, run_join, Discovery, JoinReport};
pub use resolve::Resolution;
pub use target::PathRewriteRegistry;

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI BRIDGE
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
fn open_context(cache_dir: Option<String>, name: &str) -> Box<dyn BuildContext> {
    match cache_dir {
        Some(dir) => Box::new(SnapshotContext::open(std::path::Path::new(&dir), name)),
        None => Box::new(FullBuild),
    }
}

#[cfg(feature = "napi")]
fn to_napi_error(e: JoinError) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Run a join from a JSON `JoinConfig`. With `cache_dir`, builds are
/// incremental against the snapshot kept there.
#[cfg(feature = "napi")]
#[napi]
pub fn join_native(config_json: String, cache_dir: Option<String>) -> napi::Result<serde_json::Value> {
    let config = JoinConfig::from_json(&config_json).map_err(to_napi_error)?;
    let mut ctx = open_context(cache_dir, "join");
    let report = run_join(&config, ctx.as_mut()).map_err(to_napi_error)?;
    serde_json::to_value(report).map_err(|e| napi::Error::from_reason(format!("Report error: {}", e)))
}

#[cfg(feature = "napi")]
#[napi]
pub fn html2js_native(config_json: String, cache_dir: Option<String>) -> napi::Result<serde_json::Value> {
    let config = Html2jsConfig::from_json(&config_json).map_err(to_napi_error)?;
    let mut ctx = open_context(cache_dir, "html2js");
    let report = run_html2js(&config, ctx.as_mut()).map_err(to_napi_error)?;
    serde_json::to_value(report).map_err(|e| napi::Error::from_reason(format!("Report error: {}", e)))
}
